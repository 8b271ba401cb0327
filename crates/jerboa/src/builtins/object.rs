//! `Object` constructor, `Object.prototype`, and the prototype-inspection
//! statics.

use crate::{
    builtins::{arg, define_ctor},
    exception::Exec,
    heap::HeapId,
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.object;
    vm.define_native(proto, "toString", 0, to_string);
    vm.define_native(proto, "toLocaleString", 0, to_string);
    vm.define_native(proto, "valueOf", 0, value_of);
    vm.define_native(proto, "hasOwnProperty", 1, has_own_property);
    vm.define_native(proto, "propertyIsEnumerable", 1, property_is_enumerable);
    vm.define_native(proto, "isPrototypeOf", 1, is_prototype_of);

    let ctor = define_ctor(vm, "Object", 1, constructor, proto);
    vm.define_native(ctor, "getPrototypeOf", 1, get_prototype_of);
    vm.define_native(ctor, "setPrototypeOf", 2, set_prototype_of);
    vm.define_native(ctor, "create", 2, create);
}

fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    match arg(args, 0) {
        Value::Undefined | Value::Null => Ok(Value::Object(vm.new_object())),
        value @ Value::Object(_) => Ok(value),
        primitive => Ok(Value::Object(vm.to_object(primitive)?)),
    }
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let tag = match this {
        Value::Object(id) => vm.heap.object(id).kind.tag(),
        Value::Undefined | Value::Null => "Object",
        _ => "Object",
    };
    Ok(vm.str_value(format!("[object {tag}]")))
}

fn value_of(_vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    Ok(this)
}

fn has_own_property(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let obj = vm.to_object(this)?;
    let text = vm.to_display_string(arg(args, 0))?;
    let key = vm.intern(&text);
    Ok(Value::Bool(vm.heap.has_own(obj, key)))
}

fn property_is_enumerable(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let obj = vm.to_object(this)?;
    let text = vm.to_display_string(arg(args, 0))?;
    let key = vm.intern(&text);
    // array elements are always enumerable
    if vm.heap.object(obj).as_array().is_some() && vm.heap.array_index_of_key(key).is_some() {
        return Ok(Value::Bool(vm.heap.get_own(obj, key).is_some()));
    }
    let enumerable = vm
        .heap
        .find_own(obj, key)
        .is_some_and(|index| !vm.heap.object(obj).props()[index].attrs.dont_enum());
    Ok(Value::Bool(enumerable))
}

fn is_prototype_of(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let Value::Object(candidate_proto) = this else {
        return Ok(Value::Bool(false));
    };
    let Value::Object(mut current) = arg(args, 0) else {
        return Ok(Value::Bool(false));
    };
    loop {
        match vm.heap.object(current).proto {
            Some(parent) if parent == candidate_proto => return Ok(Value::Bool(true)),
            Some(parent) => current = parent,
            None => return Ok(Value::Bool(false)),
        }
    }
}

fn get_prototype_of(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let obj = vm.to_object(arg(args, 0))?;
    Ok(match vm.heap.object(obj).proto {
        Some(proto) => Value::Object(proto),
        None => Value::Null,
    })
}

fn chain_contains(vm: &Vm, start: Option<HeapId>, needle: HeapId) -> bool {
    let mut current = start;
    while let Some(id) = current {
        if id == needle {
            return true;
        }
        current = vm.heap.object(id).proto;
    }
    false
}

fn set_prototype_of(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let target = arg(args, 0);
    let Value::Object(obj) = target else {
        return Err(vm.type_error("Object.setPrototypeOf called on non-object"));
    };
    let new_proto = match arg(args, 1) {
        Value::Null => None,
        Value::Object(id) => Some(id),
        _ => return Err(vm.type_error("Prototype must be an object or null")),
    };
    // a chain that already contains the object would become a cycle
    if chain_contains(vm, new_proto, obj) {
        return Err(vm.type_error("Cyclic prototype chain"));
    }
    vm.heap.object_mut(obj).proto = new_proto;
    Ok(target)
}

fn create(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let proto = match arg(args, 0) {
        Value::Null => None,
        Value::Object(id) => Some(id),
        _ => return Err(vm.type_error("Object prototype may only be an object or null")),
    };
    let obj = vm
        .heap
        .alloc_object(crate::object::JsObject::plain(proto));
    Ok(Value::Object(obj))
}
