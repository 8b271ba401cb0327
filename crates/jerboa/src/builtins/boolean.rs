//! `Boolean` constructor and prototype.

use crate::{
    builtins::{define_ctor, this_boolean},
    exception::Exec,
    object::{JsObject, ObjKind},
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.boolean;
    vm.define_native(proto, "toString", 0, to_string);
    vm.define_native(proto, "valueOf", 0, value_of);
    define_ctor(vm, "Boolean", 1, constructor, proto);
}

fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let b = args.first().copied().map_or(false, |v| vm.to_boolean(v));
    if vm.constructing {
        let proto = vm.protos.boolean;
        let wrapper = vm
            .heap
            .alloc_object(JsObject::with_kind(Some(proto), ObjKind::Boolean(b)));
        Ok(Value::Object(wrapper))
    } else {
        Ok(Value::Bool(b))
    }
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let b = this_boolean(vm, this)?;
    Ok(vm.str_value(if b { "true" } else { "false" }))
}

fn value_of(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    Ok(Value::Bool(this_boolean(vm, this)?))
}
