//! Builtin constructors, prototypes, and global functions.
//!
//! Everything here is per-VM: installation populates the global object and
//! the prototype objects allocated by [`Vm::create`].

pub(crate) mod array;
pub(crate) mod boolean;
pub(crate) mod buffer;
pub(crate) mod date;
pub(crate) mod error;
pub(crate) mod function;
pub(crate) mod global;
pub(crate) mod json;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod object;
pub(crate) mod regexp;
pub(crate) mod string;

use crate::{
    exception::Exec,
    heap::HeapId,
    object::{ObjKind, PropAttrs},
    types::function::NativeFn,
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    object::install(vm);
    function::install(vm);
    array::install(vm);
    string::install(vm);
    number::install(vm);
    boolean::install(vm);
    date::install(vm);
    regexp::install(vm);
    buffer::install(vm);
    error::install(vm);
    math::install(vm);
    json::install(vm);
    global::install(vm);
}

/// Missing arguments read as `undefined`.
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).copied().unwrap_or(Value::Undefined)
}

/// Wires up a constructor: `ctor.prototype`, `proto.constructor`, and the
/// global binding.
pub(crate) fn define_ctor(
    vm: &mut Vm,
    name: &'static str,
    arity: u32,
    func: NativeFn,
    proto: HeapId,
) -> HeapId {
    let ctor = vm.new_native_fn(name, arity, func);
    let prototype_key = vm.names.prototype;
    vm.heap.define_prop(
        ctor,
        prototype_key,
        Value::Object(proto),
        PropAttrs::LOCKED | PropAttrs::READONLY,
    );
    let constructor_key = vm.names.constructor;
    vm.heap
        .define_prop(proto, constructor_key, Value::Object(ctor), PropAttrs::HIDDEN);
    let global_key = vm.intern(name);
    let global = vm.global;
    vm.heap
        .define_prop(global, global_key, Value::Object(ctor), PropAttrs::HIDDEN);
    ctor
}

/// `ToString(this)` as a string handle; string wrappers unwrap directly so
/// the prototype methods stay generic.
pub(crate) fn this_string(vm: &mut Vm, this: Value) -> Exec<HeapId> {
    match this {
        Value::Str(id) => Ok(id),
        Value::Object(id) => {
            if let ObjKind::String(inner) = vm.heap.object(id).kind {
                return Ok(inner);
            }
            let text = vm.to_display_string(this)?;
            Ok(vm.heap.alloc_string(text))
        }
        other => {
            let text = vm.to_display_string(other)?;
            Ok(vm.heap.alloc_string(text))
        }
    }
}

/// Receiver for `Number.prototype` methods: a number or a number wrapper.
pub(crate) fn this_number(vm: &mut Vm, this: Value) -> Exec<f64> {
    match this {
        Value::Number(n) => Ok(n),
        Value::Object(id) => match vm.heap.object(id).kind {
            ObjKind::Number(n) => Ok(n),
            _ => Err(vm.type_error("Receiver is not a number")),
        },
        _ => Err(vm.type_error("Receiver is not a number")),
    }
}

pub(crate) fn this_boolean(vm: &mut Vm, this: Value) -> Exec<bool> {
    match this {
        Value::Bool(b) => Ok(b),
        Value::Object(id) => match vm.heap.object(id).kind {
            ObjKind::Boolean(b) => Ok(b),
            _ => Err(vm.type_error("Receiver is not a boolean")),
        },
        _ => Err(vm.type_error("Receiver is not a boolean")),
    }
}

pub(crate) fn this_array(vm: &mut Vm, this: Value) -> Exec<HeapId> {
    if let Value::Object(id) = this {
        if vm.heap.object(id).as_array().is_some() {
            return Ok(id);
        }
    }
    Err(vm.type_error("Receiver is not an array"))
}

/// Receiver for `Date.prototype` getters: the stored millisecond value.
pub(crate) fn this_date(vm: &mut Vm, this: Value) -> Exec<(HeapId, f64)> {
    if let Value::Object(id) = this {
        if let ObjKind::Date(ms) = vm.heap.object(id).kind {
            return Ok((id, ms));
        }
    }
    Err(vm.type_error("Receiver is not a Date"))
}

pub(crate) fn this_regexp(vm: &mut Vm, this: Value) -> Exec<HeapId> {
    if let Value::Object(id) = this {
        if vm.heap.object(id).as_regexp().is_some() {
            return Ok(id);
        }
    }
    Err(vm.type_error("Receiver is not a RegExp"))
}
