//! `Buffer` and `Buffer32` constructors: fixed-size byte and 32-bit-word
//! arrays. Indexed access is wired through the member-access machinery.

use crate::{
    builtins::{arg, define_ctor},
    exception::Exec,
    object::{JsObject, ObjKind, PropAttrs},
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let buffer_proto = vm.protos.buffer;
    let buffer32_proto = vm.protos.buffer32;
    define_ctor(vm, "Buffer", 1, buffer_ctor, buffer_proto);
    define_ctor(vm, "Buffer32", 1, buffer32_ctor, buffer32_proto);
}

fn checked_size(vm: &mut Vm, value: Value) -> Exec<usize> {
    let n = vm.to_number(value)?;
    if !(n.is_finite() && n >= 0.0 && n.trunc() == n && n <= f64::from(u32::MAX)) {
        return Err(vm.range_error("Invalid buffer size"));
    }
    Ok(n as usize)
}

fn buffer_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let size = checked_size(vm, arg(args, 0))?;
    let proto = vm.protos.buffer;
    let id = vm.heap.alloc_object(JsObject::with_kind(
        Some(proto),
        ObjKind::Buffer(vec![0u8; size].into_boxed_slice()),
    ));
    let length_key = vm.names.length;
    vm.heap.define_prop(
        id,
        length_key,
        Value::Number(size as f64),
        PropAttrs::READONLY | PropAttrs::LOCKED,
    );
    Ok(Value::Object(id))
}

fn buffer32_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let size = checked_size(vm, arg(args, 0))?;
    let proto = vm.protos.buffer32;
    let id = vm.heap.alloc_object(JsObject::with_kind(
        Some(proto),
        ObjKind::Buffer32(vec![0u32; size].into_boxed_slice()),
    ));
    let length_key = vm.names.length;
    vm.heap.define_prop(
        id,
        length_key,
        Value::Number(size as f64),
        PropAttrs::READONLY | PropAttrs::LOCKED,
    );
    Ok(Value::Object(id))
}
