//! Error constructors and prototypes. Each specialized kind's prototype
//! chains to `Error.prototype`; constructors accept `(message, options)`
//! with an optional `cause`.

use crate::{
    builtins::{arg, define_ctor},
    exception::{ErrorKind, Exec},
    heap::HeapId,
    object::PropAttrs,
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let kinds: [(ErrorKind, HeapId); 6] = [
        (ErrorKind::Error, vm.protos.error),
        (ErrorKind::TypeError, vm.protos.type_error),
        (ErrorKind::RangeError, vm.protos.range_error),
        (ErrorKind::ReferenceError, vm.protos.reference_error),
        (ErrorKind::SyntaxError, vm.protos.syntax_error),
        (ErrorKind::EvalError, vm.protos.eval_error),
    ];
    for (kind, proto) in kinds {
        let name_value = vm.str_value(<&'static str>::from(kind));
        let name_key = vm.names.name;
        vm.heap
            .define_prop(proto, name_key, name_value, PropAttrs::HIDDEN);
        let message_value = vm.str_value("");
        let message_key = vm.names.message;
        vm.heap
            .define_prop(proto, message_key, message_value, PropAttrs::HIDDEN);
    }
    let error_proto = vm.protos.error;
    vm.define_native(error_proto, "toString", 0, to_string);

    let ctors: [(&'static str, crate::types::function::NativeFn, HeapId); 6] = [
        ("Error", error_ctor, vm.protos.error),
        ("TypeError", type_error_ctor, vm.protos.type_error),
        ("RangeError", range_error_ctor, vm.protos.range_error),
        ("ReferenceError", reference_error_ctor, vm.protos.reference_error),
        ("SyntaxError", syntax_error_ctor, vm.protos.syntax_error),
        ("EvalError", eval_error_ctor, vm.protos.eval_error),
    ];
    for (name, ctor, proto) in ctors {
        define_ctor(vm, name, 1, ctor, proto);
    }
}

fn construct(vm: &mut Vm, kind: ErrorKind, args: &[Value]) -> Exec<Value> {
    let message = match arg(args, 0) {
        Value::Undefined => String::new(),
        other => vm.to_display_string(other)?,
    };
    let error = vm.make_error(kind, &message);
    // options.cause, when provided
    if let Value::Object(options) = arg(args, 1) {
        let cause_key = vm.names.cause;
        if let Some(cause) = vm.heap.get_own(options, cause_key) {
            let Value::Object(error_id) = error else {
                unreachable!("make_error returns an object");
            };
            vm.heap
                .define_prop(error_id, cause_key, cause, PropAttrs::HIDDEN);
        }
        let code_key = vm.names.code;
        if let Some(code) = vm.heap.get_own(options, code_key) {
            let Value::Object(error_id) = error else {
                unreachable!("make_error returns an object");
            };
            vm.heap
                .define_prop(error_id, code_key, code, PropAttrs::HIDDEN);
        }
    }
    Ok(error)
}

fn error_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    construct(vm, ErrorKind::Error, args)
}

fn type_error_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    construct(vm, ErrorKind::TypeError, args)
}

fn range_error_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    construct(vm, ErrorKind::RangeError, args)
}

fn reference_error_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    construct(vm, ErrorKind::ReferenceError, args)
}

fn syntax_error_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    construct(vm, ErrorKind::SyntaxError, args)
}

fn eval_error_ctor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    construct(vm, ErrorKind::EvalError, args)
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let Value::Object(id) = this else {
        return Err(vm.type_error("Receiver is not an error"));
    };
    let name = match vm.heap.get_prop(id, vm.names.name) {
        Some(Value::Str(s)) => vm.heap.str(s).as_str().to_owned(),
        _ => "Error".to_owned(),
    };
    let message = match vm.heap.get_prop(id, vm.names.message) {
        Some(Value::Str(s)) => vm.heap.str(s).as_str().to_owned(),
        _ => String::new(),
    };
    if message.is_empty() {
        Ok(vm.str_value(name))
    } else {
        Ok(vm.str_value(format!("{name}: {message}")))
    }
}
