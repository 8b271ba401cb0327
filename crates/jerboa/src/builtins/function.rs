//! `Function` constructor and `Function.prototype`: `call`, `apply`,
//! `bind`, `toString`.

use crate::{
    ast::NodeKind,
    builtins::{arg, define_ctor},
    eval::call::{call_function, new_script_function},
    exception::Exec,
    heap::HeapId,
    object::{JsObject, ObjKind, PropAttrs},
    parser,
    types::function::{FnKind, JsFunction},
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.function;
    vm.define_native(proto, "call", 1, call);
    vm.define_native(proto, "apply", 2, apply);
    vm.define_native(proto, "bind", 1, bind);
    vm.define_native(proto, "toString", 0, to_string);
    define_ctor(vm, "Function", 1, constructor, proto);
}

fn this_function(vm: &mut Vm, this: Value) -> Exec<HeapId> {
    if let Value::Object(id) = this {
        if vm.heap.object(id).is_function() {
            return Ok(id);
        }
    }
    Err(vm.type_error("Receiver is not a function"))
}

/// `new Function(p1, ..., pn, body)`: the source is compiled at call time
/// and the result closes over the global environment.
fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let mut params = Vec::new();
    for value in &args[..args.len().saturating_sub(1)] {
        params.push(vm.to_display_string(*value)?);
    }
    let body = match args.last() {
        Some(&value) => vm.to_display_string(value)?,
        None => String::new(),
    };
    let source = format!("(function anonymous({}) {{\n{body}\n}});", params.join(", "));
    let program = parser::parse_eval(&source, "<function>")
        .map_err(|err| vm.syntax_error(&err.to_string()))?;
    let NodeKind::Program { body } = &program.kind else {
        return Err(vm.syntax_error("Invalid function body"));
    };
    let Some(stmt) = body.first() else {
        return Err(vm.syntax_error("Invalid function body"));
    };
    let NodeKind::ExprStmt { expr } = &stmt.kind else {
        return Err(vm.syntax_error("Invalid function body"));
    };
    let NodeKind::FunctionExpr { func } = &expr.kind else {
        return Err(vm.syntax_error("Invalid function body"));
    };
    let env = vm.global_env;
    Ok(Value::Object(new_script_function(vm, func, env)))
}

fn call(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let target = this_function(vm, this)?;
    let receiver = arg(args, 0);
    let rest = if args.is_empty() { &[] } else { &args[1..] };
    call_function(vm, target, receiver, rest)
}

fn apply(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let target = this_function(vm, this)?;
    let receiver = arg(args, 0);
    let collected: Vec<Value> = match arg(args, 1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(list) => {
            let length_key = vm.names.length;
            let length = match vm.heap.get_prop(list, length_key) {
                Some(value) => vm.to_number(value)?,
                None => return Err(vm.type_error("Second argument to apply has no length")),
            };
            if !(length.is_finite() && length >= 0.0 && length <= f64::from(u32::MAX)) {
                return Err(vm.type_error("Invalid arguments length in apply"));
            }
            let count = length as u32;
            let mut out = Vec::with_capacity(count as usize);
            for index in 0..count {
                let key = {
                    let (heap, interns) = (&mut vm.heap, &mut vm.interns);
                    heap.index_string(interns, index)
                };
                out.push(vm.heap.get_prop(list, key).unwrap_or(Value::Undefined));
            }
            out
        }
        _ => return Err(vm.type_error("Second argument to apply must be array-like")),
    };
    // keep collected arguments rooted across the call
    let mark = vm.roots.len();
    vm.roots.extend(collected.iter().copied());
    let result = call_function(vm, target, receiver, &collected);
    vm.roots.truncate(mark);
    result
}

fn bind(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let target = this_function(vm, this)?;
    let receiver = arg(args, 0);
    let preset: Vec<Value> = if args.is_empty() {
        Vec::new()
    } else {
        args[1..].to_vec()
    };

    let target_length = match vm.heap.get_own(target, vm.names.length) {
        Some(Value::Number(n)) => n,
        _ => 0.0,
    };
    let target_name = match vm.heap.get_own(target, vm.names.name) {
        Some(Value::Str(id)) => vm.heap.str(id).as_str().to_owned(),
        _ => String::new(),
    };

    let fn_proto = vm.protos.function;
    let bound = vm.heap.alloc_object(JsObject::with_kind(
        Some(fn_proto),
        ObjKind::Function(Box::new(JsFunction::bound(target, receiver, preset.clone()))),
    ));
    let length = (target_length - preset.len() as f64).max(0.0);
    let length_key = vm.names.length;
    vm.heap
        .define_prop(bound, length_key, Value::Number(length), PropAttrs::LOCKED);
    let name_value = vm.str_value(format!("bound {target_name}"));
    let name_key = vm.names.name;
    vm.heap
        .define_prop(bound, name_key, name_value, PropAttrs::LOCKED);
    Ok(Value::Object(bound))
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let target = this_function(vm, this)?;
    let name = match vm.heap.get_own(target, vm.names.name) {
        Some(Value::Str(id)) => vm.heap.str(id).as_str().to_owned(),
        _ => String::new(),
    };
    let body = match &vm.heap.object(target).as_function().expect("checked").kind {
        FnKind::Script(_) => "{ ... }",
        _ => "{ [native code] }",
    };
    Ok(vm.str_value(format!("function {name}() {body}")))
}
