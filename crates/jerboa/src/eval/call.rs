//! The call protocol: bound-function unwrapping, receiver boxing, frame
//! bookkeeping, call-environment construction, parameter binding with
//! defaults, and the `arguments` record.
//!
//! Allocation never collects (collection happens only at statement safe
//! points), so the straight-line setup below needs no intermediate rooting;
//! the call environment becomes `vm.env` before any body statement runs.

use std::rc::Rc;

use crate::{
    ast::FunctionNode,
    eval::{
        expr::eval_expr,
        stmt::{eval_stmt, hoist},
        Flow,
    },
    exception::Exec,
    heap::HeapId,
    object::{JsObject, ObjKind, PropAttrs},
    scope::ScopeRecord,
    types::function::{FnKind, JsFunction},
    value::Value,
    vm::{Frame, Vm, MAX_CALL_DEPTH},
};

/// Creates a script function object closing over `env`, with the standard
/// `name`/`length` metadata and a fresh `prototype` object.
pub(crate) fn new_script_function(vm: &mut Vm, func: &Rc<FunctionNode>, env: HeapId) -> HeapId {
    let fn_proto = vm.protos.function;
    let fn_obj = vm.heap.alloc_object(JsObject::with_kind(
        Some(fn_proto),
        ObjKind::Function(Box::new(JsFunction::script(Rc::clone(func), env))),
    ));
    let name_value = vm.str_value(func.name.as_deref().unwrap_or(""));
    let name_key = vm.names.name;
    let length_key = vm.names.length;
    vm.heap
        .define_prop(fn_obj, name_key, name_value, PropAttrs::LOCKED);
    vm.heap.define_prop(
        fn_obj,
        length_key,
        Value::Number(func.params.len() as f64),
        PropAttrs::LOCKED,
    );
    let proto_obj = vm.new_object();
    let constructor_key = vm.names.constructor;
    vm.heap.define_prop(
        proto_obj,
        constructor_key,
        Value::Object(fn_obj),
        PropAttrs::HIDDEN,
    );
    let prototype_key = vm.names.prototype;
    vm.heap.define_prop(
        fn_obj,
        prototype_key,
        Value::Object(proto_obj),
        PropAttrs::HIDDEN,
    );
    fn_obj
}

/// Invokes `callee` with the given receiver and arguments.
pub(crate) fn call_function(
    vm: &mut Vm,
    callee: HeapId,
    this: Value,
    args: &[Value],
) -> Exec<Value> {
    // unwrap bind chains: preset arguments prepend, the innermost bound
    // receiver wins
    let mut target = callee;
    let mut this = this;
    let mut preset: Vec<Value> = Vec::new();
    loop {
        let unwrapped = {
            let object = vm.heap.object(target);
            let Some(func) = object.as_function() else {
                return Err(vm.type_error("Not a callable object"));
            };
            match &func.kind {
                FnKind::Bound {
                    target: inner,
                    this: bound_this,
                    args: bound_args,
                } => Some((*inner, *bound_this, bound_args.clone())),
                _ => None,
            }
        };
        match unwrapped {
            Some((inner, bound_this, bound_args)) => {
                preset.splice(0..0, bound_args);
                this = bound_this;
                target = inner;
            }
            None => break,
        }
    }

    let mut full_args: Vec<Value>;
    let argv: &[Value] = if preset.is_empty() {
        args
    } else {
        full_args = preset;
        full_args.extend_from_slice(args);
        &full_args
    };

    if vm.frames.len() >= MAX_CALL_DEPTH {
        return Err(vm.range_error("Maximum call stack size exceeded"));
    }
    let frame = build_frame(vm, target);
    vm.frames.push(frame);
    let result = dispatch(vm, target, this, argv);
    vm.frames.pop();
    result
}

fn build_frame(vm: &Vm, target: HeapId) -> Frame {
    let function_name: Rc<str> = match vm.heap.get_own(target, vm.names.name) {
        Some(Value::Str(id)) if !vm.heap.str(id).is_empty() => {
            Rc::from(vm.heap.str(id).as_str())
        }
        _ => Rc::from("<anonymous>"),
    };
    let (source_path, line, column) = match &vm.current_pos {
        Some(pos) => (Rc::clone(&pos.path), pos.line, pos.column),
        None => (Rc::from("<native>"), 0, 0),
    };
    Frame {
        function_name,
        source_path,
        line,
        column,
    }
}

fn dispatch(vm: &mut Vm, target: HeapId, this: Value, args: &[Value]) -> Exec<Value> {
    enum Dispatch {
        Native(crate::types::function::NativeFn),
        Host(usize),
        Script(Rc<FunctionNode>, HeapId),
    }
    let dispatch = {
        let object = vm.heap.object(target);
        match &object.as_function().expect("verified by caller").kind {
            FnKind::Native(func) => Dispatch::Native(*func),
            FnKind::Host(index) => Dispatch::Host(*index),
            FnKind::Script(script) => Dispatch::Script(Rc::clone(&script.node), script.env),
            FnKind::Bound { .. } => unreachable!("bound chain unwrapped by caller"),
        }
    };
    let (node, closure_env) = match dispatch {
        Dispatch::Native(func) => return func(vm, this, args),
        Dispatch::Host(index) => return call_host(vm, index, args),
        Dispatch::Script(node, env) => (node, env),
    };

    // primitive receivers are boxed for script targets
    let this_value = match this {
        Value::Bool(_) | Value::Number(_) | Value::Str(_) => {
            Value::Object(vm.to_object(this)?)
        }
        other => other,
    };

    let record = vm.heap.alloc_object(JsObject::plain(None));
    let env_id = vm
        .heap
        .alloc_env(ScopeRecord::call_env(closure_env, record, target));
    let this_key = vm.names.this_;
    vm.heap.define_prop(
        record,
        this_key,
        this_value,
        PropAttrs::DONTENUM | PropAttrs::DONTDELETE,
    );

    let args_arr = vm.array_from(args);
    let callee_key = vm.names.callee;
    vm.heap
        .define_prop(args_arr, callee_key, Value::Object(target), PropAttrs::HIDDEN);
    vm.heap.env_mut(env_id).arguments = Some(args_arr);
    let arguments_key = vm.names.arguments_;
    vm.heap.define_prop(
        record,
        arguments_key,
        Value::Object(args_arr),
        PropAttrs::HIDDEN,
    );

    hoist(vm, env_id, &node.body);

    // parameters: fast slots plus named bindings; missing ones are
    // undefined until defaults run
    for (index, param) in node.params.iter().enumerate() {
        let key = vm.intern(&param.name);
        let value = args.get(index).copied().unwrap_or(Value::Undefined);
        vm.heap.define_prop(record, key, value, PropAttrs::NONE);
        let env = vm.heap.env_mut(env_id);
        env.fast_names.push(key);
        env.fast.push(value);
    }

    let prev_env = vm.env;
    vm.env_roots.push(prev_env);
    vm.env = env_id;

    let mut outcome: Exec<Flow> = Ok(Flow::Normal(Value::Undefined));
    for (index, param) in node.params.iter().enumerate() {
        let Some(default) = &param.default else {
            continue;
        };
        if !matches!(vm.heap.env(env_id).fast[index], Value::Undefined) {
            continue;
        }
        match eval_expr(vm, default) {
            Ok(value) => {
                let key = vm.heap.env(env_id).fast_names[index];
                vm.env_set(env_id, key, value);
            }
            Err(thrown) => {
                outcome = Err(thrown);
                break;
            }
        }
    }
    if outcome.is_ok() {
        outcome = eval_stmt(vm, &node.body);
    }

    vm.env = prev_env;
    vm.env_roots.pop();

    match outcome? {
        Flow::Return(value) => Ok(value),
        _ => Ok(Value::Undefined),
    }
}

/// Bridges a registered host callback: arguments are exported across the
/// boundary, an `Err` return raises an `Error` exception.
fn call_host(vm: &mut Vm, index: usize, args: &[Value]) -> Exec<Value> {
    let exported: Vec<crate::ScriptValue> = args.iter().map(|&arg| vm.export_value(arg)).collect();
    let host_fn = vm.host_fns[index];
    match host_fn(vm, &exported) {
        Ok(result) => Ok(vm.import_value(&result)),
        Err(message) => Err(vm.throw(crate::exception::ErrorKind::Error, &message)),
    }
}
