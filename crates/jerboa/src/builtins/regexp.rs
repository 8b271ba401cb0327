//! `RegExp` constructor and prototype: `exec`, `test`, `toString`.

use crate::{
    builtins::{arg, define_ctor, string::set_last_index, this_regexp, this_string},
    exception::Exec,
    heap::HeapId,
    object::{JsObject, ObjKind, PropAttrs},
    types::regexp::{JsRegExp, ReMatch},
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.regexp;
    vm.define_native(proto, "exec", 1, exec);
    vm.define_native(proto, "test", 1, test);
    vm.define_native(proto, "toString", 0, to_string);
    define_ctor(vm, "RegExp", 2, constructor, proto);
}

/// Allocates a RegExp object with its instance properties.
pub(crate) fn new_regexp_object(vm: &mut Vm, re: JsRegExp) -> HeapId {
    let proto = vm.protos.regexp;
    let source_value = vm.str_value(&*re.source);
    let global = re.global;
    let ignore_case = re.ignore_case;
    let id = vm
        .heap
        .alloc_object(JsObject::with_kind(Some(proto), ObjKind::RegExp(Box::new(re))));
    let frozen = PropAttrs::READONLY | PropAttrs::LOCKED;
    let source_key = vm.names.source;
    vm.heap.define_prop(id, source_key, source_value, frozen);
    let global_key = vm.names.global_;
    vm.heap
        .define_prop(id, global_key, Value::Bool(global), frozen);
    let ignore_case_key = vm.names.ignore_case;
    vm.heap
        .define_prop(id, ignore_case_key, Value::Bool(ignore_case), frozen);
    let last_index_key = vm.names.last_index;
    vm.heap.define_prop(
        id,
        last_index_key,
        Value::Number(0.0),
        PropAttrs::DONTENUM | PropAttrs::DONTDELETE,
    );
    id
}

fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let pattern = match arg(args, 0) {
        Value::Undefined => String::new(),
        Value::Object(id) if vm.heap.object(id).as_regexp().is_some() => {
            let re = vm.heap.object(id).as_regexp().expect("checked");
            re.source.to_string()
        }
        other => vm.to_display_string(other)?,
    };
    let flags = match arg(args, 1) {
        Value::Undefined => String::new(),
        other => vm.to_display_string(other)?,
    };
    let compiled =
        JsRegExp::compile(&pattern, &flags).map_err(|err| vm.syntax_error(&err))?;
    Ok(Value::Object(new_regexp_object(vm, compiled)))
}

/// The exec result: a match array with `index`, `input`, numbered captures.
pub(crate) fn build_match_result(vm: &mut Vm, input: HeapId, found: &ReMatch) -> HeapId {
    let result = vm.new_array();
    vm.roots.push(Value::Object(result));
    let whole = vm
        .heap
        .str(input)
        .substring(found.start, found.end)
        .to_owned();
    let whole_value = vm.str_value(whole);
    vm.heap.array_set_index(result, 0, whole_value);
    for (index, group) in found.groups.iter().enumerate().skip(1) {
        let value = match group {
            Some((start, end)) => {
                let text = vm.heap.str(input).substring(*start, *end).to_owned();
                vm.str_value(text)
            }
            None => Value::Undefined,
        };
        vm.heap.array_set_index(result, index as u32, value);
    }
    let index_key = vm.names.index;
    vm.heap.define_prop(
        result,
        index_key,
        Value::Number(found.start as f64),
        PropAttrs::NONE,
    );
    let input_key = vm.names.input;
    vm.heap
        .define_prop(result, input_key, Value::Str(input), PropAttrs::NONE);
    vm.roots.pop();
    result
}

fn run_exec(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Option<(HeapId, ReMatch)>> {
    let re_obj = this_regexp(vm, this)?;
    let input = this_string(vm, arg(args, 0))?;
    let (global, start) = {
        let re = vm.heap.object(re_obj).as_regexp().expect("checked");
        let global = re.global;
        let start = if global {
            let key = vm.names.last_index;
            match vm.heap.get_own(re_obj, key) {
                Some(Value::Number(n)) if n.is_finite() && n >= 0.0 => n as usize,
                _ => 0,
            }
        } else {
            0
        };
        (global, start)
    };
    let found = {
        let re = vm.heap.object(re_obj).as_regexp().expect("checked");
        re.find_at(vm.heap.str(input), start)
    };
    match found {
        Some(found) => {
            if global {
                set_last_index(vm, re_obj, found.end as u32);
            }
            Ok(Some((input, found)))
        }
        None => {
            if global {
                set_last_index(vm, re_obj, 0);
            }
            Ok(None)
        }
    }
}

fn exec(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    match run_exec(vm, this, args)? {
        Some((input, found)) => Ok(Value::Object(build_match_result(vm, input, &found))),
        None => Ok(Value::Null),
    }
}

fn test(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    Ok(Value::Bool(run_exec(vm, this, args)?.is_some()))
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let re_obj = this_regexp(vm, this)?;
    let re = vm.heap.object(re_obj).as_regexp().expect("checked");
    let mut text = format!("/{}/", re.source);
    if re.global {
        text.push('g');
    }
    if re.ignore_case {
        text.push('i');
    }
    Ok(vm.str_value(text))
}
