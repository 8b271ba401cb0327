//! The `JSON` host object.
//!
//! `parse` delegates the RFC 8259 grammar (including `\uXXXX` surrogate
//! pairs) to `serde_json` with insertion order preserved; the resulting
//! tree is converted onto the heap. `stringify` walks the value model
//! directly: insertion order, `undefined`/function elision, wrapper
//! unwrapping, and cycle detection.

use std::fmt::Write;

use crate::{
    builtins::arg,
    exception::Exec,
    heap::HeapId,
    object::{ObjKind, PropAttrs},
    value::{number_to_string, Value},
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let json = vm.new_object();
    vm.define_native(json, "parse", 1, parse);
    vm.define_native(json, "stringify", 1, stringify);
    let key = vm.intern("JSON");
    let global = vm.global;
    vm.heap
        .define_prop(global, key, Value::Object(json), PropAttrs::HIDDEN);
}

fn parse(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let text = vm.to_display_string(arg(args, 0))?;
    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| vm.syntax_error(&format!("Invalid JSON: {err}")))?;
    Ok(import_json(vm, &parsed))
}

/// Converting allocates but never evaluates, so no collection can run
/// mid-conversion and intermediate handles need no rooting.
fn import_json(vm: &mut Vm, json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => vm.str_value(s.as_str()),
        serde_json::Value::Array(items) => {
            let arr = vm.new_array();
            for (index, item) in items.iter().enumerate() {
                let value = import_json(vm, item);
                vm.heap.array_set_index(arr, index as u32, value);
            }
            Value::Object(arr)
        }
        serde_json::Value::Object(map) => {
            let obj = vm.new_object();
            for (name, item) in map {
                let value = import_json(vm, item);
                let key = vm.intern(name);
                vm.heap.define_prop(obj, key, value, PropAttrs::NONE);
            }
            Value::Object(obj)
        }
    }
}

fn stringify(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let mut active = Vec::new();
    match stringify_value(vm, arg(args, 0), &mut active)? {
        Some(text) => Ok(vm.str_value(text)),
        None => Ok(Value::Undefined),
    }
}

/// `None` means "omit": `undefined` and function values have no JSON form.
fn stringify_value(vm: &mut Vm, value: Value, active: &mut Vec<HeapId>) -> Exec<Option<String>> {
    match value {
        Value::Undefined => Ok(None),
        Value::Null => Ok(Some("null".to_owned())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(if n.is_finite() {
            number_to_string(n)
        } else {
            "null".to_owned()
        })),
        Value::Str(id) => Ok(Some(quote(vm.heap.str(id).as_str()))),
        Value::Object(id) => stringify_object(vm, id, active),
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_owned())
}

fn stringify_object(vm: &mut Vm, id: HeapId, active: &mut Vec<HeapId>) -> Exec<Option<String>> {
    // primitive wrappers unwrap first
    match vm.heap.object(id).kind {
        ObjKind::Boolean(b) => return Ok(Some(b.to_string())),
        ObjKind::Number(n) => {
            return Ok(Some(if n.is_finite() {
                number_to_string(n)
            } else {
                "null".to_owned()
            }));
        }
        ObjKind::String(inner) => return Ok(Some(quote(vm.heap.str(inner).as_str()))),
        ObjKind::Function(_) => return Ok(None),
        _ => {}
    }

    if active.contains(&id) {
        return Err(vm.type_error("Converting circular structure to JSON"));
    }
    active.push(id);

    let result = if vm.heap.object(id).as_array().is_some() {
        let length = vm.heap.array_length(id);
        let mut out = String::from("[");
        for index in 0..length {
            if index > 0 {
                out.push(',');
            }
            let element = vm
                .heap
                .object(id)
                .as_array()
                .and_then(|a| a.get(index))
                .unwrap_or(Value::Undefined);
            // holes and non-representable values become null inside arrays
            match stringify_value(vm, element, active)? {
                Some(text) => out.push_str(&text),
                None => out.push_str("null"),
            }
        }
        out.push(']');
        Ok(Some(out))
    } else {
        let keys = {
            let (heap, interns) = (&mut vm.heap, &mut vm.interns);
            heap.own_enumerable_keys(interns, id)
        };
        let mut out = String::from("{");
        let mut first = true;
        for key in keys {
            let Some(value) = vm.heap.get_own(id, key) else {
                continue;
            };
            let Some(text) = stringify_value(vm, value, active)? else {
                continue;
            };
            if !first {
                out.push(',');
            }
            first = false;
            let name = quote(vm.heap.str(key).as_str());
            let _ = write!(out, "{name}:{text}");
        }
        out.push('}');
        Ok(Some(out))
    };

    active.pop();
    result
}
