//! `Array` constructor and `Array.prototype`.

use crate::{
    builtins::{arg, define_ctor, this_array},
    eval::call::call_function,
    exception::Exec,
    heap::HeapId,
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.array;
    vm.define_native(proto, "push", 1, push);
    vm.define_native(proto, "pop", 0, pop);
    vm.define_native(proto, "shift", 0, shift);
    vm.define_native(proto, "unshift", 1, unshift);
    vm.define_native(proto, "join", 1, join);
    vm.define_native(proto, "concat", 1, concat);
    vm.define_native(proto, "slice", 2, slice);
    vm.define_native(proto, "splice", 2, splice);
    vm.define_native(proto, "indexOf", 1, index_of);
    vm.define_native(proto, "lastIndexOf", 1, last_index_of);
    vm.define_native(proto, "reverse", 0, reverse);
    vm.define_native(proto, "sort", 1, sort);
    vm.define_native(proto, "toString", 0, to_string);
    define_ctor(vm, "Array", 1, constructor, proto);
}

/// `Array()`, `Array(length)`, `Array(a, b, c)`.
fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    if args.len() == 1 {
        if let Value::Number(n) = args[0] {
            if !(n.is_finite() && n >= 0.0 && n.trunc() == n && n <= f64::from(u32::MAX)) {
                return Err(vm.range_error("Invalid array length"));
            }
            let arr = vm.new_array();
            vm.heap.array_truncate(arr, n as u32);
            return Ok(Value::Object(arr));
        }
    }
    Ok(Value::Object(vm.array_from(args)))
}

/// Present elements as a Vec; holes surface as `None`.
fn elements(vm: &Vm, arr: HeapId) -> Vec<Option<Value>> {
    let array = vm.heap.object(arr).as_array().expect("array receiver");
    (0..array.len()).map(|i| array.get(i)).collect()
}

fn push(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let mut length = vm.heap.array_length(arr);
    for &value in args {
        vm.heap.array_set_index(arr, length, value);
        length += 1;
    }
    Ok(Value::Number(f64::from(length)))
}

fn pop(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let length = vm.heap.array_length(arr);
    if length == 0 {
        return Ok(Value::Undefined);
    }
    let last = vm
        .heap
        .object(arr)
        .as_array()
        .and_then(|a| a.get(length - 1))
        .unwrap_or(Value::Undefined);
    vm.heap.array_truncate(arr, length - 1);
    Ok(last)
}

fn shift(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let items = elements(vm, arr);
    let Some((first, rest)) = items.split_first() else {
        return Ok(Value::Undefined);
    };
    for (index, slot) in rest.iter().enumerate() {
        match slot {
            Some(value) => vm.heap.array_set_index(arr, index as u32, *value),
            None => {
                if let Some(array) = vm.heap.object_mut(arr).as_array_mut() {
                    array.delete(index as u32);
                }
            }
        }
    }
    vm.heap.array_truncate(arr, rest.len() as u32);
    Ok(first.unwrap_or(Value::Undefined))
}

fn unshift(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let items = elements(vm, arr);
    let shift_by = args.len() as u32;
    for (index, slot) in items.iter().enumerate().rev() {
        match slot {
            Some(value) => vm.heap.array_set_index(arr, index as u32 + shift_by, *value),
            None => {
                if let Some(array) = vm.heap.object_mut(arr).as_array_mut() {
                    array.delete(index as u32 + shift_by);
                }
            }
        }
    }
    for (index, &value) in args.iter().enumerate() {
        vm.heap.array_set_index(arr, index as u32, value);
    }
    Ok(Value::Number(f64::from(items.len() as u32 + shift_by)))
}

fn join(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let separator = match arg(args, 0) {
        Value::Undefined => ",".to_owned(),
        other => vm.to_display_string(other)?,
    };
    let items = elements(vm, arr);
    let mut out = String::new();
    for (index, slot) in items.iter().enumerate() {
        if index > 0 {
            out.push_str(&separator);
        }
        match slot {
            None | Some(Value::Undefined | Value::Null) => {}
            Some(value) => out.push_str(&vm.to_display_string(*value)?),
        }
    }
    Ok(vm.str_value(out))
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    join(vm, this, &[])
}

fn concat(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let result = vm.new_array();
    vm.roots.push(Value::Object(result));
    let mut cursor = 0u32;
    let mut append = |vm: &mut Vm, value: Value, cursor: &mut u32| match value {
        Value::Object(id) if vm.heap.object(id).as_array().is_some() => {
            for slot in elements(vm, id) {
                if let Some(element) = slot {
                    vm.heap.array_set_index(result, *cursor, element);
                }
                *cursor += 1;
            }
        }
        other => {
            vm.heap.array_set_index(result, *cursor, other);
            *cursor += 1;
        }
    };
    append(vm, Value::Object(arr), &mut cursor);
    for &value in args {
        append(vm, value, &mut cursor);
    }
    vm.heap.array_truncate(result, cursor);
    vm.roots.pop();
    Ok(Value::Object(result))
}

/// Normalizes a possibly negative index against `length`.
fn clamp_index(raw: f64, length: u32) -> u32 {
    let length = f64::from(length);
    let index = if raw < 0.0 {
        (length + raw).max(0.0)
    } else {
        raw.min(length)
    };
    index as u32
}

fn slice(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let length = vm.heap.array_length(arr);
    let start_raw = vm.to_number(arg(args, 0))?;
    let start = clamp_index(if start_raw.is_nan() { 0.0 } else { start_raw }, length);
    let end = match arg(args, 1) {
        Value::Undefined => length,
        other => {
            let n = vm.to_number(other)?;
            clamp_index(if n.is_nan() { 0.0 } else { n }, length)
        }
    };
    let result = vm.new_array();
    let mut cursor = 0u32;
    for index in start..end.max(start) {
        let slot = vm.heap.object(arr).as_array().and_then(|a| a.get(index));
        if let Some(value) = slot {
            vm.heap.array_set_index(result, cursor, value);
        }
        cursor += 1;
    }
    vm.heap.array_truncate(result, cursor);
    Ok(Value::Object(result))
}

fn splice(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let length = vm.heap.array_length(arr);
    let start_raw = vm.to_number(arg(args, 0))?;
    let start = clamp_index(if start_raw.is_nan() { 0.0 } else { start_raw }, length);
    let delete_count = match arg(args, 1) {
        Value::Undefined => length - start,
        other => {
            let n = vm.to_number(other)?;
            let n = if n.is_nan() { 0.0 } else { n.max(0.0) };
            (n as u32).min(length - start)
        }
    };
    let inserted: Vec<Value> = if args.len() > 2 { args[2..].to_vec() } else { vec![] };

    let items = elements(vm, arr);
    let removed = vm.new_array();
    vm.roots.push(Value::Object(removed));
    for (offset, slot) in items
        .iter()
        .skip(start as usize)
        .take(delete_count as usize)
        .enumerate()
    {
        if let Some(value) = slot {
            vm.heap.array_set_index(removed, offset as u32, *value);
        }
    }
    vm.heap.array_truncate(removed, delete_count);

    // rebuild: prefix, inserted values, suffix
    let mut rebuilt: Vec<Option<Value>> = Vec::with_capacity(items.len());
    rebuilt.extend_from_slice(&items[..start as usize]);
    rebuilt.extend(inserted.iter().map(|&v| Some(v)));
    rebuilt.extend_from_slice(&items[(start + delete_count) as usize..]);
    for (index, slot) in rebuilt.iter().enumerate() {
        match slot {
            Some(value) => vm.heap.array_set_index(arr, index as u32, *value),
            None => {
                if let Some(array) = vm.heap.object_mut(arr).as_array_mut() {
                    array.delete(index as u32);
                }
            }
        }
    }
    vm.heap.array_truncate(arr, rebuilt.len() as u32);
    vm.roots.pop();
    Ok(Value::Object(removed))
}

fn index_of(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let needle = arg(args, 0);
    let length = vm.heap.array_length(arr);
    let from = match arg(args, 1) {
        Value::Undefined => 0,
        other => clamp_index(vm.to_number(other)?, length),
    };
    for index in from..length {
        let slot = vm.heap.object(arr).as_array().and_then(|a| a.get(index));
        if let Some(value) = slot {
            if vm.strict_equals(value, needle) {
                return Ok(Value::Number(f64::from(index)));
            }
        }
    }
    Ok(Value::Number(-1.0))
}

fn last_index_of(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let needle = arg(args, 0);
    let length = vm.heap.array_length(arr);
    for index in (0..length).rev() {
        let slot = vm.heap.object(arr).as_array().and_then(|a| a.get(index));
        if let Some(value) = slot {
            if vm.strict_equals(value, needle) {
                return Ok(Value::Number(f64::from(index)));
            }
        }
    }
    Ok(Value::Number(-1.0))
}

fn reverse(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let mut items = elements(vm, arr);
    items.reverse();
    for (index, slot) in items.iter().enumerate() {
        match slot {
            Some(value) => vm.heap.array_set_index(arr, index as u32, *value),
            None => {
                if let Some(array) = vm.heap.object_mut(arr).as_array_mut() {
                    array.delete(index as u32);
                }
            }
        }
    }
    Ok(this)
}

fn sort(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let arr = this_array(vm, this)?;
    let comparator = match arg(args, 0) {
        Value::Undefined => None,
        Value::Object(id) if vm.heap.object(id).is_function() => Some(id),
        _ => return Err(vm.type_error("Sort comparator must be a function")),
    };

    let length = vm.heap.array_length(arr);
    let mut present: Vec<Value> = elements(vm, arr).into_iter().flatten().collect();

    // insertion sort so a throwing comparator can unwind cleanly
    let mut index = 1;
    while index < present.len() {
        let mut cursor = index;
        while cursor > 0 {
            let ordered = sorts_before(vm, comparator, present[cursor - 1], present[cursor])?;
            if ordered {
                break;
            }
            present.swap(cursor - 1, cursor);
            cursor -= 1;
        }
        index += 1;
    }

    for (slot, &value) in present.iter().enumerate() {
        vm.heap.array_set_index(arr, slot as u32, value);
    }
    // holes stay at the tail
    for slot in present.len() as u32..length {
        if let Some(array) = vm.heap.object_mut(arr).as_array_mut() {
            array.delete(slot);
        }
    }
    Ok(this)
}

/// True when `a` should stay before `b`.
fn sorts_before(vm: &mut Vm, comparator: Option<HeapId>, a: Value, b: Value) -> Exec<bool> {
    // undefined sorts after everything
    if matches!(a, Value::Undefined) {
        return Ok(matches!(b, Value::Undefined));
    }
    if matches!(b, Value::Undefined) {
        return Ok(true);
    }
    match comparator {
        Some(func) => {
            let result = call_function(vm, func, Value::Undefined, &[a, b])?;
            let n = vm.to_number(result)?;
            Ok(n <= 0.0 || n.is_nan())
        }
        None => {
            let sa = vm.to_display_string(a)?;
            let sb = vm.to_display_string(b)?;
            Ok(sa <= sb)
        }
    }
}
