//! `String` constructor and `String.prototype`, including the
//! regex-powered `match`, `search`, `replace`, and `split`.

use crate::{
    builtins::{arg, define_ctor, regexp::build_match_result, this_string},
    eval::call::call_function,
    exception::Exec,
    heap::HeapId,
    object::{JsObject, ObjKind},
    types::regexp::JsRegExp,
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.string;
    vm.define_native(proto, "toString", 0, to_string);
    vm.define_native(proto, "valueOf", 0, to_string);
    vm.define_native(proto, "charAt", 1, char_at);
    vm.define_native(proto, "charCodeAt", 1, char_code_at);
    vm.define_native(proto, "indexOf", 1, index_of);
    vm.define_native(proto, "lastIndexOf", 1, last_index_of);
    vm.define_native(proto, "concat", 1, concat);
    vm.define_native(proto, "split", 2, split);
    vm.define_native(proto, "substring", 2, substring);
    vm.define_native(proto, "slice", 2, slice);
    vm.define_native(proto, "toLowerCase", 0, to_lower_case);
    vm.define_native(proto, "toUpperCase", 0, to_upper_case);
    vm.define_native(proto, "match", 1, string_match);
    vm.define_native(proto, "search", 1, search);
    vm.define_native(proto, "replace", 2, replace);

    let ctor = define_ctor(vm, "String", 1, constructor, proto);
    vm.define_native(ctor, "fromCharCode", 1, from_char_code);
}

fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let text = match args.first() {
        Some(&value) => vm.to_display_string(value)?,
        None => String::new(),
    };
    if vm.constructing {
        let handle = vm.heap.alloc_string(text);
        let proto = vm.protos.string;
        let wrapper = vm
            .heap
            .alloc_object(JsObject::with_kind(Some(proto), ObjKind::String(handle)));
        Ok(Value::Object(wrapper))
    } else {
        Ok(vm.str_value(text))
    }
}

fn from_char_code(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let mut out = String::with_capacity(args.len());
    for &value in args {
        let code = vm.to_uint32(value)? & 0xFFFF;
        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
    }
    Ok(vm.str_value(out))
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    match this {
        Value::Str(_) => Ok(this),
        Value::Object(id) => match vm.heap.object(id).kind {
            ObjKind::String(inner) => Ok(Value::Str(inner)),
            _ => Err(vm.type_error("Receiver is not a string")),
        },
        _ => Err(vm.type_error("Receiver is not a string")),
    }
}

fn char_at(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let index = vm.to_number(arg(args, 0))?;
    if index < 0.0 || index.is_nan() {
        return Ok(vm.str_value(""));
    }
    match vm.heap.str(handle).char_at(index as usize) {
        Some(ch) => Ok(vm.str_value(ch.to_string())),
        None => Ok(vm.str_value("")),
    }
}

fn char_code_at(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let index = vm.to_number(arg(args, 0))?;
    if index < 0.0 || index.is_nan() {
        return Ok(Value::Number(f64::NAN));
    }
    match vm.heap.str(handle).code_at(index as usize) {
        Some(code) => Ok(Value::Number(f64::from(code))),
        None => Ok(Value::Number(f64::NAN)),
    }
}

/// Glyph index of the first occurrence of `needle` at or after glyph
/// `from`, or `None`.
fn find_from(haystack: &crate::types::str::JsString, needle: &str, from: usize) -> Option<usize> {
    let text = haystack.as_str();
    let start_byte = haystack.substring(0, from).len();
    let found = text.get(start_byte..)?.find(needle)?;
    Some(text[..start_byte + found].chars().count())
}

fn index_of(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let needle = vm.to_display_string(arg(args, 0))?;
    let from = match arg(args, 1) {
        Value::Undefined => 0.0,
        other => vm.to_number(other)?.max(0.0),
    };
    let found = find_from(vm.heap.str(handle), &needle, from as usize);
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn last_index_of(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let needle = vm.to_display_string(arg(args, 0))?;
    let text = vm.heap.str(handle).as_str();
    match text.rfind(&needle) {
        Some(byte_index) => Ok(Value::Number(text[..byte_index].chars().count() as f64)),
        None => Ok(Value::Number(-1.0)),
    }
}

fn concat(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let mut out = vm.heap.str(handle).as_str().to_owned();
    for &value in args {
        out.push_str(&vm.to_display_string(value)?);
    }
    Ok(vm.str_value(out))
}

fn substring(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let length = vm.heap.str(handle).len() as f64;
    let normalize = |raw: f64| -> usize {
        if raw.is_nan() || raw < 0.0 {
            0
        } else {
            raw.min(length) as usize
        }
    };
    let mut start = normalize(vm.to_number(arg(args, 0))?);
    let mut end = match arg(args, 1) {
        Value::Undefined => length as usize,
        other => normalize(vm.to_number(other)?),
    };
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    let out = vm.heap.str(handle).substring(start, end).to_owned();
    Ok(vm.str_value(out))
}

fn slice(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let length = vm.heap.str(handle).len() as f64;
    let resolve = |raw: f64| -> usize {
        let idx = if raw < 0.0 { length + raw } else { raw };
        idx.clamp(0.0, length) as usize
    };
    let start_raw = vm.to_number(arg(args, 0))?;
    let start = resolve(if start_raw.is_nan() { 0.0 } else { start_raw });
    let end = match arg(args, 1) {
        Value::Undefined => length as usize,
        other => {
            let n = vm.to_number(other)?;
            resolve(if n.is_nan() { 0.0 } else { n })
        }
    };
    let out = vm
        .heap
        .str(handle)
        .substring(start, end.max(start))
        .to_owned();
    Ok(vm.str_value(out))
}

fn to_lower_case(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let out = vm.heap.str(handle).as_str().to_lowercase();
    Ok(vm.str_value(out))
}

fn to_upper_case(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let out = vm.heap.str(handle).as_str().to_uppercase();
    Ok(vm.str_value(out))
}

/// Pattern argument for match/search/replace/split: a RegExp object is used
/// as-is, anything else is coerced to a string and compiled without flags.
fn pattern_regexp(vm: &mut Vm, pattern: Value) -> Exec<(JsRegExp, Option<HeapId>)> {
    let recompile = match pattern {
        Value::Object(id) => vm.heap.object(id).as_regexp().map(|re| {
            let flags = match (re.global, re.ignore_case) {
                (true, true) => "gi",
                (true, false) => "g",
                (false, true) => "i",
                (false, false) => "",
            };
            (id, re.source.to_string(), flags)
        }),
        _ => None,
    };
    if let Some((id, source, flags)) = recompile {
        let copy = JsRegExp::compile(&source, flags).map_err(|err| vm.syntax_error(&err))?;
        return Ok((copy, Some(id)));
    }
    let source = vm.to_display_string(pattern)?;
    let compiled =
        JsRegExp::compile(&escape_regex(&source), "").map_err(|err| vm.syntax_error(&err))?;
    Ok((compiled, None))
}

/// String patterns match literally: escape every metacharacter.
fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if "\\^$.|?*+()[]{}".contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn string_match(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let (re, re_obj) = pattern_regexp(vm, arg(args, 0))?;
    if !re.global {
        return match re.find_at(vm.heap.str(handle), 0) {
            Some(found) => {
                let result = build_match_result(vm, handle, &found);
                Ok(Value::Object(result))
            }
            None => Ok(Value::Null),
        };
    }
    // global: collect every match as a plain string, bumping past empties
    let result = vm.new_array();
    vm.roots.push(Value::Object(result));
    let mut cursor = 0usize;
    let mut count = 0u32;
    loop {
        let Some(found) = re.find_at(vm.heap.str(handle), cursor) else {
            break;
        };
        let text = vm
            .heap
            .str(handle)
            .substring(found.start, found.end)
            .to_owned();
        let element = vm.str_value(text);
        vm.heap.array_set_index(result, count, element);
        count += 1;
        cursor = if found.end == found.start {
            found.end + 1
        } else {
            found.end
        };
    }
    vm.roots.pop();
    if let Some(obj) = re_obj {
        set_last_index(vm, obj, 0);
    }
    if count == 0 {
        return Ok(Value::Null);
    }
    Ok(Value::Object(result))
}

fn search(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let (re, _) = pattern_regexp(vm, arg(args, 0))?;
    match re.find_at(vm.heap.str(handle), 0) {
        Some(found) => Ok(Value::Number(found.start as f64)),
        None => Ok(Value::Number(-1.0)),
    }
}

pub(crate) fn set_last_index(vm: &mut Vm, re_obj: HeapId, value: u32) {
    let key = vm.names.last_index;
    vm.heap
        .put_prop(re_obj, key, Value::Number(f64::from(value)));
}

fn replace(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let (re, _) = pattern_regexp(vm, arg(args, 0))?;
    let replacement = arg(args, 1);
    let replacer_fn = match replacement {
        Value::Object(id) if vm.heap.object(id).is_function() => Some(id),
        _ => None,
    };
    let template = if replacer_fn.is_none() {
        Some(vm.to_display_string(replacement)?)
    } else {
        None
    };

    let mut out = String::new();
    let mut cursor = 0usize;
    loop {
        let Some(found) = re.find_at(vm.heap.str(handle), cursor) else {
            break;
        };
        let prefix = vm.heap.str(handle).substring(cursor, found.start).to_owned();
        out.push_str(&prefix);

        let whole = vm
            .heap
            .str(handle)
            .substring(found.start, found.end)
            .to_owned();
        if let Some(func) = replacer_fn {
            // (match, p1..pn, offset, input)
            let mut call_args: Vec<Value> = Vec::with_capacity(found.groups.len() + 2);
            let whole_value = vm.str_value(whole.clone());
            call_args.push(whole_value);
            for group in found.groups.iter().skip(1) {
                let value = match group {
                    Some((start, end)) => {
                        let text = vm.heap.str(handle).substring(*start, *end).to_owned();
                        vm.str_value(text)
                    }
                    None => Value::Undefined,
                };
                call_args.push(value);
            }
            call_args.push(Value::Number(found.start as f64));
            call_args.push(Value::Str(handle));
            let mark = vm.roots.len();
            vm.roots.extend(call_args.iter().copied());
            let replaced = call_function(vm, func, Value::Undefined, &call_args);
            vm.roots.truncate(mark);
            out.push_str(&vm.to_display_string(replaced?)?);
        } else if let Some(template) = &template {
            expand_template(vm, template, handle, &found, &whole, &mut out);
        }

        cursor = if found.end == found.start {
            if let Some(ch) = vm.heap.str(handle).char_at(found.start) {
                out.push(ch);
            }
            found.end + 1
        } else {
            found.end
        };
        if !re.global {
            break;
        }
    }
    let tail_len = vm.heap.str(handle).len();
    let tail = vm.heap.str(handle).substring(cursor.min(tail_len), tail_len).to_owned();
    out.push_str(&tail);
    Ok(vm.str_value(out))
}

/// `$$`, `$&`, and `$1`–`$9` in string replacement templates.
fn expand_template(
    vm: &Vm,
    template: &str,
    handle: HeapId,
    found: &crate::types::regexp::ReMatch,
    whole: &str,
    out: &mut String,
) {
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() {
            match chars[i + 1] {
                '$' => {
                    out.push('$');
                    i += 2;
                    continue;
                }
                '&' => {
                    out.push_str(whole);
                    i += 2;
                    continue;
                }
                d @ '1'..='9' => {
                    let index = d as usize - '0' as usize;
                    if let Some(Some((start, end))) = found.groups.get(index) {
                        out.push_str(vm.heap.str(handle).substring(*start, *end));
                    }
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(chars[i]);
        i += 1;
    }
}

fn split(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let handle = this_string(vm, this)?;
    let separator = arg(args, 0);
    let limit = match arg(args, 1) {
        Value::Undefined => u32::MAX,
        other => vm.to_uint32(other)?,
    };

    let result = vm.new_array();
    if limit == 0 {
        return Ok(Value::Object(result));
    }
    let mark = vm.roots.len();
    vm.roots.push(Value::Object(result));
    let mut count = 0u32;
    let mut push = |vm: &mut Vm, text: String, count: &mut u32| {
        let element = vm.str_value(text);
        vm.heap.array_set_index(result, *count, element);
        *count += 1;
    };

    match separator {
        Value::Undefined => {
            let whole = vm.heap.str(handle).as_str().to_owned();
            push(vm, whole, &mut count);
        }
        _ => {
            let is_regexp = matches!(separator, Value::Object(id) if vm.heap.object(id).as_regexp().is_some());
            if !is_regexp {
                let sep_text = vm.to_display_string(separator)?;
                if sep_text.is_empty() {
                    // split into single code points
                    let chars: Vec<char> =
                        vm.heap.str(handle).as_str().chars().collect();
                    for ch in chars {
                        if count >= limit {
                            break;
                        }
                        push(vm, ch.to_string(), &mut count);
                    }
                    vm.roots.truncate(mark);
                    return Ok(Value::Object(result));
                }
                let pieces: Vec<String> = vm
                    .heap
                    .str(handle)
                    .as_str()
                    .split(&sep_text)
                    .map(ToOwned::to_owned)
                    .collect();
                for piece in pieces {
                    if count >= limit {
                        break;
                    }
                    push(vm, piece, &mut count);
                }
                vm.roots.truncate(mark);
                return Ok(Value::Object(result));
            }

            let (re, _) = pattern_regexp(vm, separator)?;
            let mut cursor = 0usize;
            let mut piece_start = 0usize;
            let length = vm.heap.str(handle).len();
            while cursor <= length && count < limit {
                let Some(found) = re.find_at(vm.heap.str(handle), cursor) else {
                    break;
                };
                // zero-width matches advance one code point
                if found.end == found.start {
                    if found.start >= length {
                        break;
                    }
                    cursor = found.start + 1;
                    continue;
                }
                let piece = vm
                    .heap
                    .str(handle)
                    .substring(piece_start, found.start)
                    .to_owned();
                push(vm, piece, &mut count);
                piece_start = found.end;
                cursor = found.end;
            }
            if count < limit {
                let tail = vm.heap.str(handle).substring(piece_start, length).to_owned();
                push(vm, tail, &mut count);
            }
        }
    }
    vm.roots.truncate(mark);
    Ok(Value::Object(result))
}
