//! `Date` constructor, statics, and prototype methods. Local-time getters
//! shift by the zone offset before splitting; the calendar math itself is
//! in [`crate::types::date`].

use crate::{
    builtins::{arg, define_ctor, this_date},
    exception::Exec,
    object::{JsObject, ObjKind},
    types::date::{
        format_iso, format_utc, local_offset_seconds, ms_to_parts, now_ms, parse_date,
        parts_to_ms, DateParts,
    },
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.date;
    vm.define_native(proto, "getTime", 0, get_time);
    vm.define_native(proto, "valueOf", 0, get_time);
    vm.define_native(proto, "setTime", 1, set_time);
    vm.define_native(proto, "getTimezoneOffset", 0, get_timezone_offset);
    vm.define_native(proto, "toString", 0, to_string);
    vm.define_native(proto, "toISOString", 0, to_iso_string);

    vm.define_native(proto, "getFullYear", 0, get_full_year);
    vm.define_native(proto, "getMonth", 0, get_month);
    vm.define_native(proto, "getDate", 0, get_date);
    vm.define_native(proto, "getDay", 0, get_day);
    vm.define_native(proto, "getHours", 0, get_hours);
    vm.define_native(proto, "getMinutes", 0, get_minutes);
    vm.define_native(proto, "getSeconds", 0, get_seconds);
    vm.define_native(proto, "getMilliseconds", 0, get_milliseconds);

    vm.define_native(proto, "getUTCFullYear", 0, get_utc_full_year);
    vm.define_native(proto, "getUTCMonth", 0, get_utc_month);
    vm.define_native(proto, "getUTCDate", 0, get_utc_date);
    vm.define_native(proto, "getUTCDay", 0, get_utc_day);
    vm.define_native(proto, "getUTCHours", 0, get_utc_hours);
    vm.define_native(proto, "getUTCMinutes", 0, get_utc_minutes);
    vm.define_native(proto, "getUTCSeconds", 0, get_utc_seconds);
    vm.define_native(proto, "getUTCMilliseconds", 0, get_utc_milliseconds);

    let ctor = define_ctor(vm, "Date", 7, constructor, proto);
    vm.define_native(ctor, "now", 0, now);
    vm.define_native(ctor, "parse", 1, parse);
    vm.define_native(ctor, "UTC", 7, utc);
}

pub(crate) fn new_date_object(vm: &mut Vm, ms: f64) -> Value {
    let proto = vm.protos.date;
    let id = vm
        .heap
        .alloc_object(JsObject::with_kind(Some(proto), ObjKind::Date(ms)));
    Value::Object(id)
}

fn args_to_ms(vm: &mut Vm, args: &[Value]) -> Exec<f64> {
    let mut fields = [0.0f64; 7];
    // year, month, day, hours, minutes, seconds, ms
    fields[2] = 1.0;
    for (index, slot) in fields.iter_mut().enumerate() {
        if let Some(&value) = args.get(index) {
            *slot = vm.to_number(value)?;
        }
    }
    let mut year = fields[0];
    if (0.0..=99.0).contains(&year) && year.trunc() == year {
        year += 1900.0;
    }
    let utc = parts_to_ms(
        year, fields[1], fields[2], fields[3], fields[4], fields[5], fields[6],
    );
    // fields describe local time
    Ok(utc - local_offset_seconds(utc) as f64 * 1000.0)
}

fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    if !vm.constructing {
        return Ok(vm.str_value(format_utc(now_ms())));
    }
    let ms = match args.len() {
        0 => now_ms(),
        1 => match arg(args, 0) {
            Value::Str(id) => parse_date(vm.heap.str(id).as_str()),
            other => vm.to_number(other)?,
        },
        _ => args_to_ms(vm, args)?,
    };
    Ok(new_date_object(vm, ms))
}

fn now(_vm: &mut Vm, _this: Value, _args: &[Value]) -> Exec<Value> {
    Ok(Value::Number(now_ms()))
}

fn parse(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let text = vm.to_display_string(arg(args, 0))?;
    Ok(Value::Number(parse_date(&text)))
}

fn utc(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let mut fields = [0.0f64; 7];
    fields[2] = 1.0;
    for (index, slot) in fields.iter_mut().enumerate() {
        if let Some(&value) = args.get(index) {
            *slot = vm.to_number(value)?;
        }
    }
    let mut year = fields[0];
    if (0.0..=99.0).contains(&year) && year.trunc() == year {
        year += 1900.0;
    }
    Ok(Value::Number(parts_to_ms(
        year, fields[1], fields[2], fields[3], fields[4], fields[5], fields[6],
    )))
}

fn get_time(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let (_, ms) = this_date(vm, this)?;
    Ok(Value::Number(ms))
}

fn set_time(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let (id, _) = this_date(vm, this)?;
    let ms = vm.to_number(arg(args, 0))?;
    vm.heap.object_mut(id).kind = ObjKind::Date(ms);
    Ok(Value::Number(ms))
}

fn get_timezone_offset(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let (_, ms) = this_date(vm, this)?;
    if ms.is_nan() {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(-(local_offset_seconds(ms) as f64) / 60.0))
}

fn to_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let (_, ms) = this_date(vm, this)?;
    Ok(vm.str_value(format_utc(ms)))
}

fn to_iso_string(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    let (_, ms) = this_date(vm, this)?;
    match format_iso(ms) {
        Some(text) => Ok(vm.str_value(text)),
        None => Err(vm.range_error("Invalid time value")),
    }
}

fn local_parts(vm: &mut Vm, this: Value) -> Exec<Option<DateParts>> {
    let (_, ms) = this_date(vm, this)?;
    if ms.is_nan() {
        return Ok(None);
    }
    Ok(ms_to_parts(ms + local_offset_seconds(ms) as f64 * 1000.0))
}

fn utc_parts(vm: &mut Vm, this: Value) -> Exec<Option<DateParts>> {
    let (_, ms) = this_date(vm, this)?;
    if ms.is_nan() {
        return Ok(None);
    }
    Ok(ms_to_parts(ms))
}

fn part_number(parts: Option<DateParts>, read: impl Fn(DateParts) -> f64) -> Value {
    match parts {
        Some(parts) => Value::Number(read(parts)),
        None => Value::Number(f64::NAN),
    }
}

macro_rules! getters {
    ($(($local:ident, $utc_name:ident, $field:expr)),* $(,)?) => {
        $(
            fn $local(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
                let parts = local_parts(vm, this)?;
                Ok(part_number(parts, $field))
            }

            fn $utc_name(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
                let parts = utc_parts(vm, this)?;
                Ok(part_number(parts, $field))
            }
        )*
    };
}

getters! {
    (get_full_year, get_utc_full_year, |p| p.year as f64),
    (get_month, get_utc_month, |p| f64::from(p.month)),
    (get_date, get_utc_date, |p| f64::from(p.day)),
    (get_day, get_utc_day, |p| f64::from(p.weekday)),
    (get_hours, get_utc_hours, |p| f64::from(p.hours)),
    (get_minutes, get_utc_minutes, |p| f64::from(p.minutes)),
    (get_seconds, get_utc_seconds, |p| f64::from(p.seconds)),
    (get_milliseconds, get_utc_milliseconds, |p| f64::from(p.millis)),
}
