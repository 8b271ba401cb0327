//! `Number` constructor, constants, and `Number.prototype` formatting
//! methods.

use crate::{
    builtins::{arg, define_ctor, this_number},
    exception::Exec,
    object::{JsObject, ObjKind, PropAttrs},
    value::{number_to_string, Value},
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let proto = vm.protos.number;
    vm.define_native(proto, "toString", 1, to_string);
    vm.define_native(proto, "valueOf", 0, value_of);
    vm.define_native(proto, "toFixed", 1, to_fixed);
    vm.define_native(proto, "toExponential", 1, to_exponential);
    vm.define_native(proto, "toPrecision", 1, to_precision);

    let ctor = define_ctor(vm, "Number", 1, constructor, proto);
    let frozen = PropAttrs::READONLY | PropAttrs::LOCKED;
    for (name, value) in [
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", f64::MIN_POSITIVE),
        ("NaN", f64::NAN),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
    ] {
        let key = vm.intern(name);
        vm.heap.define_prop(ctor, key, Value::Number(value), frozen);
    }
}

fn constructor(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let n = match args.first() {
        Some(&value) => vm.to_number(value)?,
        None => 0.0,
    };
    if vm.constructing {
        let proto = vm.protos.number;
        let wrapper = vm
            .heap
            .alloc_object(JsObject::with_kind(Some(proto), ObjKind::Number(n)));
        Ok(Value::Object(wrapper))
    } else {
        Ok(Value::Number(n))
    }
}

fn value_of(vm: &mut Vm, this: Value, _args: &[Value]) -> Exec<Value> {
    Ok(Value::Number(this_number(vm, this)?))
}

fn to_string(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let n = this_number(vm, this)?;
    let radix = match arg(args, 0) {
        Value::Undefined => 10,
        other => vm.to_int32(other)?,
    };
    if radix == 10 {
        return Ok(vm.str_value(number_to_string(n)));
    }
    if !(2..=36).contains(&radix) {
        return Err(vm.range_error("toString() radix must be between 2 and 36"));
    }
    Ok(vm.str_value(number_to_radix(n, radix as u32)))
}

/// Integer-and-fraction conversion by repeated division; fraction digits
/// stop after 20 places.
fn number_to_radix(value: f64, radix: u32) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let negative = value < 0.0;
    let magnitude = value.abs();
    let mut integer = magnitude.trunc();
    let mut fraction = magnitude - integer;

    let mut int_digits = Vec::new();
    if integer == 0.0 {
        int_digits.push(b'0');
    }
    while integer >= 1.0 {
        let digit = (integer % f64::from(radix)) as usize;
        int_digits.push(DIGITS[digit]);
        integer = (integer / f64::from(radix)).trunc();
    }
    int_digits.reverse();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(std::str::from_utf8(&int_digits).expect("ascii digits"));
    if fraction > 0.0 {
        out.push('.');
        for _ in 0..20 {
            fraction *= f64::from(radix);
            let digit = fraction.trunc() as usize;
            out.push(char::from(DIGITS[digit.min(35)]));
            fraction -= fraction.trunc();
            if fraction <= 0.0 {
                break;
            }
        }
    }
    out
}

fn fraction_digits(vm: &mut Vm, value: Value, max: u32) -> Exec<u32> {
    let digits = match value {
        Value::Undefined => 0.0,
        other => vm.to_number(other)?,
    };
    if !(digits.is_finite() && (0.0..=f64::from(max)).contains(&digits)) {
        return Err(vm.range_error("Argument must be between 0 and 100"));
    }
    Ok(digits as u32)
}

fn to_fixed(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let n = this_number(vm, this)?;
    let digits = fraction_digits(vm, arg(args, 0), 100)?;
    if !n.is_finite() {
        return Ok(vm.str_value(number_to_string(n)));
    }
    let digits = digits as usize;
    Ok(vm.str_value(format!("{n:.digits$}")))
}

/// Exponential rendering with the language's `e+`/`e-` form.
fn exponential_string(n: f64, digits: Option<u32>) -> String {
    if n == 0.0 {
        let mantissa = match digits {
            Some(d) if d > 0 => format!("0.{}", "0".repeat(d as usize)),
            _ => "0".to_owned(),
        };
        return format!("{mantissa}e+0");
    }
    let exponent = n.abs().log10().floor() as i32;
    let scaled = n / 10f64.powi(exponent);
    let mantissa = match digits {
        Some(d) => {
            let d = d as usize;
            format!("{scaled:.d$}")
        }
        None => number_to_string(scaled),
    };
    if exponent >= 0 {
        format!("{mantissa}e+{exponent}")
    } else {
        format!("{mantissa}e{exponent}")
    }
}

fn to_exponential(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let n = this_number(vm, this)?;
    if !n.is_finite() {
        return Ok(vm.str_value(number_to_string(n)));
    }
    let digits = match arg(args, 0) {
        Value::Undefined => None,
        other => Some(fraction_digits(vm, other, 100)?),
    };
    Ok(vm.str_value(exponential_string(n, digits)))
}

fn to_precision(vm: &mut Vm, this: Value, args: &[Value]) -> Exec<Value> {
    let n = this_number(vm, this)?;
    let precision = match arg(args, 0) {
        Value::Undefined => return Ok(vm.str_value(number_to_string(n))),
        other => vm.to_number(other)?,
    };
    if !(precision.is_finite() && (1.0..=100.0).contains(&precision)) {
        return Err(vm.range_error("Precision must be between 1 and 100"));
    }
    if !n.is_finite() {
        return Ok(vm.str_value(number_to_string(n)));
    }
    let precision = precision as i32;
    if n == 0.0 {
        return to_fixed(vm, this, &[Value::Number(f64::from(precision - 1))]);
    }
    let exponent = n.abs().log10().floor() as i32;
    if exponent < -6 || exponent >= precision {
        Ok(vm.str_value(exponential_string(n, Some((precision - 1) as u32))))
    } else {
        let decimals = (precision - 1 - exponent).max(0) as usize;
        Ok(vm.str_value(format!("{n:.decimals$}")))
    }
}
