//! The `Math` host object.

use crate::{
    builtins::arg,
    exception::Exec,
    object::PropAttrs,
    value::Value,
    vm::Vm,
};

pub(crate) fn install(vm: &mut Vm) {
    let math = vm.new_object();
    let frozen = PropAttrs::READONLY | PropAttrs::LOCKED;
    for (name, value) in [("E", std::f64::consts::E), ("PI", std::f64::consts::PI)] {
        let key = vm.intern(name);
        vm.heap.define_prop(math, key, Value::Number(value), frozen);
    }
    vm.define_native(math, "abs", 1, abs);
    vm.define_native(math, "ceil", 1, ceil);
    vm.define_native(math, "floor", 1, floor);
    vm.define_native(math, "round", 1, round);
    vm.define_native(math, "max", 2, max);
    vm.define_native(math, "min", 2, min);
    vm.define_native(math, "pow", 2, pow);
    vm.define_native(math, "sqrt", 1, sqrt);
    vm.define_native(math, "random", 0, random);
    vm.define_native(math, "sin", 1, sin);
    vm.define_native(math, "cos", 1, cos);
    vm.define_native(math, "tan", 1, tan);
    vm.define_native(math, "atan", 1, atan);
    vm.define_native(math, "atan2", 2, atan2);
    vm.define_native(math, "exp", 1, exp);
    vm.define_native(math, "log", 1, log);
    let key = vm.intern("Math");
    let global = vm.global;
    vm.heap
        .define_prop(global, key, Value::Object(math), PropAttrs::HIDDEN);
}

macro_rules! unary_math {
    ($($name:ident => $body:expr),* $(,)?) => {
        $(
            fn $name(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
                let n = vm.to_number(arg(args, 0))?;
                let f: fn(f64) -> f64 = $body;
                Ok(Value::Number(f(n)))
            }
        )*
    };
}

unary_math! {
    abs => f64::abs,
    ceil => f64::ceil,
    floor => f64::floor,
    sqrt => f64::sqrt,
    sin => f64::sin,
    cos => f64::cos,
    tan => f64::tan,
    atan => f64::atan,
    exp => f64::exp,
    log => f64::ln,
}

fn round(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let n = vm.to_number(arg(args, 0))?;
    // round-half-up, so -0.5 rounds to 0
    Ok(Value::Number((n + 0.5).floor()))
}

fn max(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let mut best = f64::NEG_INFINITY;
    for &value in args {
        let n = vm.to_number(value)?;
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        best = best.max(n);
    }
    Ok(Value::Number(best))
}

fn min(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let mut best = f64::INFINITY;
    for &value in args {
        let n = vm.to_number(value)?;
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        best = best.min(n);
    }
    Ok(Value::Number(best))
}

fn pow(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let base = vm.to_number(arg(args, 0))?;
    let exponent = vm.to_number(arg(args, 1))?;
    Ok(Value::Number(base.powf(exponent)))
}

fn atan2(vm: &mut Vm, _this: Value, args: &[Value]) -> Exec<Value> {
    let y = vm.to_number(arg(args, 0))?;
    let x = vm.to_number(arg(args, 1))?;
    Ok(Value::Number(y.atan2(x)))
}

fn random(vm: &mut Vm, _this: Value, _args: &[Value]) -> Exec<Value> {
    Ok(Value::Number(vm.next_random()))
}
