use jerboa::{Exception, ScriptValue, Vm};

pub fn eval(source: &str) -> ScriptValue {
    Vm::new().eval(source, "test.js").expect("script failed")
}

pub fn eval_err(source: &str) -> Exception {
    Vm::new()
        .eval(source, "test.js")
        .expect_err("expected script to fail")
}

pub fn num(source: &str) -> f64 {
    match eval(source) {
        ScriptValue::Number(n) => n,
        other => panic!("expected number, got {other:?}"),
    }
}

pub fn text(source: &str) -> String {
    match eval(source) {
        ScriptValue::String(s) => s,
        other => panic!("expected string, got {other:?}"),
    }
}

pub fn truth(source: &str) -> bool {
    match eval(source) {
        ScriptValue::Bool(b) => b,
        other => panic!("expected boolean, got {other:?}"),
    }
}
