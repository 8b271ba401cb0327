//! The host-extension interface and file-level entry points.

mod common;

use jerboa::{ScriptValue, Vm};
use pretty_assertions::assert_eq;

fn host_add(_vm: &mut Vm, args: &[ScriptValue]) -> Result<ScriptValue, String> {
    match (args.first(), args.get(1)) {
        (Some(ScriptValue::Number(a)), Some(ScriptValue::Number(b))) => {
            Ok(ScriptValue::Number(a + b))
        }
        _ => Err("add expects two numbers".to_owned()),
    }
}

fn host_fail(_vm: &mut Vm, _args: &[ScriptValue]) -> Result<ScriptValue, String> {
    Err("host refused".to_owned())
}

#[test]
fn registered_modules_are_callable_from_script() {
    let mut vm = Vm::new();
    vm.register_module("host", &[("add", host_add)]);
    let result = vm.eval("host.add(20, 22);", "test.js").unwrap();
    assert_eq!(result, ScriptValue::Number(42.0));
}

#[test]
fn host_errors_raise_catchable_exceptions() {
    let mut vm = Vm::new();
    vm.register_module("host", &[("fail", host_fail)]);
    let result = vm
        .eval(
            "try { host.fail(); } catch (e) { e.message; }",
            "test.js",
        )
        .unwrap();
    assert_eq!(result, ScriptValue::String("host refused".to_owned()));
}

#[test]
fn modules_survive_collection() {
    let mut vm = Vm::new();
    vm.register_module("host", &[("add", host_add)]);
    // churn enough garbage to force collections between calls
    let src = "var out = 0;\n\
               for (var i = 0; i < 5000; i++) { out = host.add(out, 1) + +('' + i) * 0; }\n\
               out;";
    let result = vm.eval(src, "test.js").unwrap();
    assert_eq!(result, ScriptValue::Number(5000.0));
}

#[test]
fn include_directives_inline_other_files() {
    let dir = std::env::temp_dir().join(format!("jerboa-include-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let lib = dir.join("lib.js");
    let main = dir.join("main.js");
    std::fs::write(&lib, "function helper() { return 5; }\n").unwrap();
    std::fs::write(&main, "include \"lib.js\";\nhelper() + 1;\n").unwrap();

    let mut vm = Vm::new();
    let result = vm.eval_file(main.to_str().unwrap()).unwrap();
    assert_eq!(result, ScriptValue::Number(6.0));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn include_cycles_are_rejected() {
    let dir = std::env::temp_dir().join(format!("jerboa-cycle-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let a = dir.join("a.js");
    let b = dir.join("b.js");
    std::fs::write(&a, "include \"b.js\";\n").unwrap();
    std::fs::write(&b, "include \"a.js\";\n").unwrap();

    let mut vm = Vm::new();
    let err = vm.eval_file(a.to_str().unwrap()).unwrap_err();
    assert_eq!(err.name, "SyntaxError");
    assert!(err.message.contains("cycle"), "got: {}", err.message);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_files_fail_with_a_readable_error() {
    let mut vm = Vm::new();
    let err = vm.eval_file("/definitely/not/here.js").unwrap_err();
    assert!(err.message.contains("Could not read file"));
}

#[test]
fn common_helpers_are_shared() {
    // keep the shared helper module exercised from this test binary
    assert_eq!(common::num("2 + 2;"), 4.0);
}
