//! Error objects, propagation, stack capture, and the uncaught report.

mod common;

use common::{eval_err, num, text};
use pretty_assertions::assert_eq;

#[test]
fn uncaught_exception_reports_position_and_name() {
    let exception = eval_err("var x = 1;\nmissing();");
    assert_eq!(exception.name, "ReferenceError");
    assert_eq!(exception.message, "missing is not defined");
    assert_eq!(exception.file, "test.js");
    assert_eq!(exception.line, 2);
    let rendered = exception.to_string();
    assert!(rendered.starts_with("test.js:2:"), "got: {rendered}");
    assert!(rendered.contains("Uncaught ReferenceError: missing is not defined"));
}

#[test]
fn thrown_non_error_values_surface() {
    let exception = eval_err("throw 'plain string';");
    assert_eq!(exception.message, "plain string");
}

#[test]
fn error_objects_carry_position_properties() {
    assert_eq!(text("try { null.x; } catch (e) { e.file; }"), "test.js");
    assert_eq!(num("try {\n null.x;\n} catch (e) { e.line; }"), 2.0);
}

#[test]
fn stack_string_names_the_frames() {
    let src = "function inner() { throw new Error('deep'); }\n\
               function outer() { inner(); }\n\
               try { outer(); } catch (e) { e.stack; }";
    let stack = text(src);
    assert!(stack.contains("inner"), "got: {stack}");
    assert!(stack.contains("outer"), "got: {stack}");
}

#[test]
fn parse_errors_are_syntax_errors() {
    let exception = eval_err("var = 1;");
    assert_eq!(exception.name, "SyntaxError");
    let exception = eval_err("if (true {}");
    assert_eq!(exception.name, "SyntaxError");
}

#[test]
fn each_error_kind_has_its_own_prototype() {
    let src = "var e = new RangeError('r');\n\
               (e instanceof RangeError) + ',' + (e instanceof Error) + ',' + e.name;";
    assert_eq!(text(src), "true,true,RangeError");
}

#[test]
fn catch_scope_does_not_leak_the_binding() {
    assert_eq!(
        text("try { throw 1; } catch (oops) {} typeof oops;"),
        "undefined"
    );
}

#[test]
fn finally_propagates_its_own_throw() {
    let exception = eval_err("try { throw 'first'; } finally { throw 'second'; }");
    assert_eq!(exception.message, "second");
}

#[test]
fn deep_recursion_is_a_range_error() {
    let exception = eval_err("function f() { return f(); } f();");
    assert_eq!(exception.name, "RangeError");
    assert_eq!(exception.message, "Maximum call stack size exceeded");
}

#[test]
fn readonly_writes_fail_silently() {
    assert_eq!(num("Infinity = 5; 1 / 0 === Infinity ? 1 : 0;"), 1.0);
    assert_eq!(text("undefined = 3; typeof undefined;"), "undefined");
}

#[test]
fn labeled_continue_on_a_non_loop_is_a_syntax_error() {
    let exception = eval_err("here: { continue here; }");
    assert_eq!(exception.name, "SyntaxError");
}
