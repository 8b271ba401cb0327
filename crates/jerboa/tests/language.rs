//! End-to-end language semantics: scope, hoisting, control flow, coercions.

mod common;

use common::{eval, num, text, truth};
use jerboa::ScriptValue;
use pretty_assertions::assert_eq;

#[test]
fn var_hoisting_reads_undefined_before_assignment() {
    assert_eq!(
        text("var first = typeof x; var x = 1; first + ',' + x;"),
        "undefined,1"
    );
    assert_eq!(num("var before = y; var y = 1; y;"), 1.0);
}

#[test]
fn function_declarations_bind_at_hoist_time() {
    assert_eq!(num("var r = f(); function f() { return 7; } r;"), 7.0);
}

#[test]
fn closures_capture_their_environment() {
    let src = "function mk() { var i = 0; return function() { return ++i; }; }\n\
               var c = mk();\n\
               c(); c(); c();";
    assert_eq!(num(src), 3.0);
}

#[test]
fn named_function_expression_name_is_internal() {
    assert_eq!(
        num("var f = function fac(n) { return n <= 1 ? 1 : n * fac(n - 1); }; f(5);"),
        120.0
    );
    assert_eq!(text("var f = function g() {}; typeof g;"), "undefined");
}

#[test]
fn try_finally_replaces_the_completion() {
    assert_eq!(
        num("function f() { try { return 1; } finally { return 2; } } f();"),
        2.0
    );
}

#[test]
fn try_catch_binds_the_thrown_value() {
    assert_eq!(num("try { throw 41; } catch (e) { e + 1; }"), 42.0);
    assert_eq!(
        text("var r = 'no'; try { null.x; } catch (e) { r = e.name; } r;"),
        "TypeError"
    );
}

#[test]
fn finally_runs_on_the_normal_path_too() {
    assert_eq!(
        text("var log = ''; try { log += 'a'; } finally { log += 'b'; } log;"),
        "ab"
    );
}

#[test]
fn for_in_orders_array_indices_before_named_keys() {
    let src = "var a = []; a[2] = 'c'; a[0] = 'a'; a.foo = 'x'; a[1] = 'b';\n\
               var keys = '';\n\
               for (var k in a) { keys += k + ';'; }\n\
               keys;";
    assert_eq!(text(src), "0;1;2;foo;");
}

#[test]
fn for_in_snapshot_ignores_mutation_during_iteration() {
    let src = "var o = { a: 1, b: 2 };\n\
               var seen = '';\n\
               for (var k in o) { seen += k; o['x' + k] = true; }\n\
               seen;";
    assert_eq!(text(src), "ab");
}

#[test]
fn for_of_over_strings_arrays_and_objects() {
    assert_eq!(
        text("var out = ''; for (var ch of 'abc') { out += ch + '.'; } out;"),
        "a.b.c."
    );
    assert_eq!(
        num("var total = 0; for (var v of [1, 2, 3]) { total += v; } total;"),
        6.0
    );
    assert_eq!(
        num("var total = 0; for (var v of { a: 1, b: 2 }) { total += v; } total;"),
        3.0
    );
}

#[test]
fn switch_falls_through_until_break() {
    let src = "function pick(v) {\n\
                 var out = '';\n\
                 switch (v) {\n\
                   case 1: out += 'one ';\n\
                   case 2: out += 'two '; break;\n\
                   default: out += 'other';\n\
                 }\n\
                 return out;\n\
               }\n\
               pick(1) + '|' + pick(2) + '|' + pick(9);";
    assert_eq!(text(src), "one two |two |other");
}

#[test]
fn labeled_break_and_continue_target_outer_loops() {
    let src = "var out = '';\n\
               outer: for (var i = 0; i < 3; i++) {\n\
                 for (var j = 0; j < 3; j++) {\n\
                   if (j == 1) continue outer;\n\
                   if (i == 2) break outer;\n\
                   out += '' + i + j;\n\
                 }\n\
               }\n\
               out;";
    assert_eq!(text(src), "0010");
}

#[test]
fn with_augments_the_scope_chain() {
    let src = "var o = { x: 10 };\n\
               var x = 1;\n\
               var r;\n\
               with (o) { r = x; x = 20; }\n\
               r + ',' + o.x + ',' + x;";
    assert_eq!(text(src), "10,20,1");
}

#[test]
fn abstract_equality_coercion_chain() {
    assert!(truth("'0' == false;"));
    assert!(truth("null == undefined;"));
    assert!(!truth("NaN == NaN;"));
    assert!(truth("1 == '1';"));
    assert!(!truth("null == 0;"));
    assert!(truth("[5] == 5;"));
}

#[test]
fn strict_equality_never_coerces() {
    assert!(!truth("'1' === 1;"));
    assert!(truth("1 === 1;"));
    assert!(!truth("NaN === NaN;"));
    assert!(!truth("({}) === ({});"));
    assert!(truth("var o = {}; o === o;"));
}

#[test]
fn plus_prefers_string_concatenation() {
    assert_eq!(text("1 + '2';"), "12");
    assert_eq!(num("1 + 2;"), 3.0);
    assert_eq!(text("'' + [1, 2];"), "1,2");
    assert_eq!(num("'3' - 1;"), 2.0);
    assert_eq!(num("true + true;"), 2.0);
}

#[test]
fn short_circuit_operators_return_operands() {
    assert_eq!(num("0 || 5;"), 5.0);
    assert_eq!(text("'a' && 'b';"), "b");
    assert_eq!(num("0 && 5;"), 0.0);
    assert_eq!(eval("null || false;"), ScriptValue::Bool(false));
}

#[test]
fn bitwise_and_shift_operators() {
    assert_eq!(num("5 & 3;"), 1.0);
    assert_eq!(num("5 | 3;"), 7.0);
    assert_eq!(num("5 ^ 3;"), 6.0);
    assert_eq!(num("~0;"), -1.0);
    assert_eq!(num("1 << 3;"), 8.0);
    assert_eq!(num("-8 >> 1;"), -4.0);
    assert_eq!(num("-1 >>> 0;"), 4_294_967_295.0);
    assert_eq!(num("1 << 33;"), 2.0);
}

#[test]
fn typeof_answers_without_throwing_on_unbound_names() {
    assert_eq!(text("typeof missing;"), "undefined");
    assert_eq!(text("typeof null;"), "object");
    assert_eq!(text("typeof 'x';"), "string");
    assert_eq!(text("typeof 1;"), "number");
    assert_eq!(text("typeof true;"), "boolean");
    assert_eq!(text("typeof function() {};"), "function");
    assert_eq!(text("typeof {};"), "object");
}

#[test]
fn delete_honors_dontdelete_and_returns_true_elsewhere() {
    assert!(truth("var o = { a: 1 }; delete o.a;"));
    assert_eq!(text("var o = { a: 1 }; delete o.a; typeof o.a;"), "undefined");
    assert!(truth("delete 1;"));
}

#[test]
fn in_and_instanceof() {
    assert!(truth("'a' in { a: 1 };"));
    assert!(!truth("'b' in { a: 1 };"));
    assert!(truth("0 in [7];"));
    assert!(truth("function A() {} new A() instanceof A;"));
    assert!(!truth("function A() {} function B() {} new A() instanceof B;"));
}

#[test]
fn update_expressions_return_the_right_value() {
    assert_eq!(num("var i = 1; i++;"), 1.0);
    assert_eq!(num("var i = 1; ++i;"), 2.0);
    assert_eq!(num("var i = 1; i++; i;"), 2.0);
    assert_eq!(num("var o = { n: 5 }; o.n--; o.n;"), 4.0);
}

#[test]
fn compound_assignment_variants() {
    assert_eq!(num("var x = 10; x += 5; x;"), 15.0);
    assert_eq!(text("var s = 'a'; s += 1; s;"), "a1");
    assert_eq!(num("var x = 7; x %= 4; x;"), 3.0);
    assert_eq!(num("var x = 1; x <<= 4; x;"), 16.0);
}

#[test]
fn conditional_and_comma() {
    assert_eq!(num("true ? 1 : 2;"), 1.0);
    assert_eq!(num("(1, 2, 3);"), 3.0);
}

#[test]
fn array_literal_holes_are_absent_not_undefined() {
    assert_eq!(num("[1, , 3].length;"), 3.0);
    assert!(!truth("1 in [0, , 2];"));
    assert_eq!(text("var seen = ''; for (var k in [0, , 2]) { seen += k; } seen;"), "02");
}

#[test]
fn object_literal_duplicate_keys_keep_the_last_value() {
    assert_eq!(num("({ a: 1, a: 2 }).a;"), 2.0);
}

#[test]
fn undeclared_assignment_lands_on_the_global() {
    assert_eq!(
        num("function f() { leaked = 9; } f(); leaked;"),
        9.0
    );
}

#[test]
fn this_defaults_to_the_global_object() {
    assert!(truth("var o = { me: function() { return this; } }; o.me() === o;"));
    assert_eq!(num("var n = 5; function f() { return this.n; } f();"), 5.0);
}

#[test]
fn eval_runs_in_the_caller_scope() {
    assert_eq!(num("var a = 2; eval('a + 1');"), 3.0);
    assert_eq!(num("function f() { var b = 5; return eval('b * 2'); } f();"), 10.0);
    assert_eq!(eval("eval(42);"), ScriptValue::Number(42.0));
}

#[test]
fn arguments_alias_declared_parameters() {
    assert_eq!(
        num("function f(a) { arguments[0] = 9; return a; } f(1);"),
        9.0
    );
    assert_eq!(
        num("function f(a) { a = 7; return arguments[0]; } f(1);"),
        7.0
    );
    assert_eq!(num("function f() { return arguments.length; } f(1, 2, 3);"), 3.0);
    assert_eq!(num("function f(a, b) { return arguments[2]; } f(1, 2, 30);"), 30.0);
}

#[test]
fn parameter_defaults_fill_missing_and_undefined_arguments() {
    assert_eq!(num("function f(a, b = 10) { return a + b; } f(1);"), 11.0);
    assert_eq!(num("function f(a, b = 10) { return a + b; } f(1, 2);"), 3.0);
    assert_eq!(
        num("function f(a, b = 10) { return a + b; } f(1, undefined);"),
        11.0
    );
}

#[test]
fn to_number_string_grammar() {
    assert_eq!(num("+'  42  ';"), 42.0);
    assert_eq!(num("+'0x10';"), 16.0);
    assert_eq!(num("+'';"), 0.0);
    assert!(num("+'12px';").is_nan());
    assert_eq!(num("+null;"), 0.0);
    assert!(num("+undefined;").is_nan());
}

#[test]
fn relational_comparison_is_lexicographic_for_strings() {
    assert!(truth("'apple' < 'banana';"));
    assert!(truth("'2' > '10';"));
    assert!(!truth("2 > 10;"));
    assert!(!truth("undefined < 1;"));
}

#[test]
fn last_statement_value_is_the_program_result() {
    assert_eq!(num("var x; x = 1; x;"), 1.0);
    assert_eq!(eval("var x = 1;"), ScriptValue::Undefined);
}
