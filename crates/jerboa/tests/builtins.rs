//! Builtin library coverage: Object, Function, Array, String, Number,
//! Boolean, Date, Math, JSON, Buffer.

mod common;

use common::{eval, eval_err, num, text, truth};
use jerboa::ScriptValue;
use pretty_assertions::assert_eq;

#[test]
fn object_prototype_methods() {
    assert_eq!(text("({}).toString();"), "[object Object]");
    assert_eq!(text("Object.prototype.toString.call([]);"), "[object Array]");
    assert!(truth("({ a: 1 }).hasOwnProperty('a');"));
    assert!(!truth("({ a: 1 }).hasOwnProperty('b');"));
    assert!(truth("Object.prototype.isPrototypeOf({});"));
    assert!(truth("({ a: 1 }).propertyIsEnumerable('a');"));
    assert!(!truth("[].propertyIsEnumerable('length');"));
}

#[test]
fn object_statics() {
    assert!(truth("Object.getPrototypeOf({}) === Object.prototype;"));
    assert!(truth("var p = { greet: 1 }; Object.create(p).greet === 1;"));
    assert_eq!(
        text("var o = {}; try { Object.setPrototypeOf(o, o); } catch (e) { e.name; }"),
        "TypeError"
    );
    assert!(truth(
        "var a = {}; var b = Object.create(a);\n\
         try { Object.setPrototypeOf(a, b); false; } catch (e) { e.name === 'TypeError'; }"
    ));
}

#[test]
fn function_call_apply_bind() {
    assert_eq!(
        num("function f(a, b) { return this.base + a + b; } f.call({ base: 10 }, 1, 2);"),
        13.0
    );
    assert_eq!(
        num("function f(a, b) { return this.base + a + b; } f.apply({ base: 10 }, [1, 2]);"),
        13.0
    );
    assert_eq!(
        num("function add(a, b) { return a + b; } var one = add.bind(null, 1); one(5);"),
        6.0
    );
    assert_eq!(
        text("function f() {} f.bind(null, 1).name;"),
        "bound f"
    );
    assert_eq!(num("function f(a, b, c) {} f.bind(null, 1).length;"), 2.0);
    assert_eq!(
        num("function Point(x) { this.x = x; } var P = Point.bind(null, 4); new P().x;"),
        4.0
    );
}

#[test]
fn function_constructor_compiles_source() {
    assert_eq!(num("var f = new Function('a', 'b', 'return a + b;'); f(2, 3);"), 5.0);
    assert_eq!(
        text("try { new Function('syntax error here'); } catch (e) { e.name; }"),
        "SyntaxError"
    );
}

#[test]
fn array_stack_operations() {
    assert_eq!(num("var a = [1, 2]; a.push(3, 4);"), 4.0);
    assert_eq!(text("var a = [1, 2]; a.push(3); a.join('');"), "123");
    assert_eq!(num("[1, 2, 3].pop();"), 3.0);
    assert_eq!(num("var a = [1, 2, 3]; a.pop(); a.length;"), 2.0);
    assert_eq!(num("[5, 6].shift();"), 5.0);
    assert_eq!(text("var a = [2, 3]; a.unshift(0, 1); a.join('-');"), "0-1-2-3");
}

#[test]
fn array_transformations() {
    assert_eq!(text("[1, [2, 3], 4].concat(5, [6]).join('');"), "123456");
    assert_eq!(text("[0, 1, 2, 3, 4].slice(1, -1).join('');"), "123");
    assert_eq!(text("[3, 1, 2].sort().join('');"), "123");
    assert_eq!(
        text("[3, 1, 2].sort(function(a, b) { return b - a; }).join('');"),
        "321"
    );
    assert_eq!(text("[10, 2, 1].sort().join(',');"), "1,10,2");
    assert_eq!(text("[1, 2, 3].reverse().join('');"), "321");
    assert_eq!(num("[1, 2, 3, 2].indexOf(2);"), 1.0);
    assert_eq!(num("[1, 2, 3, 2].lastIndexOf(2);"), 3.0);
    assert_eq!(num("[1, 2].indexOf(9);"), -1.0);
}

#[test]
fn array_splice() {
    assert_eq!(
        text("var a = [1, 2, 3, 4]; var r = a.splice(1, 2, 'x'); a.join(',') + '|' + r.join(',');"),
        "1,x,4|2,3"
    );
}

#[test]
fn array_length_writes_truncate() {
    assert_eq!(num("var a = [1, 2, 3]; a.length = 1; a.length;"), 1.0);
    assert_eq!(text("var a = [1, 2, 3]; a.length = 1; typeof a[1];"), "undefined");
    assert_eq!(
        text("var a = []; try { a.length = -1; } catch (e) { e.name; }"),
        "RangeError"
    );
    assert_eq!(
        text("var a = []; try { a.length = 1.5; } catch (e) { e.name; }"),
        "RangeError"
    );
}

#[test]
fn array_length_tracks_highest_index() {
    assert_eq!(num("var a = []; a[9] = 1; a.length;"), 10.0);
    assert_eq!(num("var a = [1]; a['1'] = 2; a.length;"), 2.0);
    // non-canonical index strings are plain properties
    assert_eq!(num("var a = []; a['01'] = 1; a.length;"), 0.0);
}

#[test]
fn string_basics() {
    assert_eq!(text("'hello'.charAt(1);"), "e");
    assert_eq!(num("'hello'.charCodeAt(0);"), 104.0);
    assert_eq!(num("'hello'.length;"), 5.0);
    assert_eq!(num("'héllo'.length;"), 5.0);
    assert_eq!(num("'abcabc'.indexOf('b', 2);"), 4.0);
    assert_eq!(num("'abcabc'.lastIndexOf('b');"), 4.0);
    assert_eq!(text("'abc'.concat('def', 123);"), "abcdef123");
    assert_eq!(text("'hello'.substring(3, 1);"), "ll");
    assert_eq!(text("'hello'.slice(-3);"), "llo");
    assert_eq!(text("'MiXeD'.toLowerCase();"), "mixed");
    assert_eq!(text("'MiXeD'.toUpperCase();"), "MIXED");
    assert_eq!(text("String.fromCharCode(104, 105);"), "hi");
    assert_eq!(text("new String('boxed').valueOf();"), "boxed");
    assert_eq!(num("new String('boxed').length;"), 5.0);
    assert_eq!(text("new String('ab')[1];"), "b");
}

#[test]
fn string_split() {
    assert_eq!(text("'a,b,c'.split(',').join('|');"), "a|b|c");
    assert_eq!(text("'abc'.split('').join('-');"), "a-b-c");
    assert_eq!(num("'a,b,c'.split(',', 2).length;"), 2.0);
    assert_eq!(text("'one'.split(undefined).join('');"), "one");
}

#[test]
fn number_formatting() {
    assert_eq!(text("(255).toString(16);"), "ff");
    assert_eq!(text("(8).toString(2);"), "1000");
    assert_eq!(text("(1.5).toFixed(3);"), "1.500");
    assert_eq!(text("(1234.5678).toFixed(1);"), "1234.6");
    assert_eq!(text("(12345).toExponential(2);"), "1.23e+4");
    assert_eq!(text("(0.00012).toPrecision(2);"), "0.00012");
    assert_eq!(
        text("try { (1).toFixed(101); } catch (e) { e.name; }"),
        "RangeError"
    );
    assert_eq!(text("(new Number(7)).valueOf() + '';"), "7");
}

#[test]
fn number_printing_follows_shortest_round_trip() {
    assert_eq!(text("'' + 0.1;"), "0.1");
    assert_eq!(text("'' + 1e21;"), "1e+21");
    assert_eq!(text("'' + 100;"), "100");
    assert_eq!(text("'' + -0;"), "0");
    assert_eq!(text("'' + 1 / 0;"), "Infinity");
    assert_eq!(text("'' + 0 / 0;"), "NaN");
}

#[test]
fn global_number_functions() {
    assert_eq!(num("parseInt('42px');"), 42.0);
    assert_eq!(num("parseInt('0x1A');"), 26.0);
    assert_eq!(num("parseInt('101', 2);"), 5.0);
    assert_eq!(num("parseInt('-7');"), -7.0);
    assert!(num("parseInt('zz');").is_nan());
    assert_eq!(num("parseFloat('3.14stuff');"), 3.14);
    assert!(truth("isNaN('abc');"));
    assert!(truth("isFinite(1);"));
    assert!(!truth("isFinite(1 / 0);"));
}

#[test]
fn escape_and_unescape_round_trip() {
    assert_eq!(text("escape('a b+c');"), "a%20b+c");
    assert_eq!(text("unescape('a%20b');"), "a b");
    assert_eq!(text("unescape(escape('déjà vu'));"), "déjà vu");
}

#[test]
fn math_object() {
    assert_eq!(num("Math.abs(-3);"), 3.0);
    assert_eq!(num("Math.floor(1.9);"), 1.0);
    assert_eq!(num("Math.ceil(1.1);"), 2.0);
    assert_eq!(num("Math.round(2.5);"), 3.0);
    assert_eq!(num("Math.round(-0.5);"), 0.0);
    assert_eq!(num("Math.max(1, 9, 4);"), 9.0);
    assert_eq!(num("Math.min(1, 9, 4);"), 1.0);
    assert_eq!(num("Math.pow(2, 10);"), 1024.0);
    assert_eq!(num("Math.sqrt(81);"), 9.0);
    assert!(truth("var r = Math.random(); r >= 0 && r < 1;"));
}

#[test]
fn date_utc_accessors() {
    let src = "var d = new Date(Date.UTC(2020, 1, 29, 12, 30, 45, 250));\n\
               d.getUTCFullYear() + ',' + d.getUTCMonth() + ',' + d.getUTCDate() + ',' +\n\
               d.getUTCHours() + ',' + d.getUTCMinutes() + ',' + d.getUTCSeconds() + ',' +\n\
               d.getUTCMilliseconds() + ',' + d.getUTCDay();";
    assert_eq!(text(src), "2020,1,29,12,30,45,250,6");
}

#[test]
fn date_parse_and_format() {
    assert_eq!(num("Date.parse('1970-01-01');"), 0.0);
    assert_eq!(num("Date.parse('1970-01-02T00:00:00Z');"), 86_400_000.0);
    assert!(num("Date.parse('nonsense');").is_nan());
    assert_eq!(
        text("new Date(0).toISOString();"),
        "1970-01-01T00:00:00.000Z"
    );
    assert!(truth("var d = new Date(0); Date.parse(d.toString()) === 0;"));
    assert_eq!(num("new Date(12345).getTime();"), 12345.0);
    assert!(truth("Date.now() > 0;"));
}

#[test]
fn json_parse() {
    assert_eq!(num("JSON.parse('42');"), 42.0);
    assert_eq!(text("JSON.parse('\"hi\\\\u0041\"');"), "hiA");
    assert_eq!(num("JSON.parse('[1, 2, 3]')[1];"), 2.0);
    assert_eq!(num("JSON.parse('{\"a\": {\"b\": 5}}').a.b;"), 5.0);
    assert!(truth("JSON.parse('true');"));
    assert_eq!(eval("JSON.parse('null');"), ScriptValue::Null);
    assert_eq!(
        text("try { JSON.parse('{bad}'); } catch (e) { e.name; }"),
        "SyntaxError"
    );
}

#[test]
fn json_stringify() {
    assert_eq!(text("JSON.stringify({ b: 1, a: [true, null] });"), "{\"b\":1,\"a\":[true,null]}");
    assert_eq!(text("JSON.stringify('he\"y');"), "\"he\\\"y\"");
    assert_eq!(
        text("JSON.stringify({ f: function() {}, u: undefined, n: 1 });"),
        "{\"n\":1}"
    );
    assert_eq!(text("JSON.stringify([undefined, function() {}]);"), "[null,null]");
    assert_eq!(text("JSON.stringify([1, , 3]);"), "[1,null,3]");
    assert_eq!(text("JSON.stringify(new Number(3));"), "3");
    assert_eq!(eval("JSON.stringify(undefined);"), ScriptValue::Undefined);
    assert_eq!(
        text("var o = {}; o.self = o; try { JSON.stringify(o); } catch (e) { e.message; }"),
        "Converting circular structure to JSON"
    );
}

#[test]
fn json_round_trip_preserves_shape() {
    let src = "var x = { list: [1, 'two', false, null], nested: { k: 'v' } };\n\
               var y = JSON.parse(JSON.stringify(x));\n\
               y.list[1] + ',' + y.list.length + ',' + y.nested.k;";
    assert_eq!(text(src), "two,4,v");
}

#[test]
fn buffers_clamp_and_bounds_check() {
    assert_eq!(num("var b = new Buffer(4); b.length;"), 4.0);
    assert_eq!(num("var b = new Buffer(4); b[0] = 300; b[0];"), 255.0);
    assert_eq!(num("var b = new Buffer(4); b[1] = -5; b[1];"), 0.0);
    assert_eq!(num("var b = new Buffer(4); b[2] = 7.9; b[2];"), 7.0);
    assert_eq!(
        text("var b = new Buffer(2); try { b[5]; } catch (e) { e.name; }"),
        "RangeError"
    );
    assert_eq!(
        text("var b = new Buffer(2); try { b[9] = 1; } catch (e) { e.name; }"),
        "RangeError"
    );
    assert_eq!(
        num("var w = new Buffer32(2); w[0] = 4294967295; w[0];"),
        4_294_967_295.0
    );
}

#[test]
fn wrapper_objects_unwrap_through_value_of() {
    assert_eq!(num("new Number(5) + 1;"), 6.0);
    assert_eq!(text("new Boolean(false).toString();"), "false");
    assert!(truth("new Boolean(false) ? true : false;"));
}

#[test]
fn error_to_string_and_cause() {
    assert_eq!(text("new TypeError('boom').toString();"), "TypeError: boom");
    assert_eq!(text("new Error().toString();"), "Error");
    assert_eq!(
        num("new Error('x', { cause: 42 }).cause;"),
        42.0
    );
}

#[test]
fn missing_builtin_lookups_fail_cleanly() {
    let exception = eval_err("({}).definitelyMissing();");
    assert_eq!(exception.name, "TypeError");
}
