//! RegExp objects, `exec`/`test`, `lastIndex`, and the regex-powered
//! string methods.

mod common;

use common::{eval, num, text, truth};
use jerboa::ScriptValue;
use pretty_assertions::assert_eq;

#[test]
fn match_returns_captures_index_and_input() {
    let src = "var m = 'abc123'.match(new RegExp('([a-z]+)(\\\\d+)'));\n\
               m[0] + '|' + m[1] + '|' + m[2] + '|' + m.index + '|' + m.length;";
    assert_eq!(text(src), "abc123|abc|123|0|3");
}

#[test]
fn match_without_a_hit_is_null() {
    assert_eq!(eval("'abc'.match(new RegExp('z+'));"), ScriptValue::Null);
}

#[test]
fn exec_and_test() {
    assert_eq!(
        text("var re = new RegExp('(b)(c)?'); var m = re.exec('ab'); m[1] + ',' + typeof m[2];"),
        "b,undefined"
    );
    assert!(truth("new RegExp('^ab').test('abc');"));
    assert!(!truth("new RegExp('^b').test('abc');"));
}

#[test]
fn global_flag_advances_last_index() {
    let src = "var re = new RegExp('a', 'g');\n\
               var first = re.exec('banana');\n\
               var second = re.exec('banana');\n\
               first.index + ',' + second.index + ',' + re.lastIndex;";
    assert_eq!(text(src), "1,3,4");
}

#[test]
fn last_index_resets_after_a_miss() {
    let src = "var re = new RegExp('na', 'g');\n\
               re.exec('banana'); re.exec('banana'); re.exec('banana');\n\
               re.lastIndex;";
    assert_eq!(num(src), 0.0);
}

#[test]
fn case_insensitive_flag() {
    assert!(truth("new RegExp('HeLLo', 'i').test('hello');"));
    assert!(truth("new RegExp('привет', 'i').test('ПРИВЕТ');"));
}

#[test]
fn global_match_collects_all_occurrences() {
    assert_eq!(
        text("'a1b2c3'.match(new RegExp('\\\\d', 'g')).join('');"),
        "123"
    );
}

#[test]
fn search_and_replace() {
    assert_eq!(num("'hello world'.search(new RegExp('world'));"), 6.0);
    assert_eq!(num("'hello'.search(new RegExp('z'));"), -1.0);
    assert_eq!(
        text("'a-b-c'.replace('-', '+');"),
        "a+b-c"
    );
    assert_eq!(
        text("'a-b-c'.replace(new RegExp('-', 'g'), '+');"),
        "a+b+c"
    );
    assert_eq!(
        text("'john smith'.replace(new RegExp('(\\\\w+) (\\\\w+)'), '$2 $1');"),
        "smith john"
    );
    assert_eq!(
        text("'xy'.replace(new RegExp('(x)'), '[$&$$]');"),
        "[x$]y"
    );
    assert_eq!(
        text("'abc'.replace(new RegExp('b'), function(m) { return m.toUpperCase(); });"),
        "aBc"
    );
}

#[test]
fn split_with_a_regex_separator() {
    assert_eq!(
        text("'a1b22c'.split(new RegExp('\\\\d+')).join('|');"),
        "a|b|c"
    );
}

#[test]
fn regexp_instance_properties() {
    let src = "var re = new RegExp('ab+', 'gi');\n\
               re.source + '|' + re.global + '|' + re.ignoreCase + '|' + re.lastIndex;";
    assert_eq!(text(src), "ab+|true|true|0");
    assert_eq!(text("new RegExp('a', 'g').toString();"), "/a/g");
}

#[test]
fn invalid_patterns_raise_syntax_error() {
    assert_eq!(
        text("try { new RegExp('('); } catch (e) { e.name; }"),
        "SyntaxError"
    );
    assert_eq!(
        text("try { new RegExp('a', 'q'); } catch (e) { e.name; }"),
        "SyntaxError"
    );
}

#[test]
fn backreferences_and_boundaries() {
    assert!(truth("new RegExp('(ha)\\\\1').test('hahaha');"));
    assert!(truth("new RegExp('\\\\bword\\\\b').test('a word here');"));
    assert!(!truth("new RegExp('\\\\bword\\\\b').test('wordy');"));
}
