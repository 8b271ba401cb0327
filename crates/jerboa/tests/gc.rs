//! Collection under allocation pressure: results must be unaffected by
//! when collections run.

mod common;

use common::{num, text};
use pretty_assertions::assert_eq;

#[test]
fn garbage_heavy_loops_keep_live_values_intact() {
    let src = "var keep = 'start';\n\
               for (var i = 0; i < 20000; i++) {\n\
                 var garbage = 'tmp' + i + i;\n\
                 if (i == 19999) { keep = garbage; }\n\
               }\n\
               keep;";
    assert_eq!(text(src), "tmp1999919999");
}

#[test]
fn cyclic_structures_do_not_break_the_run() {
    let src = "for (var i = 0; i < 3000; i++) {\n\
               var a = {}; var b = { peer: a }; a.peer = b;\n\
               var list = [a, b]; list[0].tag = 'x' + i;\n\
               }\n\
               'done';";
    assert_eq!(text(src), "done");
}

#[test]
fn closures_keep_their_environments_across_collections() {
    let src = "function counter() { var n = 0; return function() { return ++n; }; }\n\
               var c = counter();\n\
               for (var i = 0; i < 10000; i++) { var junk = 'j' + i; c(); }\n\
               c();";
    assert_eq!(num(src), 10001.0);
}

#[test]
fn prototypes_survive_when_only_instances_are_reachable() {
    let src = "function Thing(v) { this.v = v; }\n\
               Thing.prototype.get = function() { return this.v; };\n\
               var kept = new Thing(7);\n\
               for (var i = 0; i < 10000; i++) { var junk = [i, 'x' + i]; }\n\
               kept.get();";
    assert_eq!(num(src), 7.0);
}
