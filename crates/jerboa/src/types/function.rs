//! Function internal slot: native callbacks, script closures, and bound
//! functions produced by `Function.prototype.bind`.

use std::rc::Rc;

use crate::{
    ast::FunctionNode,
    exception::Exec,
    heap::{value_edge, HeapId},
    value::Value,
    vm::Vm,
};

/// Host/native callback. Raising means returning `Err`; the thrown value
/// propagates through the completion machinery like any script throw.
pub(crate) type NativeFn = fn(&mut Vm, Value, &[Value]) -> Exec<Value>;

/// Script function payload: the shared AST and the captured environment.
#[derive(Debug)]
pub(crate) struct ScriptFn {
    pub node: Rc<FunctionNode>,
    pub env: HeapId,
}

#[derive(Debug)]
pub(crate) enum FnKind {
    Native(NativeFn),
    Script(ScriptFn),
    Bound {
        target: HeapId,
        this: Value,
        args: Vec<Value>,
    },
    /// Host-extension callback, an index into the VM's registry.
    Host(usize),
}

#[derive(Debug)]
pub(crate) struct JsFunction {
    pub kind: FnKind,
}

impl JsFunction {
    pub fn native(func: NativeFn) -> Self {
        Self {
            kind: FnKind::Native(func),
        }
    }

    pub fn script(node: Rc<FunctionNode>, env: HeapId) -> Self {
        Self {
            kind: FnKind::Script(ScriptFn { node, env }),
        }
    }

    pub fn bound(target: HeapId, this: Value, args: Vec<Value>) -> Self {
        Self {
            kind: FnKind::Bound { target, this, args },
        }
    }

    pub fn host(index: usize) -> Self {
        Self {
            kind: FnKind::Host(index),
        }
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        match &self.kind {
            // parameter-default ASTs are reference-counted, not GC-managed
            FnKind::Script(script) => out.push(script.env),
            FnKind::Bound { target, this, args } => {
                out.push(*target);
                value_edge(*this, out);
                for arg in args {
                    value_edge(*arg, out);
                }
            }
            FnKind::Native(_) | FnKind::Host(_) => {}
        }
    }
}
