//! Tree-walking evaluator.
//!
//! Control flow is a structured completion threaded through every step:
//! statements produce a [`Flow`] inside `Exec` (throws travel on the `Err`
//! side), expressions produce plain values. GC safe points sit at the top
//! of every evaluated statement; between safe points the evaluator keeps
//! any temporary that must survive a sub-evaluation on the VM root stack.

pub(crate) mod call;
pub(crate) mod expr;
pub(crate) mod stmt;

use crate::{
    ast::{Name, Node, NodeKind},
    exception::Exec,
    value::Value,
    vm::Vm,
};

/// Statement completion. `Break`/`Continue` carry their optional label;
/// throws are the `Err` arm of `Exec<Flow>`.
#[derive(Debug, Clone)]
pub(crate) enum Flow {
    Normal(Value),
    Return(Value),
    Break(Option<Name>),
    Continue(Option<Name>),
}

impl Flow {
    pub fn value(&self) -> Value {
        match self {
            Self::Normal(value) | Self::Return(value) => *value,
            Self::Break(_) | Self::Continue(_) => Value::Undefined,
        }
    }
}

/// Runs a parsed program against the VM's current global environment and
/// returns the value of its last statement.
pub(crate) fn eval_program(vm: &mut Vm, program: &Node) -> Exec<Value> {
    let NodeKind::Program { body } = &program.kind else {
        return Ok(Value::Undefined);
    };
    let env = vm.env;
    for node in body {
        stmt::hoist(vm, env, node);
    }
    // the running result must stay rooted across statement safe points
    let mark = vm.roots.len();
    vm.roots.push(Value::Undefined);
    for node in body {
        let flow = stmt::eval_stmt(vm, node);
        match flow {
            Ok(Flow::Normal(value)) => vm.roots[mark] = value,
            Ok(Flow::Return(value)) => {
                vm.roots.truncate(mark);
                return Ok(value);
            }
            Ok(Flow::Break(_) | Flow::Continue(_)) => {}
            Err(thrown) => {
                vm.roots.truncate(mark);
                return Err(thrown);
            }
        }
    }
    let last = vm.roots[mark];
    vm.roots.truncate(mark);
    Ok(last)
}
