//! Statement evaluation and the hoisting pass.

use std::rc::Rc;

use crate::{
    ast::{Name, Node, NodeKind},
    eval::{
        call::new_script_function,
        expr::{assign_target, eval_expr},
        Flow,
    },
    exception::{Exec, Thrown},
    heap::HeapId,
    object::{ObjKind, PropAttrs},
    scope::ScopeRecord,
    value::Value,
    vm::Vm,
};

/// What a loop does after evaluating its body (or an iteration tail).
enum AfterBody {
    KeepGoing,
    Exit,
    Propagate(Flow),
}

/// Root-stack slot keeping a block/loop's running completion value alive
/// across statement safe points. On throw paths the slot is reclaimed by
/// the nearest enclosing root mark.
struct LastValue {
    slot: usize,
}

impl LastValue {
    fn new(vm: &mut Vm) -> Self {
        vm.roots.push(Value::Undefined);
        Self {
            slot: vm.roots.len() - 1,
        }
    }

    fn set(&self, vm: &mut Vm, value: Value) {
        vm.roots[self.slot] = value;
    }

    fn take(self, vm: &mut Vm) -> Value {
        let value = vm.roots[self.slot];
        vm.roots.truncate(self.slot);
        value
    }
}

fn after_loop_body(flow: Flow, label: Option<&Name>) -> AfterBody {
    match flow {
        Flow::Normal(_) => AfterBody::KeepGoing,
        Flow::Return(_) => AfterBody::Propagate(flow),
        Flow::Break(None) => AfterBody::Exit,
        Flow::Break(Some(ref target)) if label.is_some_and(|l| l == target) => AfterBody::Exit,
        Flow::Break(_) => AfterBody::Propagate(flow),
        Flow::Continue(None) => AfterBody::KeepGoing,
        Flow::Continue(Some(ref target)) if label.is_some_and(|l| l == target) => {
            AfterBody::KeepGoing
        }
        Flow::Continue(_) => AfterBody::Propagate(flow),
    }
}

/// Pre-execution binding pass: every `var` name is bound to `undefined` if
/// not already present, and every function declaration is constructed and
/// bound. Recursion stops at function boundaries.
pub(crate) fn hoist(vm: &mut Vm, env: HeapId, node: &Node) {
    match &node.kind {
        NodeKind::Var { decls } => {
            for decl in decls {
                hoist_var(vm, env, &decl.name);
            }
        }
        NodeKind::FunctionDecl { func } => {
            let fn_obj = new_script_function(vm, func, env);
            let name = func.name.as_ref().expect("declarations are always named");
            let key = vm.intern(name);
            vm.env_define(env, key, Value::Object(fn_obj));
        }
        NodeKind::Program { body } | NodeKind::Block { body } => {
            for item in body {
                hoist(vm, env, item);
            }
        }
        NodeKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            hoist(vm, env, then_branch);
            if let Some(alt) = else_branch {
                hoist(vm, env, alt);
            }
        }
        NodeKind::While { body, .. } | NodeKind::DoWhile { body, .. } => hoist(vm, env, body),
        NodeKind::For { init, body, .. } => {
            if let Some(init) = init {
                hoist(vm, env, init);
            }
            hoist(vm, env, body);
        }
        NodeKind::ForIn {
            target,
            is_var,
            body,
            ..
        }
        | NodeKind::ForOf {
            target,
            is_var,
            body,
            ..
        } => {
            if *is_var {
                if let NodeKind::Identifier { name } = &target.kind {
                    hoist_var(vm, env, name);
                }
            }
            hoist(vm, env, body);
        }
        NodeKind::Switch { cases, .. } => {
            for case in cases {
                if let NodeKind::Case { body, .. } = &case.kind {
                    for item in body {
                        hoist(vm, env, item);
                    }
                }
            }
        }
        NodeKind::With { body, .. } => hoist(vm, env, body),
        NodeKind::Try {
            block,
            catch,
            finally,
        } => {
            hoist(vm, env, block);
            if let Some((_, catch_block)) = catch {
                hoist(vm, env, catch_block);
            }
            if let Some(finally_block) = finally {
                hoist(vm, env, finally_block);
            }
        }
        NodeKind::Label { body, .. } => hoist(vm, env, body),
        _ => {}
    }
}

fn hoist_var(vm: &mut Vm, env: HeapId, name: &str) {
    let key = vm.intern(name);
    let record = vm.heap.env(env).record;
    if !vm.heap.has_own(record, key) {
        vm.env_define(env, key, Value::Undefined);
    }
}

pub(crate) fn eval_stmt(vm: &mut Vm, node: &Node) -> Exec<Flow> {
    vm.current_pos = Some(node.pos.clone());
    vm.safe_point();

    match &node.kind {
        NodeKind::Program { body } | NodeKind::Block { body } => {
            let last = LastValue::new(vm);
            for item in body {
                match eval_stmt(vm, item)? {
                    Flow::Normal(value) => last.set(vm, value),
                    other => {
                        last.take(vm);
                        return Ok(other);
                    }
                }
            }
            Ok(Flow::Normal(last.take(vm)))
        }

        NodeKind::Var { decls } => {
            let env = vm.env;
            for decl in decls {
                let value = match &decl.init {
                    Some(init) => eval_expr(vm, init)?,
                    None => Value::Undefined,
                };
                let key = vm.intern(&decl.name);
                vm.env_define(env, key, value);
            }
            Ok(Flow::Normal(Value::Undefined))
        }

        NodeKind::ExprStmt { expr } => Ok(Flow::Normal(eval_expr(vm, expr)?)),

        NodeKind::Return { expr } => {
            let value = match expr {
                Some(expr) => eval_expr(vm, expr)?,
                None => Value::Undefined,
            };
            Ok(Flow::Return(value))
        }

        NodeKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let test = eval_expr(vm, cond)?;
            if vm.to_boolean(test) {
                eval_stmt(vm, then_branch)
            } else if let Some(alt) = else_branch {
                eval_stmt(vm, alt)
            } else {
                Ok(Flow::Normal(Value::Undefined))
            }
        }

        NodeKind::While { cond, body, label } => {
            let last = LastValue::new(vm);
            loop {
                let test = eval_expr(vm, cond)?;
                if !vm.to_boolean(test) {
                    break;
                }
                let flow = eval_stmt(vm, body)?;
                last.set(vm, flow.value());
                match after_loop_body(flow, label.as_ref()) {
                    AfterBody::KeepGoing => {}
                    AfterBody::Exit => break,
                    AfterBody::Propagate(flow) => {
                        last.take(vm);
                        return Ok(flow);
                    }
                }
            }
            Ok(Flow::Normal(last.take(vm)))
        }

        NodeKind::DoWhile { body, cond, label } => {
            let last = LastValue::new(vm);
            loop {
                let flow = eval_stmt(vm, body)?;
                last.set(vm, flow.value());
                match after_loop_body(flow, label.as_ref()) {
                    AfterBody::KeepGoing => {}
                    AfterBody::Exit => break,
                    AfterBody::Propagate(flow) => {
                        last.take(vm);
                        return Ok(flow);
                    }
                }
                let test = eval_expr(vm, cond)?;
                if !vm.to_boolean(test) {
                    break;
                }
            }
            Ok(Flow::Normal(last.take(vm)))
        }

        NodeKind::For {
            init,
            test,
            update,
            body,
            label,
        } => {
            if let Some(init) = init {
                match eval_stmt(vm, init)? {
                    Flow::Normal(_) => {}
                    other => return Ok(other),
                }
            }
            let last = LastValue::new(vm);
            loop {
                if let Some(test) = test {
                    let value = eval_expr(vm, test)?;
                    if !vm.to_boolean(value) {
                        break;
                    }
                }
                let flow = eval_stmt(vm, body)?;
                last.set(vm, flow.value());
                match after_loop_body(flow, label.as_ref()) {
                    AfterBody::KeepGoing => {}
                    AfterBody::Exit => break,
                    AfterBody::Propagate(flow) => {
                        last.take(vm);
                        return Ok(flow);
                    }
                }
                if let Some(update) = update {
                    eval_expr(vm, update)?;
                }
            }
            Ok(Flow::Normal(last.take(vm)))
        }

        NodeKind::ForIn {
            target,
            is_var,
            object,
            body,
            label,
        } => eval_for_in(vm, target, *is_var, object, body, label.as_ref()),

        NodeKind::ForOf {
            target,
            is_var,
            object,
            body,
            label,
        } => eval_for_of(vm, target, *is_var, object, body, label.as_ref()),

        NodeKind::Switch { disc, cases, label } => eval_switch(vm, disc, cases, label.as_ref()),

        NodeKind::Label { name, body } => {
            let flow = eval_stmt(vm, body)?;
            match flow {
                Flow::Break(Some(ref target)) if target == name => {
                    Ok(Flow::Normal(Value::Undefined))
                }
                Flow::Continue(Some(ref target)) if target == name => {
                    // loops consume their own labeled continue; reaching the
                    // label statement means the target was not a loop
                    Err(vm.syntax_error("Illegal continue: label does not denote a loop"))
                }
                other => Ok(other),
            }
        }

        NodeKind::Break { label } => Ok(Flow::Break(label.clone())),
        NodeKind::Continue { label } => Ok(Flow::Continue(label.clone())),

        NodeKind::With { object, body } => {
            let value = eval_expr(vm, object)?;
            let augmenting = vm.to_object(value)?;
            let env = vm.heap.alloc_env(ScopeRecord::with_env(vm.env, augmenting));
            let prev = vm.env;
            vm.env = env;
            let result = eval_stmt(vm, body);
            vm.env = prev;
            result
        }

        NodeKind::Throw { expr } => {
            let value = eval_expr(vm, expr)?;
            Err(Thrown(value))
        }

        NodeKind::Try {
            block,
            catch,
            finally,
        } => eval_try(vm, block, catch.as_ref(), finally.as_ref()),

        // bound at hoist time
        NodeKind::FunctionDecl { .. } => Ok(Flow::Normal(Value::Undefined)),

        // only reachable inside a Switch, which destructures its cases
        NodeKind::Case { .. } => Ok(Flow::Normal(Value::Undefined)),

        _ => Ok(Flow::Normal(eval_expr(vm, node)?)),
    }
}

fn eval_try(
    vm: &mut Vm,
    block: &Rc<Node>,
    catch: Option<&(Name, Rc<Node>)>,
    finally: Option<&Rc<Node>>,
) -> Exec<Flow> {
    let mut outcome = eval_stmt(vm, block);

    if let Err(thrown) = &outcome {
        if let Some((param, catch_block)) = catch {
            let thrown_value = thrown.0;
            vm.roots.push(thrown_value);
            let record = vm.new_object();
            let catch_env = vm.heap.alloc_env(ScopeRecord::catch_env(vm.env, record));
            let key = vm.intern(param);
            vm.heap
                .define_prop(record, key, thrown_value, PropAttrs::NONE);
            vm.roots.pop();
            let prev = vm.env;
            vm.env = catch_env;
            outcome = eval_stmt(vm, catch_block);
            vm.env = prev;
        }
    }

    if let Some(finally_block) = finally {
        // keep the saved completion's value alive across the finally body
        let saved_value = match &outcome {
            Ok(flow) => flow.value(),
            Err(thrown) => thrown.0,
        };
        let mark = vm.roots.len();
        vm.roots.push(saved_value);
        let fin = eval_stmt(vm, finally_block);
        vm.roots.truncate(mark);
        return match fin {
            // an abrupt finally completion replaces the saved one
            Err(thrown) => Err(thrown),
            Ok(Flow::Normal(_)) => outcome,
            Ok(abrupt) => Ok(abrupt),
        };
    }
    outcome
}

fn eval_switch(
    vm: &mut Vm,
    disc: &Rc<Node>,
    cases: &[Rc<Node>],
    label: Option<&Name>,
) -> Exec<Flow> {
    let disc_value = eval_expr(vm, disc)?;
    let mark = vm.roots.len();
    vm.roots.push(disc_value);
    let result = eval_switch_inner(vm, disc_value, cases, label);
    vm.roots.truncate(mark);
    result
}

fn eval_switch_inner(
    vm: &mut Vm,
    disc_value: Value,
    cases: &[Rc<Node>],
    label: Option<&Name>,
) -> Exec<Flow> {
    let mut matched = false;
    let last = LastValue::new(vm);
    for case in cases {
        let NodeKind::Case { test, body } = &case.kind else {
            continue;
        };
        if !matched {
            match test {
                None => matched = true,
                Some(test) => {
                    let test_value = eval_expr(vm, test)?;
                    if vm.strict_equals(disc_value, test_value) {
                        matched = true;
                    }
                }
            }
        }
        if matched {
            for item in body {
                match eval_stmt(vm, item)? {
                    Flow::Normal(value) => last.set(vm, value),
                    Flow::Break(None) => return Ok(Flow::Normal(last.take(vm))),
                    Flow::Break(Some(ref target)) if label.is_some_and(|l| l == target) => {
                        return Ok(Flow::Normal(last.take(vm)));
                    }
                    other => {
                        last.take(vm);
                        return Ok(other);
                    }
                }
            }
        }
    }
    Ok(Flow::Normal(last.take(vm)))
}

fn eval_for_in(
    vm: &mut Vm,
    target: &Rc<Node>,
    is_var: bool,
    object: &Rc<Node>,
    body: &Rc<Node>,
    label: Option<&Name>,
) -> Exec<Flow> {
    let source = eval_expr(vm, object)?;
    let obj = vm.to_object(source)?;

    // snapshot: enumerable names over the whole prototype chain, shadowed
    // names deduplicated; later mutation does not affect the walk
    let mut names: Vec<HeapId> = Vec::new();
    let mut current = Some(obj);
    while let Some(id) = current {
        let own = {
            let (heap, interns) = (&mut vm.heap, &mut vm.interns);
            heap.own_enumerable_keys(interns, id)
        };
        for key in own {
            if !names.iter().any(|&seen| vm.heap.str_eq(seen, key)) {
                names.push(key);
            }
        }
        current = vm.heap.object(id).proto;
    }

    // root the snapshot: the loop body may delete the properties that keep
    // these key strings alive
    let mark = vm.roots.len();
    vm.roots.push(Value::Object(obj));
    vm.roots.extend(names.iter().map(|&name| Value::Str(name)));
    let result = (|| {
        let last = LastValue::new(vm);
        for &name in &names {
            let name_value = Value::Str(name);
            if is_var {
                if let NodeKind::Identifier { name: target_name } = &target.kind {
                    let key = vm.intern(target_name);
                    let env = vm.env;
                    vm.env_define(env, key, name_value);
                }
            } else {
                assign_target(vm, target, name_value)?;
            }
            let flow = eval_stmt(vm, body)?;
            last.set(vm, flow.value());
            match after_loop_body(flow, label) {
                AfterBody::KeepGoing => {}
                AfterBody::Exit => break,
                AfterBody::Propagate(flow) => {
                    last.take(vm);
                    return Ok(flow);
                }
            }
        }
        Ok(Flow::Normal(last.take(vm)))
    })();
    vm.roots.truncate(mark);
    result
}

fn eval_for_of(
    vm: &mut Vm,
    target: &Rc<Node>,
    is_var: bool,
    object: &Rc<Node>,
    body: &Rc<Node>,
    label: Option<&Name>,
) -> Exec<Flow> {
    let source = eval_expr(vm, object)?;

    // strings (primitive or wrapped) yield single-code-point strings
    let string_handle = match source {
        Value::Str(id) => Some(id),
        Value::Object(id) => match vm.heap.object(id).kind {
            ObjKind::String(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    };
    if let Some(handle) = string_handle {
        let mark = vm.roots.len();
        vm.roots.push(Value::Str(handle));
        let result = (|| {
            let last = LastValue::new(vm);
            let mut index = 0;
            while let Some(ch) = vm.heap.str(handle).char_at(index) {
                index += 1;
                let element = vm.str_value(ch.to_string());
                assign_loop_target(vm, target, is_var, element)?;
                let flow = eval_stmt(vm, body)?;
                last.set(vm, flow.value());
                match after_loop_body(flow, label) {
                    AfterBody::KeepGoing => {}
                    AfterBody::Exit => break,
                    AfterBody::Propagate(flow) => {
                        last.take(vm);
                        return Ok(flow);
                    }
                }
            }
            Ok(Flow::Normal(last.take(vm)))
        })();
        vm.roots.truncate(mark);
        return result;
    }

    let obj = vm.to_object(source)?;
    let mark = vm.roots.len();
    vm.roots.push(Value::Object(obj));
    let result = eval_for_of_object(vm, obj, target, is_var, body, label);
    vm.roots.truncate(mark);
    result
}

fn eval_for_of_object(
    vm: &mut Vm,
    obj: HeapId,
    target: &Rc<Node>,
    is_var: bool,
    body: &Rc<Node>,
    label: Option<&Name>,
) -> Exec<Flow> {
    // array-like: integer-indexed elements in order
    let length_key = vm.names.length;
    let is_arraylike = vm.heap.object(obj).as_array().is_some()
        || matches!(vm.heap.get_prop(obj, length_key), Some(Value::Number(_)));
    if is_arraylike {
        let length = match vm.heap.get_prop(obj, length_key) {
            Some(Value::Number(n)) if n.is_finite() && n >= 0.0 => n as u32,
            _ => 0,
        };
        let last = LastValue::new(vm);
        for index in 0..length {
            let key = {
                let (heap, interns) = (&mut vm.heap, &mut vm.interns);
                heap.index_string(interns, index)
            };
            let element = vm.heap.get_prop(obj, key).unwrap_or(Value::Undefined);
            assign_loop_target(vm, target, is_var, element)?;
            let flow = eval_stmt(vm, body)?;
            last.set(vm, flow.value());
            match after_loop_body(flow, label) {
                AfterBody::KeepGoing => {}
                AfterBody::Exit => break,
                AfterBody::Propagate(flow) => {
                    last.take(vm);
                    return Ok(flow);
                }
            }
        }
        return Ok(Flow::Normal(last.take(vm)));
    }

    // general objects: own-enumerable property values
    let names = {
        let (heap, interns) = (&mut vm.heap, &mut vm.interns);
        heap.own_enumerable_keys(interns, obj)
    };
    let mark = vm.roots.len();
    vm.roots.extend(names.iter().map(|&name| Value::Str(name)));
    let result = (|| {
        let last = LastValue::new(vm);
        for name in &names {
            let Some(element) = vm.heap.get_own(obj, *name) else {
                continue;
            };
            assign_loop_target(vm, target, is_var, element)?;
            let flow = eval_stmt(vm, body)?;
            last.set(vm, flow.value());
            match after_loop_body(flow, label) {
                AfterBody::KeepGoing => {}
                AfterBody::Exit => break,
                AfterBody::Propagate(flow) => {
                    last.take(vm);
                    return Ok(flow);
                }
            }
        }
        Ok(Flow::Normal(last.take(vm)))
    })();
    vm.roots.truncate(mark);
    result
}

fn assign_loop_target(vm: &mut Vm, target: &Rc<Node>, is_var: bool, value: Value) -> Exec<()> {
    if is_var {
        if let NodeKind::Identifier { name } = &target.kind {
            let key = vm.intern(name);
            let env = vm.env;
            vm.env_define(env, key, value);
            return Ok(());
        }
    }
    assign_target(vm, target, value)
}
