//! Expression evaluation: operators, member access, calls, construction,
//! assignment variants, and the temporary-rooting discipline around every
//! sub-evaluation that can reach a safe point.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::{AssignOp, BinaryOp, Literal, MemberKey, Node, NodeKind, UnaryOp, UpdateOp},
    convert::{CompareResult, Hint},
    eval::{
        call::{call_function, new_script_function},
        stmt::{eval_stmt, hoist},
        Flow,
    },
    exception::Exec,
    heap::HeapId,
    object::{JsObject, ObjKind, PropAttrs},
    parser,
    scope::ScopeRecord,
    types::buffer::clamp_byte,
    value::Value,
    vm::Vm,
};

pub(crate) fn eval_expr(vm: &mut Vm, node: &Node) -> Exec<Value> {
    match &node.kind {
        NodeKind::Literal { value } => Ok(eval_literal(vm, value)),

        NodeKind::Identifier { name } => {
            let key = vm.intern(name);
            match vm.env_get(vm.env, key) {
                Some(value) => Ok(value),
                None => Err(vm.reference_error(&format!("{name} is not defined"))),
            }
        }

        NodeKind::This => {
            let key = vm.names.this_;
            Ok(vm
                .env_get(vm.env, key)
                .unwrap_or(Value::Object(vm.global)))
        }

        NodeKind::FunctionExpr { func } => {
            if let Some(name) = &func.name {
                // the name is visible inside the body but not outside
                let record = vm.new_object();
                let scope = vm
                    .heap
                    .alloc_env(ScopeRecord::object_env(Some(vm.env), record));
                let fn_obj = new_script_function(vm, func, scope);
                let key = vm.intern(name);
                vm.heap.define_prop(
                    record,
                    key,
                    Value::Object(fn_obj),
                    PropAttrs::READONLY | PropAttrs::DONTDELETE,
                );
                Ok(Value::Object(fn_obj))
            } else {
                let env = vm.env;
                Ok(Value::Object(new_script_function(vm, func, env)))
            }
        }

        NodeKind::ArrayLiteral { items } => {
            let arr = vm.new_array();
            let mark = vm.roots.len();
            vm.roots.push(Value::Object(arr));
            let result = (|| {
                for (index, item) in items.iter().enumerate() {
                    // holes contribute to length but create no element
                    if let Some(item) = item {
                        let value = eval_expr(vm, item)?;
                        vm.heap.array_set_index(arr, index as u32, value);
                    }
                }
                vm.heap.array_truncate(arr, items.len() as u32);
                Ok(Value::Object(arr))
            })();
            vm.roots.truncate(mark);
            result
        }

        NodeKind::ObjectLiteral { props } => {
            let obj = vm.new_object();
            let mark = vm.roots.len();
            vm.roots.push(Value::Object(obj));
            let result = (|| {
                for (name, value_node) in props {
                    let value = eval_expr(vm, value_node)?;
                    let key = vm.intern(name);
                    vm.heap.define_prop(obj, key, value, PropAttrs::NONE);
                }
                Ok(Value::Object(obj))
            })();
            vm.roots.truncate(mark);
            result
        }

        NodeKind::Member { object, key } => {
            let obj_value = eval_expr(vm, object)?;
            let mark = vm.roots.len();
            vm.roots.push(obj_value);
            let result = (|| {
                let prop = member_key(vm, key)?;
                let obj = vm.to_object(obj_value)?;
                member_read(vm, obj, prop)
            })();
            vm.roots.truncate(mark);
            result
        }

        NodeKind::Assign { op, target, value } => {
            let rhs = eval_expr(vm, value)?;
            let mark = vm.roots.len();
            vm.roots.push(rhs);
            let result = eval_assign(vm, *op, target, rhs);
            vm.roots.truncate(mark);
            result
        }

        NodeKind::Binary { op, left, right } => eval_binary(vm, *op, left, right),

        NodeKind::Unary { op, expr } => eval_unary(vm, *op, expr),

        NodeKind::Update { op, prefix, expr } => eval_update(vm, *op, *prefix, expr),

        NodeKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            let test = eval_expr(vm, cond)?;
            if vm.to_boolean(test) {
                eval_expr(vm, then_expr)
            } else {
                eval_expr(vm, else_expr)
            }
        }

        NodeKind::Call { callee, args } => {
            let mark = vm.roots.len();
            let result = eval_call(vm, callee, args);
            vm.roots.truncate(mark);
            result
        }

        NodeKind::New { callee, args } => {
            let mark = vm.roots.len();
            let result = eval_new(vm, callee, args);
            vm.roots.truncate(mark);
            result
        }

        _ => {
            let flow = eval_stmt(vm, node)?;
            Ok(flow.value())
        }
    }
}

fn eval_literal(vm: &mut Vm, literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) => {
            if s.len() <= 64 {
                Value::Str(vm.intern(s))
            } else {
                vm.str_value(&**s)
            }
        }
    }
}

// ----------------------------------------------------------------------
// Member access
// ----------------------------------------------------------------------

/// Resolves a member key to an interned string handle; computed keys are
/// evaluated and coerced here.
pub(crate) fn member_key(vm: &mut Vm, key: &MemberKey) -> Exec<HeapId> {
    match key {
        MemberKey::Name(name) => Ok(vm.intern(name)),
        MemberKey::Computed(expr) => {
            let value = eval_expr(vm, expr)?;
            let text = vm.to_display_string(value)?;
            Ok(vm.intern(&text))
        }
    }
}

/// Property read with the specialized-kind interceptions: buffer bytes and
/// words (out of range raises `RangeError`), string-wrapper `length` and
/// glyph indexing.
pub(crate) fn member_read(vm: &mut Vm, obj: HeapId, key: HeapId) -> Exec<Value> {
    enum Special {
        Plain,
        OutOfRange,
        Number(f64),
        Char(Option<char>),
    }
    let index = vm.heap.array_index_of_key(key);
    let special = {
        let object = vm.heap.object(obj);
        match (&object.kind, index) {
            (ObjKind::Buffer(data), Some(i)) => data
                .get(i as usize)
                .map_or(Special::OutOfRange, |&b| Special::Number(f64::from(b))),
            (ObjKind::Buffer32(data), Some(i)) => data
                .get(i as usize)
                .map_or(Special::OutOfRange, |&w| Special::Number(f64::from(w))),
            (ObjKind::String(inner), Some(i)) => {
                Special::Char(vm.heap.str(*inner).char_at(i as usize))
            }
            (ObjKind::String(inner), None) if vm.heap.str_eq(key, vm.names.length) => {
                Special::Number(vm.heap.str(*inner).len() as f64)
            }
            _ => Special::Plain,
        }
    };
    match special {
        Special::Number(n) => Ok(Value::Number(n)),
        Special::OutOfRange => Err(vm.range_error("Index out of range")),
        Special::Char(Some(ch)) => Ok(vm.str_value(ch.to_string())),
        Special::Char(None) => Ok(Value::Undefined),
        Special::Plain => Ok(vm.heap.get_prop(obj, key).unwrap_or(Value::Undefined)),
    }
}

/// Property write with buffer clamping, array `length` truncation (and its
/// `RangeError` policy), and `arguments` aliasing.
pub(crate) fn member_write(vm: &mut Vm, obj: HeapId, key: HeapId, value: Value) -> Exec<()> {
    enum Special {
        Plain,
        Buffer(usize),
        Buffer32(usize),
        ArrayLength,
    }
    let index = vm.heap.array_index_of_key(key);
    let special = {
        let object = vm.heap.object(obj);
        match &object.kind {
            ObjKind::Buffer(data) if index.is_some() => Special::Buffer(data.len()),
            ObjKind::Buffer32(data) if index.is_some() => Special::Buffer32(data.len()),
            ObjKind::Array(_) if vm.heap.str_eq(key, vm.names.length) => Special::ArrayLength,
            _ => Special::Plain,
        }
    };
    match special {
        Special::Buffer(len) => {
            let slot = index.expect("guarded above") as usize;
            if slot >= len {
                return Err(vm.range_error("Index out of range"));
            }
            let n = vm.to_number(value)?;
            if let ObjKind::Buffer(data) = &mut vm.heap.object_mut(obj).kind {
                data[slot] = clamp_byte(n);
            }
            Ok(())
        }
        Special::Buffer32(len) => {
            let slot = index.expect("guarded above") as usize;
            if slot >= len {
                return Err(vm.range_error("Index out of range"));
            }
            let word = vm.to_uint32(value)?;
            if let ObjKind::Buffer32(data) = &mut vm.heap.object_mut(obj).kind {
                data[slot] = word;
            }
            Ok(())
        }
        Special::ArrayLength => {
            let n = vm.to_number(value)?;
            if !(n.is_finite() && n >= 0.0 && n.trunc() == n && n <= f64::from(u32::MAX)) {
                return Err(vm.range_error("Invalid array length"));
            }
            vm.heap.array_truncate(obj, n as u32);
            Ok(())
        }
        Special::Plain => {
            vm.heap.put_prop(obj, key, value);
            let env = vm.env;
            vm.sync_arguments_write(env, obj, key, value);
            Ok(())
        }
    }
}

/// Assignment to an identifier or member target.
pub(crate) fn assign_target(vm: &mut Vm, target: &Node, value: Value) -> Exec<()> {
    match &target.kind {
        NodeKind::Identifier { name } => {
            let key = vm.intern(name);
            let env = vm.env;
            vm.env_set(env, key, value);
            Ok(())
        }
        NodeKind::Member { object, key } => {
            let mark = vm.roots.len();
            vm.roots.push(value);
            let result = (|| {
                let obj_value = eval_expr(vm, object)?;
                vm.roots.push(obj_value);
                let prop = member_key(vm, key)?;
                let obj = vm.to_object(obj_value)?;
                member_write(vm, obj, prop, value)
            })();
            vm.roots.truncate(mark);
            result
        }
        _ => Err(vm.type_error("Invalid assignment target")),
    }
}

/// Reads the current value of an assignment/update target.
fn read_target(vm: &mut Vm, target: &Node) -> Exec<Value> {
    match &target.kind {
        NodeKind::Identifier { name } => {
            let key = vm.intern(name);
            Ok(vm.env_get(vm.env, key).unwrap_or(Value::Undefined))
        }
        NodeKind::Member { object, key } => {
            let obj_value = eval_expr(vm, object)?;
            let mark = vm.roots.len();
            vm.roots.push(obj_value);
            let result = (|| {
                let prop = member_key(vm, key)?;
                let obj = vm.to_object(obj_value)?;
                member_read(vm, obj, prop)
            })();
            vm.roots.truncate(mark);
            result
        }
        _ => Ok(Value::Undefined),
    }
}

// ----------------------------------------------------------------------
// Assignment
// ----------------------------------------------------------------------

fn eval_assign(vm: &mut Vm, op: AssignOp, target: &Node, rhs: Value) -> Exec<Value> {
    let new_value = if op == AssignOp::Assign {
        rhs
    } else {
        let current = read_target(vm, target)?;
        let mark = vm.roots.len();
        vm.roots.push(current);
        let combined = numeric_binary(vm, compound_binary_op(op), current, rhs);
        vm.roots.truncate(mark);
        combined?
    };
    let mark = vm.roots.len();
    vm.roots.push(new_value);
    let written = assign_target(vm, target, new_value);
    vm.roots.truncate(mark);
    written?;
    Ok(new_value)
}

fn compound_binary_op(op: AssignOp) -> BinaryOp {
    match op {
        AssignOp::Add => BinaryOp::Add,
        AssignOp::Sub => BinaryOp::Sub,
        AssignOp::Mul => BinaryOp::Mul,
        AssignOp::Div => BinaryOp::Div,
        AssignOp::Rem => BinaryOp::Rem,
        AssignOp::BitAnd => BinaryOp::BitAnd,
        AssignOp::BitOr => BinaryOp::BitOr,
        AssignOp::BitXor => BinaryOp::BitXor,
        AssignOp::Shl => BinaryOp::Shl,
        AssignOp::Shr => BinaryOp::Shr,
        AssignOp::UShr => BinaryOp::UShr,
        AssignOp::Assign => unreachable!("plain assignment has no operator"),
    }
}

// ----------------------------------------------------------------------
// Operators
// ----------------------------------------------------------------------

fn eval_binary(vm: &mut Vm, op: BinaryOp, left: &Rc<Node>, right: &Rc<Node>) -> Exec<Value> {
    match op {
        BinaryOp::LogicalAnd => {
            let l = eval_expr(vm, left)?;
            if !vm.to_boolean(l) {
                return Ok(l);
            }
            eval_expr(vm, right)
        }
        BinaryOp::LogicalOr => {
            let l = eval_expr(vm, left)?;
            if vm.to_boolean(l) {
                return Ok(l);
            }
            eval_expr(vm, right)
        }
        BinaryOp::Comma => {
            eval_expr(vm, left)?;
            eval_expr(vm, right)
        }
        _ => {
            let l = eval_expr(vm, left)?;
            let mark = vm.roots.len();
            vm.roots.push(l);
            let r = eval_expr(vm, right);
            let result = match r {
                Ok(r) => {
                    vm.roots.push(r);
                    apply_binary(vm, op, l, r)
                }
                Err(thrown) => Err(thrown),
            };
            vm.roots.truncate(mark);
            result
        }
    }
}

fn apply_binary(vm: &mut Vm, op: BinaryOp, l: Value, r: Value) -> Exec<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(vm.abstract_equals(l, r)?)),
        BinaryOp::NotEq => Ok(Value::Bool(!vm.abstract_equals(l, r)?)),
        BinaryOp::StrictEq => Ok(Value::Bool(vm.strict_equals(l, r))),
        BinaryOp::StrictNotEq => Ok(Value::Bool(!vm.strict_equals(l, r))),
        BinaryOp::Lt => Ok(Value::Bool(matches!(
            vm.compare_values(l, r)?,
            CompareResult::Less
        ))),
        BinaryOp::Gt => Ok(Value::Bool(matches!(
            vm.compare_values(l, r)?,
            CompareResult::Greater
        ))),
        BinaryOp::LtEq => Ok(Value::Bool(matches!(
            vm.compare_values(l, r)?,
            CompareResult::Less | CompareResult::Equal
        ))),
        BinaryOp::GtEq => Ok(Value::Bool(matches!(
            vm.compare_values(l, r)?,
            CompareResult::Greater | CompareResult::Equal
        ))),
        BinaryOp::InstanceOf => eval_instanceof(vm, l, r),
        BinaryOp::In => eval_in(vm, l, r),
        _ => numeric_binary(vm, op, l, r),
    }
}

/// `+ - * / %`, bitwise, and shifts; shared with compound assignment.
fn numeric_binary(vm: &mut Vm, op: BinaryOp, l: Value, r: Value) -> Exec<Value> {
    match op {
        BinaryOp::Add => {
            let lprim = vm.to_primitive(l, Hint::Default)?;
            let mark = vm.roots.len();
            vm.roots.push(lprim);
            let rprim = vm.to_primitive(r, Hint::Default);
            vm.roots.truncate(mark);
            let rprim = rprim?;
            if matches!(lprim, Value::Str(_)) || matches!(rprim, Value::Str(_)) {
                let mut text = vm.to_display_string(lprim)?;
                text.push_str(&vm.to_display_string(rprim)?);
                Ok(vm.str_value(text))
            } else {
                let ln = vm.to_number(lprim)?;
                let rn = vm.to_number(rprim)?;
                Ok(Value::Number(ln + rn))
            }
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let ln = vm.to_number(l)?;
            let rn = vm.to_number(r)?;
            Ok(Value::Number(match op {
                BinaryOp::Sub => ln - rn,
                BinaryOp::Mul => ln * rn,
                BinaryOp::Div => ln / rn,
                _ => ln % rn,
            }))
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let ln = vm.to_int32(l)?;
            let rn = vm.to_int32(r)?;
            Ok(Value::Number(f64::from(match op {
                BinaryOp::BitAnd => ln & rn,
                BinaryOp::BitOr => ln | rn,
                _ => ln ^ rn,
            })))
        }
        BinaryOp::Shl => {
            let ln = vm.to_int32(l)?;
            let count = vm.to_uint32(r)? & 31;
            Ok(Value::Number(f64::from(ln.wrapping_shl(count))))
        }
        BinaryOp::Shr => {
            let ln = vm.to_int32(l)?;
            let count = vm.to_uint32(r)? & 31;
            Ok(Value::Number(f64::from(ln.wrapping_shr(count))))
        }
        BinaryOp::UShr => {
            let ln = vm.to_uint32(l)?;
            let count = vm.to_uint32(r)? & 31;
            Ok(Value::Number(f64::from(ln.wrapping_shr(count))))
        }
        other => unreachable!("non-numeric operator {other:?} routed here"),
    }
}

fn eval_instanceof(vm: &mut Vm, l: Value, r: Value) -> Exec<Value> {
    let Value::Object(ctor) = r else {
        return Err(vm.type_error("Right-hand side of 'instanceof' is not callable"));
    };
    if !vm.heap.object(ctor).is_function() {
        return Err(vm.type_error("Right-hand side of 'instanceof' is not callable"));
    }
    let proto_key = vm.names.prototype;
    let Some(Value::Object(proto)) = vm.heap.get_prop(ctor, proto_key) else {
        return Err(vm.type_error("Function has non-object prototype in 'instanceof'"));
    };
    let Value::Object(mut current) = l else {
        return Ok(Value::Bool(false));
    };
    loop {
        match vm.heap.object(current).proto {
            Some(parent) if parent == proto => return Ok(Value::Bool(true)),
            Some(parent) => current = parent,
            None => return Ok(Value::Bool(false)),
        }
    }
}

fn eval_in(vm: &mut Vm, l: Value, r: Value) -> Exec<Value> {
    let Value::Object(obj) = r else {
        return Err(vm.type_error("Cannot use 'in' operator on a non-object"));
    };
    let text = vm.to_display_string(l)?;
    let key = vm.intern(&text);
    let mut current = Some(obj);
    while let Some(id) = current {
        if vm.heap.has_own(id, key) {
            return Ok(Value::Bool(true));
        }
        current = vm.heap.object(id).proto;
    }
    Ok(Value::Bool(false))
}

fn eval_unary(vm: &mut Vm, op: UnaryOp, expr: &Rc<Node>) -> Exec<Value> {
    // `typeof unbound` must not raise ReferenceError
    if op == UnaryOp::TypeOf {
        if let NodeKind::Identifier { name } = &expr.kind {
            let key = vm.intern(name);
            let Some(value) = vm.env_get(vm.env, key) else {
                return Ok(vm.str_value("undefined"));
            };
            let text = vm.typeof_str(value);
            return Ok(vm.str_value(text));
        }
    }
    if op == UnaryOp::Delete {
        if let NodeKind::Member { object, key } = &expr.kind {
            let obj_value = eval_expr(vm, object)?;
            let mark = vm.roots.len();
            vm.roots.push(obj_value);
            let result = (|| {
                let prop = member_key(vm, key)?;
                let obj = vm.to_object(obj_value)?;
                Ok(Value::Bool(vm.heap.delete_prop(obj, prop)))
            })();
            vm.roots.truncate(mark);
            return result;
        }
        eval_expr(vm, expr)?;
        return Ok(Value::Bool(true));
    }

    let value = eval_expr(vm, expr)?;
    match op {
        UnaryOp::Not => Ok(Value::Bool(!vm.to_boolean(value))),
        UnaryOp::BitNot => {
            let n = vm.to_int32(value)?;
            Ok(Value::Number(f64::from(!n)))
        }
        UnaryOp::Plus => Ok(Value::Number(vm.to_number(value)?)),
        UnaryOp::Minus => Ok(Value::Number(-vm.to_number(value)?)),
        UnaryOp::TypeOf => {
            let text = vm.typeof_str(value);
            Ok(vm.str_value(text))
        }
        UnaryOp::Void => Ok(Value::Undefined),
        UnaryOp::Delete => unreachable!("handled above"),
    }
}

fn eval_update(vm: &mut Vm, op: UpdateOp, prefix: bool, target: &Rc<Node>) -> Exec<Value> {
    let current = read_target(vm, target)?;
    let mark = vm.roots.len();
    vm.roots.push(current);
    let num = vm.to_number(current);
    vm.roots.truncate(mark);
    let num = num?;
    let new_num = match op {
        UpdateOp::Increment => num + 1.0,
        UpdateOp::Decrement => num - 1.0,
    };
    let new_value = Value::Number(new_num);
    assign_target(vm, target, new_value)?;
    Ok(if prefix {
        new_value
    } else {
        Value::Number(num)
    })
}

// ----------------------------------------------------------------------
// Calls and construction
// ----------------------------------------------------------------------

fn eval_args(vm: &mut Vm, nodes: &[Rc<Node>]) -> Exec<SmallVec<[Value; 8]>> {
    let mut out = SmallVec::new();
    for node in nodes {
        let value = eval_expr(vm, node)?;
        // keep each evaluated argument rooted while the rest evaluate;
        // the caller truncates after the call returns
        vm.roots.push(value);
        out.push(value);
    }
    Ok(out)
}

fn eval_call(vm: &mut Vm, callee: &Rc<Node>, args: &[Rc<Node>]) -> Exec<Value> {
    // direct `eval` runs in the caller's environment
    if let NodeKind::Identifier { name } = &callee.kind {
        if &**name == "eval" {
            let argv = eval_args(vm, args)?;
            let Some(&first) = argv.first() else {
                return Ok(Value::Undefined);
            };
            let Value::Str(source) = first else {
                return Ok(first);
            };
            let text = vm.heap.str(source).as_str().to_owned();
            return eval_source(vm, &text);
        }
    }

    let (callee_value, this) = if let NodeKind::Member { object, key } = &callee.kind {
        let obj_value = eval_expr(vm, object)?;
        vm.roots.push(obj_value);
        let prop = member_key(vm, key)?;
        let obj = vm.to_object(obj_value)?;
        let callee_value = vm.heap.get_prop(obj, prop).unwrap_or(Value::Undefined);
        (callee_value, Value::Object(obj))
    } else {
        let callee_value = eval_expr(vm, callee)?;
        (callee_value, Value::Object(vm.global))
    };
    vm.roots.push(callee_value);
    vm.roots.push(this);

    let Value::Object(fn_id) = callee_value else {
        return Err(vm.type_error("Call of non-object"));
    };
    if !vm.heap.object(fn_id).is_function() {
        return Err(vm.type_error("Not a callable object"));
    }
    let argv = eval_args(vm, args)?;
    call_function(vm, fn_id, this, &argv)
}

fn eval_new(vm: &mut Vm, callee: &Rc<Node>, args: &[Rc<Node>]) -> Exec<Value> {
    let callee_value = eval_expr(vm, callee)?;
    vm.roots.push(callee_value);

    let Value::Object(ctor) = callee_value else {
        return Err(vm.type_error("Constructor is not an object"));
    };
    if !vm.heap.object(ctor).is_function() {
        return Err(vm.type_error("Constructor is not callable"));
    }

    // bound constructors: construct the target with preset args prepended,
    // ignoring the bound receiver
    let mut preset: Vec<Value> = Vec::new();
    let mut target = ctor;
    loop {
        let object = vm.heap.object(target);
        let Some(func) = object.as_function() else {
            break;
        };
        match &func.kind {
            crate::types::function::FnKind::Bound {
                target: inner,
                args,
                ..
            } => {
                preset.splice(0..0, args.iter().copied());
                target = *inner;
            }
            _ => break,
        }
    }

    let proto_key = vm.names.prototype;
    let proto = match vm.heap.get_prop(target, proto_key) {
        Some(Value::Object(p)) => p,
        _ => vm.protos.object,
    };
    let instance = vm.heap.alloc_object(JsObject::plain(Some(proto)));
    vm.roots.push(Value::Object(instance));
    for &value in &preset {
        vm.roots.push(value);
    }

    let mut argv = eval_args(vm, args)?;
    argv.insert_many(0, preset.iter().copied());

    let prev_constructing = vm.constructing;
    vm.constructing = true;
    let result = call_function(vm, target, Value::Object(instance), &argv);
    vm.constructing = prev_constructing;

    match result? {
        value @ Value::Object(_) => Ok(value),
        _ => Ok(Value::Object(instance)),
    }
}

/// Direct `eval`: parses the source as a fresh program and executes it in
/// the caller's environment. Parse failure raises `SyntaxError`.
pub(crate) fn eval_source(vm: &mut Vm, source: &str) -> Exec<Value> {
    let path = vm
        .current_pos
        .as_ref()
        .map_or_else(|| "<eval>".to_owned(), |pos| pos.path.to_string());
    let program = match parser::parse_eval(source, &path) {
        Ok(program) => program,
        Err(err) => return Err(vm.syntax_error(&err.to_string())),
    };
    let NodeKind::Program { body } = &program.kind else {
        return Ok(Value::Undefined);
    };
    let env = vm.env;
    for node in body {
        hoist(vm, env, node);
    }
    // root the running result across statement safe points
    let mark = vm.roots.len();
    vm.roots.push(Value::Undefined);
    let mut outcome: Exec<()> = Ok(());
    for node in body {
        match eval_stmt(vm, node) {
            Ok(Flow::Normal(value)) => vm.roots[mark] = value,
            Ok(Flow::Return(value)) => {
                vm.roots[mark] = value;
                break;
            }
            Ok(Flow::Break(_) | Flow::Continue(_)) => break,
            Err(thrown) => {
                outcome = Err(thrown);
                break;
            }
        }
    }
    let last = vm.roots[mark];
    vm.roots.truncate(mark);
    outcome.map(|()| last)
}
