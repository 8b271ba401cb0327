//! Lexical environment records and name resolution.
//!
//! A scope is an object record (bindings are properties) plus a link to the
//! outer environment. The record's lookup rules depend on the environment
//! kind: `With` environments search the augmenting object's full prototype
//! chain, everything else looks at own properties only. Call environments
//! additionally carry fast slots for parameters, the callee, and the
//! `arguments` array, with two-way aliasing between parameter slots and
//! `arguments` indices.

use crate::{
    heap::{value_edge, HeapId},
    object::PropAttrs,
    value::Value,
    vm::Vm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnvKind {
    /// Plain object record (the global scope, hoist targets).
    Object,
    /// Call environment with fast slots.
    Function,
    /// `with (obj)` augmentation: lookups traverse obj's prototype chain.
    With,
    /// Catch-parameter binding scope.
    Catch,
}

#[derive(Debug)]
pub(crate) struct ScopeRecord {
    pub kind: EnvKind,
    pub outer: Option<HeapId>,
    /// Binding store; for `With` this is the augmenting object itself.
    pub record: HeapId,
    /// Parameter names, positionally matching `fast`.
    pub fast_names: Vec<HeapId>,
    pub fast: Vec<Value>,
    pub callee: Option<HeapId>,
    pub arguments: Option<HeapId>,
}

impl ScopeRecord {
    pub fn object_env(outer: Option<HeapId>, record: HeapId) -> Self {
        Self {
            kind: EnvKind::Object,
            outer,
            record,
            fast_names: Vec::new(),
            fast: Vec::new(),
            callee: None,
            arguments: None,
        }
    }

    pub fn with_env(outer: HeapId, object: HeapId) -> Self {
        Self {
            kind: EnvKind::With,
            outer: Some(outer),
            record: object,
            fast_names: Vec::new(),
            fast: Vec::new(),
            callee: None,
            arguments: None,
        }
    }

    pub fn catch_env(outer: HeapId, record: HeapId) -> Self {
        Self {
            kind: EnvKind::Catch,
            outer: Some(outer),
            record,
            fast_names: Vec::new(),
            fast: Vec::new(),
            callee: None,
            arguments: None,
        }
    }

    pub fn call_env(outer: HeapId, record: HeapId, callee: HeapId) -> Self {
        Self {
            kind: EnvKind::Function,
            outer: Some(outer),
            record,
            fast_names: Vec::new(),
            fast: Vec::new(),
            callee: Some(callee),
            arguments: None,
        }
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        if let Some(outer) = self.outer {
            out.push(outer);
        }
        out.push(self.record);
        out.extend(self.fast_names.iter().copied());
        for &value in &self.fast {
            value_edge(value, out);
        }
        if let Some(callee) = self.callee {
            out.push(callee);
        }
        if let Some(arguments) = self.arguments {
            out.push(arguments);
        }
    }

    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.fast.len() * std::mem::size_of::<Value>() * 2
    }
}

impl Vm {
    fn fast_slot(&self, env: HeapId, name: HeapId) -> Option<usize> {
        let record = self.heap.env(env);
        record
            .fast_names
            .iter()
            .position(|&fast| self.heap.str_eq(fast, name))
    }

    /// Walks the chain resolving `name`. Returns `None` for unbound names;
    /// the caller decides between `ReferenceError` and `typeof` leniency.
    pub(crate) fn env_get(&self, env: HeapId, name: HeapId) -> Option<Value> {
        let mut current = Some(env);
        while let Some(id) = current {
            let record = self.heap.env(id);
            match record.kind {
                EnvKind::With => {
                    if let Some(value) = self.heap.get_prop(record.record, name) {
                        return Some(value);
                    }
                }
                EnvKind::Function => {
                    if let Some(slot) = self.fast_slot(id, name) {
                        return Some(self.heap.env(id).fast[slot]);
                    }
                    if let Some(value) = self.heap.get_own(record.record, name) {
                        return Some(value);
                    }
                }
                EnvKind::Object | EnvKind::Catch => {
                    if let Some(value) = self.heap.get_own(record.record, name) {
                        return Some(value);
                    }
                }
            }
            current = self.heap.env(id).outer;
        }
        None
    }

    /// Assignment resolution: updates an existing binding in place, or —
    /// matching the language's undeclared-assignment rule — creates the
    /// binding on the global object.
    pub(crate) fn env_set(&mut self, env: HeapId, name: HeapId, value: Value) {
        let mut current = Some(env);
        while let Some(id) = current {
            let record = self.heap.env(id);
            let kind = record.kind;
            let store = record.record;
            match kind {
                EnvKind::With => {
                    if self.heap.get_prop(store, name).is_some() {
                        self.heap.put_prop(store, name, value);
                        return;
                    }
                }
                EnvKind::Function => {
                    if let Some(slot) = self.fast_slot(id, name) {
                        self.heap.env_mut(id).fast[slot] = value;
                        self.heap.put_prop(store, name, value);
                        self.mirror_param_to_arguments(id, slot, value);
                        return;
                    }
                    if self.heap.has_own(store, name) {
                        self.heap.put_prop(store, name, value);
                        return;
                    }
                }
                EnvKind::Object | EnvKind::Catch => {
                    if self.heap.has_own(store, name) {
                        self.heap.put_prop(store, name, value);
                        return;
                    }
                }
            }
            current = self.heap.env(id).outer;
        }
        let global = self.global;
        self.heap.put_prop(global, name, value);
    }

    /// Creates or overwrites a binding on the innermost record.
    pub(crate) fn env_define(&mut self, env: HeapId, name: HeapId, value: Value) {
        let record = self.heap.env(env);
        let store = record.record;
        if record.kind == EnvKind::Function {
            if let Some(slot) = self.fast_slot(env, name) {
                self.heap.env_mut(env).fast[slot] = value;
                self.heap.put_prop(store, name, value);
                self.mirror_param_to_arguments(env, slot, value);
                return;
            }
        }
        self.heap.define_prop(store, name, value, PropAttrs::NONE);
    }

    fn mirror_param_to_arguments(&mut self, env: HeapId, slot: usize, value: Value) {
        if let Some(arguments) = self.heap.env(env).arguments {
            self.heap.array_set_index(arguments, slot as u32, value);
        }
    }

    /// Called after a member write: when `target` is some call frame's
    /// `arguments` array and the key is a declared-parameter index, mirror
    /// the write into the fast slot and named binding.
    pub(crate) fn sync_arguments_write(&mut self, env: HeapId, target: HeapId, key: HeapId, value: Value) {
        let Some(index) = self.heap.array_index_of_key(key) else {
            return;
        };
        let mut current = Some(env);
        while let Some(id) = current {
            let record = self.heap.env(id);
            if record.arguments == Some(target) {
                let slot = index as usize;
                if slot < record.fast_names.len() {
                    let name = record.fast_names[slot];
                    let store = record.record;
                    self.heap.env_mut(id).fast[slot] = value;
                    self.heap.put_prop(store, name, value);
                }
                return;
            }
            current = record.outer;
        }
    }
}
