//! Prototype-based objects and the own-property store.
//!
//! Properties are an insertion-ordered vector of `(key, value, attrs)`
//! entries with a single-slot monomorphic lookup cache per object. Property
//! keys are interned string handles; comparison is handle-first with hash
//! and byte fallbacks (see [`Heap::str_eq`]).
//!
//! Array-indexed keys on array objects never touch the property vector:
//! they are routed to the dense element store, and the `length` property is
//! kept synchronized by every indexed write.

use std::cell::Cell;

use crate::{
    heap::{value_edge, Heap, HeapId},
    intern::Interns,
    types::{array::JsArray, function::JsFunction, regexp::JsRegExp},
    value::Value,
};

/// ES1-style property attribute bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PropAttrs(u8);

impl PropAttrs {
    pub const NONE: Self = Self(0);
    pub const READONLY: Self = Self(1);
    pub const DONTENUM: Self = Self(2);
    pub const DONTDELETE: Self = Self(4);

    /// The usual attribute set for builtin prototype methods.
    pub const HIDDEN: Self = Self(2);
    /// `length`-style bookkeeping properties.
    pub const LOCKED: Self = Self(2 | 4);

    pub fn readonly(self) -> bool {
        self.0 & Self::READONLY.0 != 0
    }

    pub fn dont_enum(self) -> bool {
        self.0 & Self::DONTENUM.0 != 0
    }

    pub fn dont_delete(self) -> bool {
        self.0 & Self::DONTDELETE.0 != 0
    }
}

impl std::ops::BitOr for PropAttrs {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug)]
pub(crate) struct Property {
    pub key: HeapId,
    pub value: Value,
    pub attrs: PropAttrs,
}

/// Kind-specific internal slot.
#[derive(Debug)]
pub(crate) enum ObjKind {
    Plain,
    Function(Box<JsFunction>),
    Boolean(bool),
    Number(f64),
    /// Wrapped string handle.
    String(HeapId),
    Array(JsArray),
    /// Milliseconds since the Unix epoch; NaN marks an invalid date.
    Date(f64),
    RegExp(Box<JsRegExp>),
    Buffer(Box<[u8]>),
    Buffer32(Box<[u32]>),
}

impl ObjKind {
    /// Class tag used by `Object.prototype.toString`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Function(_) => "Function",
            Self::Array(_) => "Array",
            Self::Date(_) => "Date",
            Self::RegExp(_) => "RegExp",
            _ => "Object",
        }
    }
}

#[derive(Debug)]
pub(crate) struct JsObject {
    pub proto: Option<HeapId>,
    props: Vec<Property>,
    /// Last successful lookup: `(key handle, index into props)`.
    cache: Cell<Option<(HeapId, u32)>>,
    pub kind: ObjKind,
}

impl JsObject {
    pub fn plain(proto: Option<HeapId>) -> Self {
        Self::with_kind(proto, ObjKind::Plain)
    }

    pub fn with_kind(proto: Option<HeapId>, kind: ObjKind) -> Self {
        Self {
            proto,
            props: Vec::new(),
            cache: Cell::new(None),
            kind,
        }
    }

    pub fn array(proto: Option<HeapId>) -> Self {
        Self::with_kind(proto, ObjKind::Array(JsArray::new()))
    }

    pub fn props(&self) -> &[Property] {
        &self.props
    }

    /// Raw value update by property index; bypasses attribute checks and is
    /// reserved for bookkeeping slots the heap itself maintains.
    pub fn set_prop_value(&mut self, index: usize, value: Value) {
        self.props[index].value = value;
    }

    pub fn as_array(&self) -> Option<&JsArray> {
        match &self.kind {
            ObjKind::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut JsArray> {
        match &mut self.kind {
            ObjKind::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&JsFunction> {
        match &self.kind {
            ObjKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, ObjKind::Function(_))
    }

    pub fn as_regexp(&self) -> Option<&JsRegExp> {
        match &self.kind {
            ObjKind::RegExp(re) => Some(re),
            _ => None,
        }
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        if let Some(proto) = self.proto {
            out.push(proto);
        }
        for prop in &self.props {
            out.push(prop.key);
            value_edge(prop.value, out);
        }
        if let Some((key, _)) = self.cache.get() {
            out.push(key);
        }
        match &self.kind {
            ObjKind::Function(func) => func.trace(out),
            ObjKind::String(inner) => out.push(*inner),
            ObjKind::Array(arr) => arr.trace(out),
            ObjKind::Plain
            | ObjKind::Boolean(_)
            | ObjKind::Number(_)
            | ObjKind::Date(_)
            | ObjKind::RegExp(_)
            | ObjKind::Buffer(_)
            | ObjKind::Buffer32(_) => {}
        }
    }

    pub fn estimated_bytes(&self) -> usize {
        let payload = match &self.kind {
            ObjKind::Array(arr) => arr.estimated_bytes(),
            ObjKind::Buffer(buf) => buf.len(),
            ObjKind::Buffer32(buf) => buf.len() * 4,
            ObjKind::Function(_) | ObjKind::RegExp(_) => 128,
            _ => 0,
        };
        std::mem::size_of::<Self>() + self.props.len() * std::mem::size_of::<Property>() + payload
    }
}

impl Heap {
    /// Index of the own property named `key`, if any. Consults and refills
    /// the object's one-entry lookup cache.
    pub(crate) fn find_own(&self, obj: HeapId, key: HeapId) -> Option<usize> {
        let object = self.object(obj);
        if let Some((cached_key, index)) = object.cache.get() {
            if cached_key == key && (index as usize) < object.props.len() {
                return Some(index as usize);
            }
        }
        let index = object
            .props
            .iter()
            .position(|prop| self.str_eq(prop.key, key))?;
        object.cache.set(Some((key, index as u32)));
        Some(index)
    }

    pub(crate) fn has_own(&self, obj: HeapId, key: HeapId) -> bool {
        if let Some(arr) = self.object(obj).as_array() {
            if let Some(index) = self.array_index_of_key(key) {
                return arr.get(index).is_some();
            }
        }
        self.find_own(obj, key).is_some()
    }

    pub(crate) fn get_own(&self, obj: HeapId, key: HeapId) -> Option<Value> {
        if let Some(arr) = self.object(obj).as_array() {
            if let Some(index) = self.array_index_of_key(key) {
                return arr.get(index);
            }
        }
        let index = self.find_own(obj, key)?;
        Some(self.object(obj).props[index].value)
    }

    /// Prototype-chain lookup.
    pub(crate) fn get_prop(&self, obj: HeapId, key: HeapId) -> Option<Value> {
        let mut current = Some(obj);
        while let Some(id) = current {
            if let Some(value) = self.get_own(id, key) {
                return Some(value);
            }
            current = self.object(id).proto;
        }
        None
    }

    /// `[[Put]]`: updates an existing writable binding, silently rejects
    /// READONLY ones (anywhere in the chain), otherwise creates an own
    /// property on the receiver. Array index keys go to the element store.
    pub(crate) fn put_prop(&mut self, obj: HeapId, key: HeapId, value: Value) {
        if self.object(obj).as_array().is_some() {
            if let Some(index) = self.array_index_of_key(key) {
                self.array_set_index(obj, index, value);
                return;
            }
        }
        if let Some(index) = self.find_own(obj, key) {
            let object = self.object_mut(obj);
            let prop = &mut object.props[index];
            if prop.attrs.readonly() {
                return;
            }
            prop.value = value;
            object.cache.set(Some((key, index as u32)));
            return;
        }
        // walk the chain for a READONLY blocker before creating an own slot
        let mut current = self.object(obj).proto;
        while let Some(id) = current {
            if let Some(index) = self.find_own(id, key) {
                if self.object(id).props[index].attrs.readonly() {
                    return;
                }
                break;
            }
            current = self.object(id).proto;
        }
        self.define_prop(obj, key, value, PropAttrs::NONE);
    }

    /// Sets an own property with explicit attributes, overwriting any
    /// existing own entry.
    pub(crate) fn define_prop(&mut self, obj: HeapId, key: HeapId, value: Value, attrs: PropAttrs) {
        if self.object(obj).as_array().is_some() {
            if let Some(index) = self.array_index_of_key(key) {
                self.array_set_index(obj, index, value);
                return;
            }
        }
        if let Some(index) = self.find_own(obj, key) {
            let object = self.object_mut(obj);
            object.props[index].value = value;
            object.props[index].attrs = attrs;
            object.cache.set(Some((key, index as u32)));
            return;
        }
        let object = self.object_mut(obj);
        let index = object.props.len();
        object.props.push(Property { key, value, attrs });
        object.cache.set(Some((key, index as u32)));
    }

    /// Returns `false` only when the property exists and is DONTDELETE.
    pub(crate) fn delete_prop(&mut self, obj: HeapId, key: HeapId) -> bool {
        if self.object(obj).as_array().is_some() {
            if let Some(index) = self.array_index_of_key(key) {
                if let Some(arr) = self.object_mut(obj).as_array_mut() {
                    arr.delete(index);
                }
                return true;
            }
        }
        let Some(index) = self.find_own(obj, key) else {
            return true;
        };
        let object = self.object_mut(obj);
        if object.props[index].attrs.dont_delete() {
            return false;
        }
        object.props.remove(index);
        object.cache.set(None);
        true
    }

    /// Own enumerable keys in insertion order; for arrays, present indices
    /// in ascending order first, then non-index keys, `length` excluded
    /// (`length` carries DONTENUM anyway).
    pub(crate) fn own_enumerable_keys(
        &mut self,
        interns: &mut Interns,
        obj: HeapId,
    ) -> Vec<HeapId> {
        let mut keys = Vec::new();
        if let Some(arr) = self.object(obj).as_array() {
            let indices: Vec<u32> = arr.present_indices().collect();
            for index in indices {
                keys.push(self.index_string(interns, index));
            }
        }
        let count = self.object(obj).props.len();
        for index in 0..count {
            let prop = &self.object(obj).props[index];
            if !prop.attrs.dont_enum() {
                keys.push(prop.key);
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interns;

    fn setup() -> (Heap, Interns, HeapId) {
        let mut heap = Heap::new();
        let interns = Interns::new();
        let obj = heap.alloc_object(JsObject::plain(None));
        (heap, interns, obj)
    }

    #[test]
    fn define_then_get_roundtrips() {
        let (mut heap, mut interns, obj) = setup();
        let key = interns.intern(&mut heap, "answer");
        heap.define_prop(obj, key, Value::Number(42.0), PropAttrs::NONE);
        assert!(matches!(heap.get_own(obj, key), Some(Value::Number(n)) if n == 42.0));
    }

    #[test]
    fn readonly_rejects_put_silently() {
        let (mut heap, mut interns, obj) = setup();
        let key = interns.intern(&mut heap, "pi");
        heap.define_prop(obj, key, Value::Number(3.14), PropAttrs::READONLY);
        heap.put_prop(obj, key, Value::Number(0.0));
        assert!(matches!(heap.get_own(obj, key), Some(Value::Number(n)) if n == 3.14));
    }

    #[test]
    fn readonly_on_the_prototype_blocks_put() {
        let mut heap = Heap::new();
        let mut interns = Interns::new();
        let proto = heap.alloc_object(JsObject::plain(None));
        let obj = heap.alloc_object(JsObject::plain(Some(proto)));
        let key = interns.intern(&mut heap, "fixed");
        heap.define_prop(proto, key, Value::Number(1.0), PropAttrs::READONLY);
        heap.put_prop(obj, key, Value::Number(2.0));
        assert!(heap.get_own(obj, key).is_none());
    }

    #[test]
    fn dontdelete_survives_delete() {
        let (mut heap, mut interns, obj) = setup();
        let key = interns.intern(&mut heap, "pinned");
        heap.define_prop(obj, key, Value::Bool(true), PropAttrs::DONTDELETE);
        assert!(!heap.delete_prop(obj, key));
        assert!(heap.get_own(obj, key).is_some());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let (mut heap, mut interns, obj) = setup();
        let first = interns.intern(&mut heap, "first");
        let second = interns.intern(&mut heap, "second");
        let hidden = interns.intern(&mut heap, "hidden");
        heap.define_prop(obj, first, Value::Number(1.0), PropAttrs::NONE);
        heap.define_prop(obj, hidden, Value::Number(0.0), PropAttrs::DONTENUM);
        heap.define_prop(obj, second, Value::Number(2.0), PropAttrs::NONE);
        let keys = heap.own_enumerable_keys(&mut interns, obj);
        let names: Vec<&str> = keys.iter().map(|&k| heap.str(k).as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn lookup_cache_tracks_mutation() {
        let (mut heap, mut interns, obj) = setup();
        let a = interns.intern(&mut heap, "a");
        let b = interns.intern(&mut heap, "b");
        heap.define_prop(obj, a, Value::Number(1.0), PropAttrs::NONE);
        heap.define_prop(obj, b, Value::Number(2.0), PropAttrs::NONE);
        // prime the cache on `a`, then delete it; `b` must still resolve
        assert!(heap.get_own(obj, a).is_some());
        assert!(heap.delete_prop(obj, a));
        assert!(matches!(heap.get_own(obj, b), Some(Value::Number(n)) if n == 2.0));
        assert!(heap.get_own(obj, a).is_none());
    }
}
