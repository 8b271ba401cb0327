//! Dense array element store.
//!
//! Elements live in an index-addressed vector of present/absent slots next
//! to a logical `length`. Deleting clears the slot without shrinking;
//! assigning `length` truncates. The `length` *property* on the owning
//! object is kept in sync by every indexed write through the heap helpers
//! below.

use crate::{
    heap::{value_edge, Heap, HeapId},
    intern::Interns,
    types::str::fnv1a,
    value::Value,
};

#[derive(Debug, Default)]
pub(crate) struct JsArray {
    items: Vec<Option<Value>>,
    length: u32,
}

impl JsArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn get(&self, index: u32) -> Option<Value> {
        self.items.get(index as usize).copied().flatten()
    }

    /// Stores `value` at `index`, growing the vector as needed. Returns
    /// `true` when the logical length grew.
    pub fn set(&mut self, index: u32, value: Value) -> bool {
        let slot = index as usize;
        if slot >= self.items.len() {
            // amortized doubling, but never less than the slot we need
            let target = (slot + 1).max(self.items.len() * 2);
            self.items.resize(target, None);
        }
        self.items[slot] = Some(value);
        if index >= self.length {
            self.length = index + 1;
            true
        } else {
            false
        }
    }

    /// Clears the present bit; the vector is never shrunk by deletion.
    pub fn delete(&mut self, index: u32) {
        if let Some(slot) = self.items.get_mut(index as usize) {
            *slot = None;
        }
    }

    /// `length = n`: drops every element at `index >= n`.
    pub fn truncate(&mut self, new_len: u32) {
        for slot in self.items.iter_mut().skip(new_len as usize) {
            *slot = None;
        }
        self.length = new_len;
    }

    /// Present indices in ascending order.
    pub fn present_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|_| i as u32))
    }

    pub fn trace(&self, out: &mut Vec<HeapId>) {
        for value in self.items.iter().flatten() {
            value_edge(*value, out);
        }
    }

    pub fn estimated_bytes(&self) -> usize {
        self.items.len() * std::mem::size_of::<Option<Value>>()
    }
}

/// Parses a canonical array index: decimal, no leading zeros, `<= 2^32 - 1`.
pub(crate) fn string_to_index(text: &str) -> Option<u32> {
    if text.is_empty() || text.len() > 10 {
        return None;
    }
    if text.len() > 1 && text.starts_with('0') {
        return None;
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>().ok()
}

impl Heap {
    pub(crate) fn array_index_of_key(&self, key: HeapId) -> Option<u32> {
        string_to_index(self.str(key).as_str())
    }

    /// Scans own properties by name bytes, bypassing the lookup cache.
    /// Used for bookkeeping keys (`length`) where no interned handle is at
    /// hand.
    pub(crate) fn find_own_by_str(&self, obj: HeapId, name: &str) -> Option<usize> {
        let hash = fnv1a(name.as_bytes());
        self.object(obj).props().iter().position(|prop| {
            let key = self.str(prop.key);
            key.hash() == hash && key.as_str() == name
        })
    }

    pub(crate) fn array_length(&self, obj: HeapId) -> u32 {
        self.object(obj).as_array().map_or(0, JsArray::len)
    }

    /// Indexed write with `length` property synchronization.
    pub(crate) fn array_set_index(&mut self, obj: HeapId, index: u32, value: Value) {
        let Some(arr) = self.object_mut(obj).as_array_mut() else {
            return;
        };
        arr.set(index, value);
        self.sync_length_prop(obj);
    }

    /// `length = n` truncation, also refreshing the `length` property.
    pub(crate) fn array_truncate(&mut self, obj: HeapId, new_len: u32) {
        if let Some(arr) = self.object_mut(obj).as_array_mut() {
            arr.truncate(new_len);
        }
        self.sync_length_prop(obj);
    }

    fn sync_length_prop(&mut self, obj: HeapId) {
        let len = self.array_length(obj);
        if let Some(index) = self.find_own_by_str(obj, "length") {
            self.object_mut(obj)
                .set_prop_value(index, Value::Number(f64::from(len)));
        }
    }

    /// Interned canonical string for an array index.
    pub(crate) fn index_string(&mut self, interns: &mut Interns, index: u32) -> HeapId {
        let text = index.to_string();
        interns.intern(self, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_follows_highest_index() {
        let mut arr = JsArray::new();
        assert!(arr.set(2, Value::Number(1.0)));
        assert_eq!(arr.len(), 3);
        assert!(!arr.set(0, Value::Number(2.0)));
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn delete_leaves_a_hole() {
        let mut arr = JsArray::new();
        arr.set(0, Value::Number(1.0));
        arr.set(1, Value::Number(2.0));
        arr.delete(0);
        assert!(arr.get(0).is_none());
        assert!(arr.get(1).is_some());
        assert_eq!(arr.len(), 2);
    }

    #[test]
    fn truncate_drops_trailing_elements() {
        let mut arr = JsArray::new();
        arr.set(0, Value::Number(1.0));
        arr.set(5, Value::Number(2.0));
        arr.truncate(2);
        assert_eq!(arr.len(), 2);
        assert!(arr.get(5).is_none());
        assert!(arr.get(0).is_some());
    }

    #[test]
    fn canonical_index_strings() {
        assert_eq!(string_to_index("0"), Some(0));
        assert_eq!(string_to_index("42"), Some(42));
        assert_eq!(string_to_index("4294967295"), Some(u32::MAX));
        assert_eq!(string_to_index("01"), None);
        assert_eq!(string_to_index("-1"), None);
        assert_eq!(string_to_index("1.5"), None);
        assert_eq!(string_to_index(""), None);
        assert_eq!(string_to_index("foo"), None);
    }
}
