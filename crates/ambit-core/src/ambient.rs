#![forbid(unsafe_code)]

//! Ambient data threaded from ancestors to descendants.
//!
//! [`AmbientData`] is a persistent map keyed by [`ContextId`]. A node that
//! publishes a value derives a new map from the one it received with
//! [`AmbientData::with`]; its descendants see the new entry while siblings
//! and ancestors keep seeing the old map.
//!
//! # Invariants
//!
//! 1. Lookup returns the entry added closest to the reader (shadowing).
//! 2. Deriving a map never mutates the parent map.
//! 3. Cloning is O(1); maps share their tails.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::identity::ContextId;

struct Entry {
    key: ContextId,
    value: Rc<dyn Any>,
    parent: Option<Rc<Entry>>,
}

/// Read-only key → value data visible to a subtree.
#[derive(Clone, Default)]
pub struct AmbientData {
    head: Option<Rc<Entry>>,
}

impl AmbientData {
    /// An empty map (the root of a tree).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a map where `key` resolves to `value`, shadowing any farther
    /// entry with the same key.
    #[must_use]
    pub fn with(&self, key: ContextId, value: Rc<dyn Any>) -> Self {
        Self {
            head: Some(Rc::new(Entry {
                key,
                value,
                parent: self.head.clone(),
            })),
        }
    }

    /// Typed convenience for [`with`](Self::with).
    #[must_use]
    pub fn provide<V: Any>(&self, key: ContextId, value: V) -> Self {
        self.with(key, Rc::new(value))
    }

    /// The nearest entry for `key`, untyped.
    #[must_use]
    pub fn get_raw(&self, key: ContextId) -> Option<&Rc<dyn Any>> {
        self.entries()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// The nearest entry for `key`, downcast to `V`.
    ///
    /// Returns `None` if the key is absent or the nearest entry holds a
    /// different type.
    #[must_use]
    pub fn get<V: Any>(&self, key: ContextId) -> Option<&V> {
        self.get_raw(key)?.downcast_ref::<V>()
    }

    /// True if any ancestor published `key`.
    #[must_use]
    pub fn contains(&self, key: ContextId) -> bool {
        self.get_raw(key).is_some()
    }

    /// Number of entries, shadowed ones included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries().count()
    }

    /// True if both handles point at the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        std::iter::successors(self.head.as_deref(), |&entry| entry.parent.as_deref())
    }
}

impl fmt::Debug for AmbientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries().map(|entry| entry.key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_has_nothing() {
        let map = AmbientData::new();
        assert!(!map.contains(ContextId::next()));
        assert_eq!(map.depth(), 0);
    }

    #[test]
    fn nearest_entry_wins() {
        let key = ContextId::next();
        let outer = AmbientData::new().provide(key, 12_i32);
        let inner = outer.provide(key, 120_i32);

        assert_eq!(outer.get::<i32>(key), Some(&12));
        assert_eq!(inner.get::<i32>(key), Some(&120));
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let num = ContextId::next();
        let text = ContextId::next();
        let map = AmbientData::new()
            .provide(num, 12_i32)
            .provide(text, "twelve".to_string());

        assert_eq!(map.get::<i32>(num), Some(&12));
        assert_eq!(map.get::<String>(text).map(String::as_str), Some("twelve"));
    }

    #[test]
    fn wrong_type_is_none() {
        let key = ContextId::next();
        let map = AmbientData::new().provide(key, 1_u8);
        assert!(map.contains(key));
        assert!(map.get::<String>(key).is_none());
    }

    #[test]
    fn clones_share_identity() {
        let key = ContextId::next();
        let map = AmbientData::new().provide(key, ());
        let copy = map.clone();
        assert!(map.ptr_eq(&copy));
        assert!(!map.ptr_eq(&copy.provide(key, ())));
        assert!(AmbientData::new().ptr_eq(&AmbientData::new()));
    }
}
