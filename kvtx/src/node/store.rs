//! In-memory key/value store for a single data node shard.
//!
//! Grounded on the teacher's `storage::memory::Memory` engine (a
//! `BTreeMap`-backed `Engine` impl), generalized to a plain `HashMap`
//! since key ordering is irrelevant to this spec (keys are "unique,
//! unordered").

use std::collections::HashMap;

/// The per-node mapping from key to current value.
#[derive(Debug, Default)]
pub struct Store {
    data: HashMap<String, String>,
}

impl Store {
    pub fn new() -> Self {
        Store { data: HashMap::new() }
    }

    /// Returns `None` if `key` has never been set or has been deleted --
    /// the "absent" sentinel (spec.md §3), never an error.
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    /// Unconditional overwrite.
    pub fn put(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }

    /// Idempotent: deleting an absent key is a no-op, not an error.
    pub fn delete(&mut self, key: &str) {
        self.data.remove(key);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_missing_key_is_absent_not_error() {
        let store = Store::new();
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut store = Store::new();
        store.put("k".to_string(), "v".to_string());
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[test]
    fn put_overwrites() {
        let mut store = Store::new();
        store.put("k".to_string(), "v1".to_string());
        store.put("k".to_string(), "v2".to_string());
        assert_eq!(store.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = Store::new();
        store.delete("missing");
        store.put("k".to_string(), "v".to_string());
        store.delete("k");
        store.delete("k");
        assert_eq!(store.get("k"), None);
        assert_eq!(store.len(), 0);
    }
}
