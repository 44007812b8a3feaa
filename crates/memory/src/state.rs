//! The keyspace behind the mutex
//!
//! `State` holds the tagged entries and implements every operation on
//! already-locked data. `MemoryStore` and the atomic-write evaluator both
//! call into here, so direct operations and transactions share one
//! semantics.
//!
//! A read against the wrong kind observes absence, and a container write
//! against the wrong kind replaces the entry. The key-kind invariant is
//! the caller's contract, not something enforced here.

use std::collections::{HashMap, HashSet};

use polystore_core::{StoreError, StoreResult, Value};

use crate::sorted::SortedHash;

#[derive(Debug, Clone)]
pub(crate) enum Entry {
    Scalar(Vec<u8>),
    Set(HashSet<Vec<u8>>),
    Hash(HashMap<String, Vec<u8>>),
    Sorted(SortedHash),
}

#[derive(Debug, Default)]
pub(crate) struct State {
    entries: HashMap<String, Entry>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(Entry::Scalar(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.entries
            .insert(key.to_owned(), Entry::Scalar(value.into_bytes()));
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn n_incr_by(&mut self, key: &str, n: i64) -> StoreResult<i64> {
        if let Some(Entry::Scalar(bytes)) = self.entries.get(key) {
            let text = String::from_utf8_lossy(bytes);
            let current: i64 = text.parse().map_err(|_| StoreError::NotAnInteger {
                value: text.into_owned(),
            })?;
            let next = current.wrapping_add(n);
            self.set(key, Value::Int(next));
            return Ok(next);
        }
        self.set(key, Value::Int(n));
        Ok(n)
    }

    pub fn s_add(&mut self, key: &str, members: Vec<Value>) {
        if members.is_empty() {
            return;
        }
        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Set(HashSet::new()));
        if !matches!(entry, Entry::Set(_)) {
            *entry = Entry::Set(HashSet::new());
        }
        if let Entry::Set(set) = entry {
            for member in members {
                set.insert(member.into_bytes());
            }
        }
    }

    pub fn s_rem(&mut self, key: &str, members: Vec<Value>) {
        if let Some(Entry::Set(set)) = self.entries.get_mut(key) {
            for member in members {
                set.remove(&member.into_bytes());
            }
            if set.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    pub fn s_members(&self, key: &str) -> Vec<Vec<u8>> {
        match self.entries.get(key) {
            Some(Entry::Set(set)) => set.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn h_set(&mut self, key: &str, entries: Vec<(String, Value)>) {
        if entries.is_empty() {
            return;
        }
        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        if !matches!(entry, Entry::Hash(_)) {
            *entry = Entry::Hash(HashMap::new());
        }
        if let Entry::Hash(hash) = entry {
            for (field, value) in entries {
                hash.insert(field, value.into_bytes());
            }
        }
    }

    pub fn h_del(&mut self, key: &str, fields: &[String]) {
        if let Some(Entry::Hash(hash)) = self.entries.get_mut(key) {
            for field in fields {
                hash.remove(field);
            }
            if hash.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    pub fn h_get(&self, key: &str, field: &str) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(Entry::Hash(hash)) => hash.get(field).map(Vec::as_slice),
            _ => None,
        }
    }

    pub fn h_get_all(&self, key: &str) -> HashMap<String, Vec<u8>> {
        match self.entries.get(key) {
            Some(Entry::Hash(hash)) => hash.clone(),
            _ => HashMap::new(),
        }
    }

    fn sorted_mut(&mut self, key: &str) -> &mut SortedHash {
        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Sorted(SortedHash::new()));
        if !matches!(entry, Entry::Sorted(_)) {
            *entry = Entry::Sorted(SortedHash::new());
        }
        match entry {
            Entry::Sorted(sorted) => sorted,
            // The arms above just made the entry a sorted hash.
            _ => unreachable!(),
        }
    }

    pub fn sorted(&self, key: &str) -> Option<&SortedHash> {
        match self.entries.get(key) {
            Some(Entry::Sorted(sorted)) => Some(sorted),
            _ => None,
        }
    }

    pub fn zh_add(&mut self, key: &str, field: &[u8], member: Vec<u8>, score: f64) {
        self.sorted_mut(key).insert(field, member, score);
    }

    pub fn z_incr_by(&mut self, key: &str, member: Vec<u8>, delta: f64) -> f64 {
        let field = member.clone();
        self.sorted_mut(key).increment(&field, member, delta)
    }

    pub fn zh_rem(&mut self, key: &str, field: &[u8]) {
        if let Some(Entry::Sorted(sorted)) = self.entries.get_mut(key) {
            sorted.remove(field);
            if sorted.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    pub fn z_score(&self, key: &str, field: &[u8]) -> Option<f64> {
        self.sorted(key).and_then(|sorted| sorted.score(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let mut state = State::new();
        state.set("foo", Value::from("bar"));
        assert_eq!(state.get("foo"), Some(&b"bar"[..]));
        assert!(state.delete("foo"));
        assert!(!state.delete("foo"));
        assert_eq!(state.get("foo"), None);
    }

    #[test]
    fn test_counter_seeds_and_accumulates() {
        let mut state = State::new();
        assert_eq!(state.n_incr_by("n", 1).unwrap(), 1);
        assert_eq!(state.get("n"), Some(&b"1"[..]));
        assert_eq!(state.n_incr_by("n", 2).unwrap(), 3);
        assert_eq!(state.get("n"), Some(&b"3"[..]));
    }

    #[test]
    fn test_counter_rejects_non_integer() {
        let mut state = State::new();
        state.set("n", Value::from("not a number"));
        assert!(matches!(
            state.n_incr_by("n", 1),
            Err(StoreError::NotAnInteger { .. })
        ));
    }

    #[test]
    fn test_set_empties_delete_the_key() {
        let mut state = State::new();
        state.s_add("s", vec![Value::from("a"), Value::from("b")]);
        state.s_rem("s", vec![Value::from("a")]);
        assert!(state.contains_key("s"));
        state.s_rem("s", vec![Value::from("b")]);
        assert!(!state.contains_key("s"));
    }

    #[test]
    fn test_hash_empties_delete_the_key() {
        let mut state = State::new();
        state.h_set("h", vec![("f".to_owned(), Value::from("v"))]);
        assert_eq!(state.h_get("h", "f"), Some(&b"v"[..]));
        state.h_del("h", &["f".to_owned()]);
        assert!(!state.contains_key("h"));
    }

    #[test]
    fn test_sorted_hash_empties_delete_the_key() {
        let mut state = State::new();
        state.zh_add("z", b"f", b"member".to_vec(), 1.0);
        assert_eq!(state.z_score("z", b"f"), Some(1.0));
        state.zh_rem("z", b"f");
        assert!(!state.contains_key("z"));
    }

    #[test]
    fn test_wrong_kind_reads_observe_absence() {
        let mut state = State::new();
        state.s_add("s", vec![Value::from("a")]);
        assert_eq!(state.get("s"), None);
        assert_eq!(state.h_get("s", "a"), None);
        assert_eq!(state.z_score("s", b"a"), None);
        assert!(state.contains_key("s"));
    }
}
