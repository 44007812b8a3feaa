//! The in-memory store
//!
//! `MemoryStore` is a cheaply cloneable handle onto shared state; clones
//! see each other's writes. One `parking_lot::Mutex` serializes all
//! access, which keeps every contract guarantee trivially true and makes
//! this the fixture the conformance suite runs against.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use polystore_core::lex::LexBound;
use polystore_core::{
    AtomicWriteOperation, Batch, FallbackBatch, Profiler, ScoredMember, Store, StoreResult, Value,
};

use crate::atomic::MemoryAtomicWrite;
use crate::state::State;

/// The canonical in-memory backend. Never emits an error from I/O.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub(crate) state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Erases everything in the store and makes it like-new.
    pub fn reinitialize(&self) {
        self.state.lock().clear();
    }
}

impl Store for MemoryStore {
    fn batch(&self) -> Box<dyn Batch> {
        Box::new(FallbackBatch::new(self.clone()))
    }

    fn atomic_write(&self) -> Box<dyn AtomicWriteOperation> {
        Box::new(MemoryAtomicWrite::new(self.clone()))
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.lock().get(key).map(<[u8]>::to_vec))
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.state.lock().set(key, value);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.state.lock().delete(key))
    }

    fn set_nx(&self, key: &str, value: Value) -> StoreResult<bool> {
        let mut state = self.state.lock();
        if state.contains_key(key) {
            return Ok(false);
        }
        state.set(key, value);
        Ok(true)
    }

    fn set_xx(&self, key: &str, value: Value) -> StoreResult<bool> {
        let mut state = self.state.lock();
        if !state.contains_key(key) {
            return Ok(false);
        }
        state.set(key, value);
        Ok(true)
    }

    fn set_eq(&self, key: &str, value: Value, old_value: Value) -> StoreResult<bool> {
        let mut state = self.state.lock();
        if state.get(key) != Some(old_value.into_bytes().as_slice()) {
            return Ok(false);
        }
        state.set(key, value);
        Ok(true)
    }

    fn n_incr_by(&self, key: &str, n: i64) -> StoreResult<i64> {
        self.state.lock().n_incr_by(key, n)
    }

    fn s_add(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        self.state.lock().s_add(key, members);
        Ok(())
    }

    fn s_rem(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        self.state.lock().s_rem(key, members);
        Ok(())
    }

    fn s_members(&self, key: &str) -> StoreResult<Vec<Vec<u8>>> {
        Ok(self.state.lock().s_members(key))
    }

    fn h_set(&self, key: &str, entries: Vec<(String, Value)>) -> StoreResult<()> {
        self.state.lock().h_set(key, entries);
        Ok(())
    }

    fn h_del(&self, key: &str, fields: Vec<String>) -> StoreResult<()> {
        self.state.lock().h_del(key, &fields);
        Ok(())
    }

    fn h_get(&self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.lock().h_get(key, field).map(<[u8]>::to_vec))
    }

    fn h_get_all(&self, key: &str) -> StoreResult<HashMap<String, Vec<u8>>> {
        Ok(self.state.lock().h_get_all(key))
    }

    fn zh_add(&self, key: &str, field: &[u8], member: Value, score: f64) -> StoreResult<()> {
        self.state
            .lock()
            .zh_add(key, field, member.into_bytes(), score);
        Ok(())
    }

    fn zh_rem(&self, key: &str, field: &[u8]) -> StoreResult<()> {
        self.state.lock().zh_rem(key, field);
        Ok(())
    }

    fn z_score(&self, key: &str, field: Value) -> StoreResult<Option<f64>> {
        Ok(self.state.lock().z_score(key, &field.into_bytes()))
    }

    fn z_incr_by(&self, key: &str, member: Value, delta: f64) -> StoreResult<f64> {
        Ok(self
            .state
            .lock()
            .z_incr_by(key, member.into_bytes(), delta))
    }

    fn z_count(&self, key: &str, min: f64, max: f64) -> StoreResult<usize> {
        Ok(match self.state.lock().sorted(key) {
            Some(sorted) => sorted.range_by_score(min, max, 0).len(),
            None => 0,
        })
    }

    fn z_lex_count(&self, key: &str, min: &str, max: &str) -> StoreResult<usize> {
        let (min, max) = (LexBound::parse(min)?, LexBound::parse(max)?);
        Ok(match self.state.lock().sorted(key) {
            Some(sorted) => sorted.range_by_lex(&min, &max, 0).len(),
            None => 0,
        })
    }

    fn z_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        Ok(match self.state.lock().sorted(key) {
            Some(sorted) => sorted.range_by_score(min, max, limit),
            None => Vec::new(),
        })
    }

    fn z_rev_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        Ok(match self.state.lock().sorted(key) {
            Some(sorted) => sorted.rev_range_by_score(min, max, limit),
            None => Vec::new(),
        })
    }

    fn z_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> StoreResult<Vec<Vec<u8>>> {
        let (min, max) = (LexBound::parse(min)?, LexBound::parse(max)?);
        Ok(match self.state.lock().sorted(key) {
            Some(sorted) => sorted.range_by_lex(&min, &max, limit),
            None => Vec::new(),
        })
    }

    fn z_rev_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> StoreResult<Vec<Vec<u8>>> {
        let (min, max) = (LexBound::parse(min)?, LexBound::parse(max)?);
        Ok(match self.state.lock().sorted(key) {
            Some(sorted) => sorted.rev_range_by_lex(&min, &max, limit),
            None => Vec::new(),
        })
    }

    fn with_eventually_consistent_reads(&self) -> Arc<dyn Store> {
        Arc::new(self.clone())
    }

    fn with_profiler(&self, _profiler: Arc<dyn Profiler>) -> Arc<dyn Store> {
        Arc::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStore::new();
        let alias = store.clone();
        store.set("foo", Value::from("bar")).unwrap();
        assert_eq!(alias.get("foo").unwrap(), Some(b"bar".to_vec()));
    }

    #[test]
    fn test_reinitialize() {
        let store = MemoryStore::new();
        store.set("foo", Value::from("bar")).unwrap();
        store.z_add("z", Value::from("m"), 1.0).unwrap();
        store.reinitialize();
        assert_eq!(store.get("foo").unwrap(), None);
        assert_eq!(store.z_count("z", f64::NEG_INFINITY, f64::INFINITY).unwrap(), 0);
    }

    #[test]
    fn test_invalid_lex_bound_is_an_error() {
        let store = MemoryStore::new();
        assert!(store.z_range_by_lex("z", "bogus", "+", 0).is_err());
        assert!(store.z_lex_count("z", "-", "bogus").is_err());
    }

    #[test]
    fn test_concurrent_counter_increments() {
        let store = MemoryStore::new();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.n_incr_by("n", 1).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(store.get("n").unwrap(), Some(b"800".to_vec()));
    }
}
