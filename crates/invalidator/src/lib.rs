//! Invalidation decorator for polystore
//!
//! [`Invalidator`] passes every operation through to an inner store and
//! invokes a caller-supplied callback for each key a write may have
//! touched. Caches and external observers compose on top of this one
//! mechanism instead of each re-implementing write tracking.
//!
//! Atomic writes invalidate every key they referenced after `exec`,
//! whether or not the transaction committed: a failed condition means
//! somebody's view of those keys was stale.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod atomic;
mod batch;

use std::collections::HashMap;
use std::sync::Arc;

use polystore_core::{
    AtomicWriteOperation, Batch, Profiler, ScoredMember, Store, StoreResult, Value,
};

use crate::atomic::InvalidatorAtomicWrite;
use crate::batch::InvalidatorBatch;

/// The callback invoked with each written key.
pub type InvalidateFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Pass-through decorator that reports written keys.
#[derive(Clone)]
pub struct Invalidator {
    inner: Arc<dyn Store>,
    invalidate: InvalidateFn,
}

impl Invalidator {
    /// Wraps `inner`, reporting written keys to `invalidate`.
    pub fn new(inner: Arc<dyn Store>, invalidate: InvalidateFn) -> Self {
        Self { inner, invalidate }
    }

    pub(crate) fn invalidate(&self, key: &str) {
        (self.invalidate)(key);
    }
}

impl Store for Invalidator {
    fn batch(&self) -> Box<dyn Batch> {
        Box::new(InvalidatorBatch::new(self.clone(), self.inner.batch()))
    }

    fn atomic_write(&self) -> Box<dyn AtomicWriteOperation> {
        Box::new(InvalidatorAtomicWrite::new(
            self.clone(),
            self.inner.atomic_write(),
        ))
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let result = self.inner.set(key, value);
        self.invalidate(key);
        result
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let result = self.inner.delete(key);
        self.invalidate(key);
        result
    }

    fn set_nx(&self, key: &str, value: Value) -> StoreResult<bool> {
        let result = self.inner.set_nx(key, value);
        self.invalidate(key);
        result
    }

    fn set_xx(&self, key: &str, value: Value) -> StoreResult<bool> {
        let result = self.inner.set_xx(key, value);
        self.invalidate(key);
        result
    }

    fn set_eq(&self, key: &str, value: Value, old_value: Value) -> StoreResult<bool> {
        let result = self.inner.set_eq(key, value, old_value);
        self.invalidate(key);
        result
    }

    fn n_incr_by(&self, key: &str, n: i64) -> StoreResult<i64> {
        let result = self.inner.n_incr_by(key, n);
        self.invalidate(key);
        result
    }

    fn s_add(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        let result = self.inner.s_add(key, members);
        self.invalidate(key);
        result
    }

    fn s_rem(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        let result = self.inner.s_rem(key, members);
        self.invalidate(key);
        result
    }

    fn s_members(&self, key: &str) -> StoreResult<Vec<Vec<u8>>> {
        self.inner.s_members(key)
    }

    fn h_set(&self, key: &str, entries: Vec<(String, Value)>) -> StoreResult<()> {
        let result = self.inner.h_set(key, entries);
        self.invalidate(key);
        result
    }

    fn h_del(&self, key: &str, fields: Vec<String>) -> StoreResult<()> {
        let result = self.inner.h_del(key, fields);
        self.invalidate(key);
        result
    }

    fn h_get(&self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.h_get(key, field)
    }

    fn h_get_all(&self, key: &str) -> StoreResult<HashMap<String, Vec<u8>>> {
        self.inner.h_get_all(key)
    }

    fn zh_add(&self, key: &str, field: &[u8], member: Value, score: f64) -> StoreResult<()> {
        let result = self.inner.zh_add(key, field, member, score);
        self.invalidate(key);
        result
    }

    fn zh_rem(&self, key: &str, field: &[u8]) -> StoreResult<()> {
        let result = self.inner.zh_rem(key, field);
        self.invalidate(key);
        result
    }

    fn z_score(&self, key: &str, field: Value) -> StoreResult<Option<f64>> {
        self.inner.z_score(key, field)
    }

    fn z_incr_by(&self, key: &str, member: Value, delta: f64) -> StoreResult<f64> {
        let result = self.inner.z_incr_by(key, member, delta);
        self.invalidate(key);
        result
    }

    fn z_count(&self, key: &str, min: f64, max: f64) -> StoreResult<usize> {
        self.inner.z_count(key, min, max)
    }

    fn z_lex_count(&self, key: &str, min: &str, max: &str) -> StoreResult<usize> {
        self.inner.z_lex_count(key, min, max)
    }

    fn z_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.inner.z_range_by_score_with_scores(key, min, max, limit)
    }

    fn z_rev_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.inner
            .z_rev_range_by_score_with_scores(key, min, max, limit)
    }

    fn z_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> StoreResult<Vec<Vec<u8>>> {
        self.inner.z_range_by_lex(key, min, max, limit)
    }

    fn z_rev_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> StoreResult<Vec<Vec<u8>>> {
        self.inner.z_rev_range_by_lex(key, min, max, limit)
    }

    fn with_eventually_consistent_reads(&self) -> Arc<dyn Store> {
        Arc::new(Self {
            inner: self.inner.with_eventually_consistent_reads(),
            invalidate: Arc::clone(&self.invalidate),
        })
    }

    fn with_profiler(&self, profiler: Arc<dyn Profiler>) -> Arc<dyn Store> {
        Arc::new(Self {
            inner: self.inner.with_profiler(profiler),
            invalidate: Arc::clone(&self.invalidate),
        })
    }

    fn unwrap_inner(&self) -> Option<Arc<dyn Store>> {
        Some(Arc::clone(&self.inner))
    }
}
