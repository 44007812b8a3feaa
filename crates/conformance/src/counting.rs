//! Observable store double for decorator tests
//!
//! [`CountingStore`] delegates everything to an inner store while counting
//! reads and writes, and can be told to fail reads with an injected
//! error. Decorator tests use it to prove a read was served from cache
//! (the count stays put) or that an inner error propagates and memoizes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use polystore_core::{
    AtomicWriteOperation, Batch, FallbackBatch, Profiler, ScoredMember, Store, StoreError,
    StoreResult, Value,
};

/// Counting, fault-injectable pass-through store.
#[derive(Clone)]
pub struct CountingStore {
    inner: Arc<dyn Store>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    error: Arc<Mutex<Option<StoreError>>>,
}

impl CountingStore {
    /// Wraps `inner` with zeroed counters and no injected error.
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            reads: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(AtomicUsize::new(0)),
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Number of read operations that reached this store.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write operations that reached this store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent read fail with `error`; `None` heals it.
    pub fn inject_error(&self, error: Option<StoreError>) {
        *self.error.lock() = error;
    }

    fn read_checked(&self) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match &*self.error.lock() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Store for CountingStore {
    fn batch(&self) -> Box<dyn Batch> {
        Box::new(FallbackBatch::new(self.clone()))
    }

    fn atomic_write(&self) -> Box<dyn AtomicWriteOperation> {
        self.inner.atomic_write()
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.read_checked()?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.wrote();
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.wrote();
        self.inner.delete(key)
    }

    fn set_nx(&self, key: &str, value: Value) -> StoreResult<bool> {
        self.wrote();
        self.inner.set_nx(key, value)
    }

    fn set_xx(&self, key: &str, value: Value) -> StoreResult<bool> {
        self.wrote();
        self.inner.set_xx(key, value)
    }

    fn set_eq(&self, key: &str, value: Value, old_value: Value) -> StoreResult<bool> {
        self.wrote();
        self.inner.set_eq(key, value, old_value)
    }

    fn n_incr_by(&self, key: &str, n: i64) -> StoreResult<i64> {
        self.wrote();
        self.inner.n_incr_by(key, n)
    }

    fn s_add(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        self.wrote();
        self.inner.s_add(key, members)
    }

    fn s_rem(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        self.wrote();
        self.inner.s_rem(key, members)
    }

    fn s_members(&self, key: &str) -> StoreResult<Vec<Vec<u8>>> {
        self.read_checked()?;
        self.inner.s_members(key)
    }

    fn h_set(&self, key: &str, entries: Vec<(String, Value)>) -> StoreResult<()> {
        self.wrote();
        self.inner.h_set(key, entries)
    }

    fn h_del(&self, key: &str, fields: Vec<String>) -> StoreResult<()> {
        self.wrote();
        self.inner.h_del(key, fields)
    }

    fn h_get(&self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        self.read_checked()?;
        self.inner.h_get(key, field)
    }

    fn h_get_all(&self, key: &str) -> StoreResult<HashMap<String, Vec<u8>>> {
        self.read_checked()?;
        self.inner.h_get_all(key)
    }

    fn zh_add(&self, key: &str, field: &[u8], member: Value, score: f64) -> StoreResult<()> {
        self.wrote();
        self.inner.zh_add(key, field, member, score)
    }

    fn zh_rem(&self, key: &str, field: &[u8]) -> StoreResult<()> {
        self.wrote();
        self.inner.zh_rem(key, field)
    }

    fn z_score(&self, key: &str, field: Value) -> StoreResult<Option<f64>> {
        self.read_checked()?;
        self.inner.z_score(key, field)
    }

    fn z_incr_by(&self, key: &str, member: Value, delta: f64) -> StoreResult<f64> {
        self.wrote();
        self.inner.z_incr_by(key, member, delta)
    }

    fn z_count(&self, key: &str, min: f64, max: f64) -> StoreResult<usize> {
        self.read_checked()?;
        self.inner.z_count(key, min, max)
    }

    fn z_lex_count(&self, key: &str, min: &str, max: &str) -> StoreResult<usize> {
        self.read_checked()?;
        self.inner.z_lex_count(key, min, max)
    }

    fn z_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.read_checked()?;
        self.inner.z_range_by_score_with_scores(key, min, max, limit)
    }

    fn z_rev_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.read_checked()?;
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
        self.read_checked()?;
        self.inner.z_range_by_lex(key, min, max, limit)
    }

    fn z_rev_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> StoreResult<Vec<Vec<u8>>> {
        self.read_checked()?;
        self.inner.z_rev_range_by_lex(key, min, max, limit)
    }

    fn with_eventually_consistent_reads(&self) -> Arc<dyn Store> {
        // Counters are shared so tests observe relaxed reads too.
        Arc::new(self.clone())
    }

    fn with_profiler(&self, _profiler: Arc<dyn Profiler>) -> Arc<dyn Store> {
        Arc::new(self.clone())
    }

    fn unwrap_inner(&self) -> Option<Arc<dyn Store>> {
        Some(Arc::clone(&self.inner))
    }
}
