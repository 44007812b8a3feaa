//! Atomic write operations
//!
//! An atomic write stages up to [`MAX_ATOMIC_WRITE_OPERATIONS`]
//! sub-operations, some carrying a condition. At `exec`, every condition
//! is evaluated against pre-commit state under the backend's exclusive
//! access; only if all pass are the writes applied, in submission order.
//!
//! A failed condition is not an error: `exec` returns `Ok(false)` and each
//! sub-operation's [`AtomicWriteResult`] says whether its own condition
//! was the one that failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StoreResult;
use crate::value::Value;

/// Every backend enforces the smallest transaction limit among supported
/// remote stores so behavior stays portable.
pub const MAX_ATOMIC_WRITE_OPERATIONS: usize = 25;

/// Handle returned for each staged sub-operation.
///
/// Cheap to clone; readable from any thread once `exec` has returned.
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    failed: Arc<AtomicBool>,
}

impl AtomicWriteResult {
    /// Creates a handle whose condition has not failed (yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the transaction failed because this sub-operation's
    /// condition failed. Meaningful only after `exec`.
    pub fn conditional_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Backend-side: records this sub-operation's condition outcome.
    pub fn record_condition(&self, passed: bool) {
        self.failed.store(!passed, Ordering::Release);
    }
}

/// A staged conditional transaction.
///
/// Submitting a sub-operation never touches the backend; everything
/// happens at `exec`. Sub-operations named `*_nx`/`*_xx`/`*_eq` carry the
/// conditions described on each method; the rest are unconditional.
pub trait AtomicWriteOperation: Send {
    /// Sets a scalar. Unconditional.
    fn set(&mut self, key: &str, value: Value) -> AtomicWriteResult;

    /// Sets a scalar; the transaction aborts if the key already exists.
    fn set_nx(&mut self, key: &str, value: Value) -> AtomicWriteResult;

    /// Sets a scalar; the transaction aborts if the key does not exist.
    fn set_xx(&mut self, key: &str, value: Value) -> AtomicWriteResult;

    /// Sets a scalar; the transaction aborts unless the key exists with
    /// `old_value`'s canonical bytes.
    fn set_eq(&mut self, key: &str, value: Value, old_value: Value) -> AtomicWriteResult;

    /// Deletes a key. Unconditional.
    fn delete(&mut self, key: &str) -> AtomicWriteResult;

    /// Deletes a key; the transaction aborts if it does not exist.
    fn delete_xx(&mut self, key: &str) -> AtomicWriteResult;

    /// Adds `n` to the counter at `key`, seeding to `n` if absent.
    /// Unconditional.
    fn n_incr_by(&mut self, key: &str, n: i64) -> AtomicWriteResult;

    /// Adds to a sorted set. Unconditional.
    fn z_add(&mut self, key: &str, member: Value, score: f64) -> AtomicWriteResult;

    /// Adds to a sorted set; the transaction aborts if the member is
    /// already present.
    fn z_add_nx(&mut self, key: &str, member: Value, score: f64) -> AtomicWriteResult;

    /// Removes from a sorted set. Unconditional.
    fn z_rem(&mut self, key: &str, member: Value) -> AtomicWriteResult;

    /// Adds or replaces a sorted-hash entry. Unconditional.
    fn zh_add(&mut self, key: &str, field: &[u8], member: Value, score: f64) -> AtomicWriteResult;

    /// Removes a sorted-hash entry by field. Unconditional.
    fn zh_rem(&mut self, key: &str, field: &[u8]) -> AtomicWriteResult;

    /// Adds members to a set. Unconditional.
    fn s_add(&mut self, key: &str, members: Vec<Value>) -> AtomicWriteResult;

    /// Removes members from a set. Unconditional.
    fn s_rem(&mut self, key: &str, members: Vec<Value>) -> AtomicWriteResult;

    /// Sets hash fields. Unconditional.
    fn h_set(&mut self, key: &str, entries: Vec<(String, Value)>) -> AtomicWriteResult;

    /// Sets one hash field; the transaction aborts if the field already
    /// exists.
    fn h_set_nx(&mut self, key: &str, field: &str, value: Value) -> AtomicWriteResult;

    /// Deletes hash fields. Unconditional.
    fn h_del(&mut self, key: &str, fields: Vec<String>) -> AtomicWriteResult;

    /// Evaluates all conditions and, if every one passed, applies all
    /// writes atomically. Returns `Ok(false)` when a condition failed.
    ///
    /// # Errors
    ///
    /// [`StoreError::MaxOperationCountExceeded`](crate::StoreError) when
    /// more than [`MAX_ATOMIC_WRITE_OPERATIONS`] sub-operations were
    /// staged, before anything is evaluated;
    /// [`StoreError::AtomicWriteConflict`](crate::StoreError) on backend
    /// contention; otherwise whatever the backend surfaces.
    fn exec(self: Box<Self>) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_defaults_to_passed() {
        let result = AtomicWriteResult::new();
        assert!(!result.conditional_failed());
    }

    #[test]
    fn test_result_is_shared_across_clones() {
        let result = AtomicWriteResult::new();
        let held_by_caller = result.clone();
        result.record_condition(false);
        assert!(held_by_caller.conditional_failed());
        result.record_condition(true);
        assert!(!held_by_caller.conditional_failed());
    }
}
