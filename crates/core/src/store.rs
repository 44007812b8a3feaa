//! The store contract
//!
//! [`Store`] is the single operation set every backend and decorator
//! implements. Decorators hold an `Arc<dyn Store>` and delegate; callers
//! never see the difference. The trait is object-safe on purpose.
//!
//! Conventions shared by all implementations:
//! - Write inputs are [`Value`]s, canonicalized to bytes at the boundary.
//! - Score range bounds are inclusive `f64`, with ±∞ meaning unbounded.
//! - Lex range bounds use the [`LexBound`](crate::LexBound) grammar.
//! - `limit == 0` means unlimited.
//! - Condition failures (`set_nx` on a present key, ...) are booleans,
//!   never errors.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::atomic::AtomicWriteOperation;
use crate::batch::Batch;
use crate::error::StoreResult;
use crate::profiler::Profiler;
use crate::value::Value;

/// A sorted-set member paired with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    /// The member's score at read time.
    pub score: f64,
    /// The member bytes.
    pub member: Vec<u8>,
}

/// The backend-agnostic operation set.
///
/// Every method must be safe to call concurrently from any thread. How
/// much actually runs in parallel is the backend's business; the in-memory
/// reference serializes everything behind one mutex.
pub trait Store: Send + Sync {
    /// Stages a group of independent operations for possible throughput
    /// benefit. No atomicity and no isolation: use it only when the
    /// grouped operations do not depend on each other.
    fn batch(&self) -> Box<dyn Batch>;

    /// Starts an atomic write of up to
    /// [`MAX_ATOMIC_WRITE_OPERATIONS`](crate::MAX_ATOMIC_WRITE_OPERATIONS)
    /// sub-operations, committed only if every condition passes.
    fn atomic_write(&self) -> Box<dyn AtomicWriteOperation>;

    /// Reads a scalar.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes a scalar, replacing whatever was there.
    fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Deletes a key of any kind. Returns true iff the key existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Writes a scalar iff the key does not exist. Returns whether it wrote.
    fn set_nx(&self, key: &str, value: Value) -> StoreResult<bool>;

    /// Writes a scalar iff the key already exists. Returns whether it wrote.
    fn set_xx(&self, key: &str, value: Value) -> StoreResult<bool>;

    /// Writes a scalar iff the key exists and its bytes equal `old_value`'s
    /// canonical bytes. Returns whether it wrote.
    fn set_eq(&self, key: &str, value: Value, old_value: Value) -> StoreResult<bool>;

    /// Atomically adds `n` to the decimal integer at `key`, seeding the key
    /// to `n` if absent. Returns the new value.
    fn n_incr_by(&self, key: &str, n: i64) -> StoreResult<i64>;

    /// Adds members to a set, creating it if needed. An empty slice is a
    /// no-op (empty containers never exist).
    fn s_add(&self, key: &str, members: Vec<Value>) -> StoreResult<()>;

    /// Removes members from a set. Removing the last member deletes the key.
    fn s_rem(&self, key: &str, members: Vec<Value>) -> StoreResult<()>;

    /// All members of a set, in unspecified order.
    fn s_members(&self, key: &str) -> StoreResult<Vec<Vec<u8>>>;

    /// Sets fields of a hash, creating it if needed.
    fn h_set(&self, key: &str, entries: Vec<(String, Value)>) -> StoreResult<()>;

    /// Deletes fields of a hash. Removing the last field deletes the key.
    fn h_del(&self, key: &str, fields: Vec<String>) -> StoreResult<()>;

    /// Reads one hash field.
    fn h_get(&self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Reads all hash fields.
    fn h_get_all(&self, key: &str) -> StoreResult<HashMap<String, Vec<u8>>>;

    /// Adds or replaces a sorted-hash entry: `field` identifies it, `member`
    /// is the payload returned by range queries, `score` orders it.
    /// Re-adding a field moves it to the new score.
    fn zh_add(&self, key: &str, field: &[u8], member: Value, score: f64) -> StoreResult<()>;

    /// Removes a sorted-hash entry by field. Removing the last entry
    /// deletes the key.
    fn zh_rem(&self, key: &str, field: &[u8]) -> StoreResult<()>;

    /// Adds to a sorted set. Exactly equivalent to `zh_add` with the
    /// member's canonical bytes as the field.
    fn z_add(&self, key: &str, member: Value, score: f64) -> StoreResult<()> {
        let field = member.into_bytes();
        let member = Value::Bytes(field.clone());
        self.zh_add(key, &field, member, score)
    }

    /// Removes from a sorted set. Exactly equivalent to `zh_rem` with the
    /// member's canonical bytes as the field.
    fn z_rem(&self, key: &str, member: Value) -> StoreResult<()> {
        let field = member.into_bytes();
        self.zh_rem(key, &field)
    }

    /// The score stored under a field (the member bytes, for sorted sets).
    fn z_score(&self, key: &str, field: Value) -> StoreResult<Option<f64>>;

    /// Adds `delta` to a sorted-set member's score, creating the member at
    /// `delta` if absent. Returns the new score.
    fn z_incr_by(&self, key: &str, member: Value, delta: f64) -> StoreResult<f64>;

    /// Number of members with score in `[min, max]`.
    fn z_count(&self, key: &str, min: f64, max: f64) -> StoreResult<usize>;

    /// Number of members between two lex bounds. All members must have
    /// been added with score zero.
    fn z_lex_count(&self, key: &str, min: &str, max: &str) -> StoreResult<usize>;

    /// Members with score in `[min, max]`, ascending by (score, field).
    fn z_range_by_score(&self, key: &str, min: f64, max: f64, limit: usize) -> StoreResult<Vec<Vec<u8>>> {
        Ok(self
            .z_range_by_score_with_scores(key, min, max, limit)?
            .into_iter()
            .map(|m| m.member)
            .collect())
    }

    /// Like `z_range_by_score`, with each member's score.
    fn z_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>>;

    /// Members with score in `[min, max]`, descending by (score, field).
    fn z_rev_range_by_score(&self, key: &str, min: f64, max: f64, limit: usize) -> StoreResult<Vec<Vec<u8>>> {
        Ok(self
            .z_rev_range_by_score_with_scores(key, min, max, limit)?
            .into_iter()
            .map(|m| m.member)
            .collect())
    }

    /// Like `z_rev_range_by_score`, with each member's score.
    fn z_rev_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>>;

    /// Members between two lex bounds in ascending field order. All
    /// members must have been added with score zero.
    fn z_range_by_lex(&self, key: &str, min: &str, max: &str, limit: usize) -> StoreResult<Vec<Vec<u8>>>;

    /// Members between two lex bounds in descending field order.
    fn z_rev_range_by_lex(&self, key: &str, min: &str, max: &str, limit: usize) -> StoreResult<Vec<Vec<u8>>>;

    /// A view of this store suitable for eventually-consistent reads.
    /// Backends without the notion return an equivalent store.
    fn with_eventually_consistent_reads(&self) -> Arc<dyn Store>;

    /// A view of this store that reports operation timings to `profiler`.
    /// Backends without instrumentation return an equivalent store.
    fn with_profiler(&self, profiler: Arc<dyn Profiler>) -> Arc<dyn Store>;

    /// The store this one decorates, if any.
    fn unwrap_inner(&self) -> Option<Arc<dyn Store>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_is_object_safe() {
        fn accepts_store(_store: &dyn Store) {}
        let _ = accepts_store as fn(&dyn Store);
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send<T: Send + ?Sized>() {}
        fn assert_sync<T: Sync + ?Sized>() {}
        assert_send::<Box<dyn Store>>();
        assert_sync::<Box<dyn Store>>();
    }
}
