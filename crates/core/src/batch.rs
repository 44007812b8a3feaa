//! Best-effort batched operations
//!
//! A batch groups independent reads and writes for possible throughput
//! benefit on backends with native batching. There is no atomicity and no
//! isolation: sub-operations may interleave with concurrent writers, and
//! no ordering is guaranteed between sub-operations, so a batch must not
//! encode dependencies.
//!
//! Each submission returns a [`BatchHandle`]; the value materializes when
//! `exec` runs. `exec` itself returns only the first failure encountered,
//! with per-operation outcomes left on the handles.
//!
//! [`FallbackBatch`] gives every backend without native batching a correct
//! (if unremarkable) implementation: serial replay against the store.

use std::sync::Arc;
use std::sync::OnceLock;

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use crate::value::Value;

/// Deferred result of a batched sub-operation.
pub struct BatchHandle<T> {
    slot: Arc<OnceLock<StoreResult<T>>>,
}

impl<T> Clone for BatchHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for BatchHandle<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
        }
    }
}

impl<T: Clone> BatchHandle<T> {
    /// Creates an unresolved handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sub-operation's outcome.
    ///
    /// # Errors
    ///
    /// [`StoreError::BatchNotExecuted`] if the batch has not run yet;
    /// otherwise the sub-operation's own error, if it failed.
    pub fn result(&self) -> StoreResult<T> {
        match self.slot.get() {
            Some(result) => result.clone(),
            None => Err(StoreError::BatchNotExecuted),
        }
    }

    /// Backend-side: records the sub-operation's outcome. Later calls for
    /// an already-resolved handle are ignored.
    pub fn resolve(&self, result: StoreResult<T>) {
        let _ = self.slot.set(result);
    }
}

/// Handle for a batched `get`.
pub type BatchGetResult = BatchHandle<Option<Vec<u8>>>;
/// Handle for a batched `s_members`.
pub type BatchMembersResult = BatchHandle<Vec<Vec<u8>>>;
/// Handle for a batched `z_score`.
pub type BatchScoreResult = BatchHandle<Option<f64>>;
/// Handle for a batched write.
pub type BatchWriteResult = BatchHandle<()>;

/// A staged group of independent operations.
pub trait Batch: Send {
    /// Stages a scalar read.
    fn get(&mut self, key: &str) -> BatchGetResult;

    /// Stages a set-members read.
    fn s_members(&mut self, key: &str) -> BatchMembersResult;

    /// Stages a sorted-set score read.
    fn z_score(&mut self, key: &str, field: Value) -> BatchScoreResult;

    /// Stages a scalar write.
    fn set(&mut self, key: &str, value: Value) -> BatchWriteResult;

    /// Stages a key deletion.
    fn delete(&mut self, key: &str) -> BatchWriteResult;

    /// Stages a set-members addition.
    fn s_add(&mut self, key: &str, members: Vec<Value>) -> BatchWriteResult;

    /// Stages a set-members removal.
    fn s_rem(&mut self, key: &str, members: Vec<Value>) -> BatchWriteResult;

    /// Stages a sorted-set addition.
    fn z_add(&mut self, key: &str, member: Value, score: f64) -> BatchWriteResult;

    /// Stages a sorted-set removal.
    fn z_rem(&mut self, key: &str, member: Value) -> BatchWriteResult;

    /// Runs every staged operation and resolves its handle. Returns the
    /// first failure encountered, if any.
    fn exec(self: Box<Self>) -> StoreResult<()>;
}

enum FallbackOp {
    Get {
        key: String,
        result: BatchGetResult,
    },
    SMembers {
        key: String,
        result: BatchMembersResult,
    },
    ZScore {
        key: String,
        field: Value,
        result: BatchScoreResult,
    },
    Set {
        key: String,
        value: Value,
        result: BatchWriteResult,
    },
    Delete {
        key: String,
        result: BatchWriteResult,
    },
    SAdd {
        key: String,
        members: Vec<Value>,
        result: BatchWriteResult,
    },
    SRem {
        key: String,
        members: Vec<Value>,
        result: BatchWriteResult,
    },
    ZAdd {
        key: String,
        member: Value,
        score: f64,
        result: BatchWriteResult,
    },
    ZRem {
        key: String,
        member: Value,
        result: BatchWriteResult,
    },
}

/// Serial batch replay for backends without native batching.
///
/// Sub-operations run one by one against the wrapped store, in submission
/// order.
pub struct FallbackBatch<S> {
    store: S,
    ops: Vec<FallbackOp>,
}

impl<S: Store> FallbackBatch<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ops: Vec::new(),
        }
    }
}

impl<S: Store> Batch for FallbackBatch<S> {
    fn get(&mut self, key: &str) -> BatchGetResult {
        let result = BatchGetResult::new();
        self.ops.push(FallbackOp::Get {
            key: key.to_owned(),
            result: result.clone(),
        });
        result
    }

    fn s_members(&mut self, key: &str) -> BatchMembersResult {
        let result = BatchMembersResult::new();
        self.ops.push(FallbackOp::SMembers {
            key: key.to_owned(),
            result: result.clone(),
        });
        result
    }

    fn z_score(&mut self, key: &str, field: Value) -> BatchScoreResult {
        let result = BatchScoreResult::new();
        self.ops.push(FallbackOp::ZScore {
            key: key.to_owned(),
            field,
            result: result.clone(),
        });
        result
    }

    fn set(&mut self, key: &str, value: Value) -> BatchWriteResult {
        let result = BatchWriteResult::new();
        self.ops.push(FallbackOp::Set {
            key: key.to_owned(),
            value,
            result: result.clone(),
        });
        result
    }

    fn delete(&mut self, key: &str) -> BatchWriteResult {
        let result = BatchWriteResult::new();
        self.ops.push(FallbackOp::Delete {
            key: key.to_owned(),
            result: result.clone(),
        });
        result
    }

    fn s_add(&mut self, key: &str, members: Vec<Value>) -> BatchWriteResult {
        let result = BatchWriteResult::new();
        self.ops.push(FallbackOp::SAdd {
            key: key.to_owned(),
            members,
            result: result.clone(),
        });
        result
    }

    fn s_rem(&mut self, key: &str, members: Vec<Value>) -> BatchWriteResult {
        let result = BatchWriteResult::new();
        self.ops.push(FallbackOp::SRem {
            key: key.to_owned(),
            members,
            result: result.clone(),
        });
        result
    }

    fn z_add(&mut self, key: &str, member: Value, score: f64) -> BatchWriteResult {
        let result = BatchWriteResult::new();
        self.ops.push(FallbackOp::ZAdd {
            key: key.to_owned(),
            member,
            score,
            result: result.clone(),
        });
        result
    }

    fn z_rem(&mut self, key: &str, member: Value) -> BatchWriteResult {
        let result = BatchWriteResult::new();
        self.ops.push(FallbackOp::ZRem {
            key: key.to_owned(),
            member,
            result: result.clone(),
        });
        result
    }

    fn exec(self: Box<Self>) -> StoreResult<()> {
        let FallbackBatch { store, ops } = *self;
        let mut first_error: Option<StoreError> = None;
        let mut note = |err: &StoreError| {
            if first_error.is_none() {
                first_error = Some(err.clone());
            }
        };

        for op in ops {
            match op {
                FallbackOp::Get { key, result } => {
                    let r = store.get(&key);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::SMembers { key, result } => {
                    let r = store.s_members(&key);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::ZScore { key, field, result } => {
                    let r = store.z_score(&key, field);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::Set { key, value, result } => {
                    let r = store.set(&key, value);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::Delete { key, result } => {
                    let r = store.delete(&key).map(|_| ());
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::SAdd { key, members, result } => {
                    let r = store.s_add(&key, members);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::SRem { key, members, result } => {
                    let r = store.s_rem(&key, members);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::ZAdd {
                    key,
                    member,
                    score,
                    result,
                } => {
                    let r = store.z_add(&key, member, score);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
                FallbackOp::ZRem { key, member, result } => {
                    let r = store.z_rem(&key, member);
                    if let Err(err) = &r {
                        note(err);
                    }
                    result.resolve(r);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_before_exec() {
        let handle: BatchGetResult = BatchHandle::new();
        assert!(matches!(
            handle.result(),
            Err(StoreError::BatchNotExecuted)
        ));
    }

    #[test]
    fn test_handle_resolution_is_shared_and_sticky() {
        let handle: BatchGetResult = BatchHandle::new();
        let held_by_caller = handle.clone();
        handle.resolve(Ok(Some(b"v".to_vec())));
        handle.resolve(Ok(None)); // ignored
        assert_eq!(held_by_caller.result().unwrap(), Some(b"v".to_vec()));
    }
}
