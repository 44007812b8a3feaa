//! polystore: one key-value contract, many backends
//!
//! A Redis-like data model (scalars, counters, sets, hashes, sorted sets
//! and sorted hashes) behind a single backend-agnostic [`Store`] trait,
//! with best-effort batching, strictly conditional atomic writes, and
//! composable decorators for read caching and invalidation.
//!
//! This facade re-exports the workspace crates; depend on the individual
//! crates instead if you only need part of the stack.
//!
//! ```
//! use std::sync::Arc;
//! use polystore::{MemoryStore, ReadCache, Store, Value};
//!
//! let store = ReadCache::new(Arc::new(MemoryStore::new()));
//!
//! store.set("greeting", Value::from("hello"))?;
//! assert_eq!(store.get("greeting")?, Some(b"hello".to_vec()));
//!
//! // Conditional transaction: commits only if every condition passes.
//! let mut tx = store.atomic_write();
//! let claimed = tx.set_nx("greeting", Value::from("stolen"));
//! let committed = tx.exec()?;
//! assert!(!committed);
//! assert!(claimed.conditional_failed());
//! # Ok::<(), polystore::StoreError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use polystore_cache::ReadCache;
pub use polystore_core::{
    AtomicWriteOperation, AtomicWriteResult, BasicProfiler, Batch, BatchGetResult, BatchHandle,
    BatchMembersResult, BatchScoreResult, BatchWriteResult, FallbackBatch, LexBound, Profiler,
    ScoredMember, Store, StoreError, StoreResult, Value, MAX_ATOMIC_WRITE_OPERATIONS,
};
pub use polystore_invalidator::{InvalidateFn, Invalidator};
pub use polystore_memory::MemoryStore;
