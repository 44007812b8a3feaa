//! Core contract for polystore
//!
//! This crate defines everything a backend or decorator needs to speak the
//! store contract:
//! - Value: polyvalent write input, canonicalized to bytes at the boundary
//! - Store: the backend-agnostic operation set
//! - AtomicWriteOperation: conditional transactions of up to 25 sub-operations
//! - Batch: best-effort grouped operations with deferred result handles
//! - Sort keys: the order-preserving 8-byte encoding of float64 scores
//! - LexBound: the `-` / `+` / `[` / `(` range-bound grammar
//! - StoreError: the error taxonomy shared by all backends
//!
//! Backends (the in-memory reference, remote stores) and decorators (read
//! cache, invalidator) all implement [`Store`]; callers compose them freely.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atomic;
pub mod batch;
pub mod error;
pub mod lex;
pub mod profiler;
pub mod sort_key;
pub mod store;
pub mod value;

pub use atomic::{AtomicWriteOperation, AtomicWriteResult, MAX_ATOMIC_WRITE_OPERATIONS};
pub use batch::{
    Batch, BatchGetResult, BatchHandle, BatchMembersResult, BatchScoreResult, BatchWriteResult,
    FallbackBatch,
};
pub use error::{StoreError, StoreResult};
pub use lex::LexBound;
pub use profiler::{BasicProfiler, Profiler};
pub use store::{ScoredMember, Store};
pub use value::Value;
