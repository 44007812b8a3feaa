//! Error taxonomy for store operations
//!
//! Three kinds of failure are observable at the store layer:
//!
//! 1. **Condition failures** are not errors. `set_nx`-style operations
//!    return booleans, and atomic writes return `Ok(false)` with per-op
//!    flags on their result handles.
//! 2. **Operation errors** are I/O, decoding, or backend-specific failures,
//!    surfaced through [`StoreError`]. Decorators propagate them unchanged;
//!    the read cache memoizes them alongside values, which is why the type
//!    is `Clone` (wrapped causes live behind `Arc`).
//! 3. **[`StoreError::AtomicWriteConflict`]** distinguishes contention on
//!    backends with optimistic concurrency from every other failure.

use std::sync::Arc;
use thiserror::Error;

/// Convenience alias used throughout the store contract.
pub type StoreResult<T> = Result<T, StoreError>;

/// The error type shared by every backend and decorator.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// An atomic write staged more sub-operations than
    /// [`MAX_ATOMIC_WRITE_OPERATIONS`](crate::MAX_ATOMIC_WRITE_OPERATIONS).
    /// Raised before any condition is evaluated or lock taken.
    #[error("max operation count exceeded")]
    MaxOperationCountExceeded,

    /// An atomic write lost to concurrent contention (not a failed
    /// condition). Only backends with optimistic concurrency emit this.
    #[error("atomic write conflict: {source}")]
    AtomicWriteConflict {
        /// The underlying contention failure.
        #[source]
        source: Arc<StoreError>,
    },

    /// A counter operation found an existing value that does not parse as
    /// a signed 64-bit decimal integer.
    #[error("value is not an integer: {value:?}")]
    NotAnInteger {
        /// The offending stored value, lossily decoded for display.
        value: String,
    },

    /// A lexicographical range bound did not start with `[`, `(`, `-` or `+`.
    #[error("invalid lexicographical bound: {bound:?}")]
    InvalidLexBound {
        /// The bound as supplied by the caller.
        bound: String,
    },

    /// A batch result handle was read before the batch was executed.
    #[error("batch has not been executed")]
    BatchNotExecuted,

    /// An I/O-like backend failure. The in-memory backend never emits one.
    #[error("backend error: {message}")]
    Io {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Builds an I/O-like backend error from any message.
    pub fn io(message: impl Into<String>) -> Self {
        StoreError::Io {
            message: message.into(),
        }
    }

    /// Wraps a contention cause in the distinguished conflict error.
    pub fn conflict(source: StoreError) -> Self {
        StoreError::AtomicWriteConflict {
            source: Arc::new(source),
        }
    }

    /// True when this error is an atomic write conflict.
    pub fn is_atomic_write_conflict(&self) -> bool {
        matches!(self, StoreError::AtomicWriteConflict { .. })
    }

    /// Conflicts are retryable; everything else requires intervention.
    pub fn is_retryable(&self) -> bool {
        self.is_atomic_write_conflict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_wraps_cause() {
        let err = StoreError::conflict(StoreError::io("transaction contention"));
        assert!(err.is_atomic_write_conflict());
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "atomic write conflict: backend error: transaction contention"
        );
    }

    #[test]
    fn test_plain_errors_are_not_conflicts() {
        assert!(!StoreError::MaxOperationCountExceeded.is_atomic_write_conflict());
        assert!(!StoreError::io("boom").is_retryable());
    }
}
