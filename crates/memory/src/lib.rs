//! In-memory backend for polystore
//!
//! This is the reference implementation of the store contract and the
//! fixture other backends are tested against. One mutex guards the whole
//! keyspace; every operation, including full transaction evaluation,
//! holds it for its complete duration. Throughput is not the point here;
//! being obviously correct is.
//!
//! The sorted-hash representation is normative for the contract: a
//! field-to-score table next to an ordered index keyed by
//! `sort_key(score) ∥ field`, which serves both score ranges and (through
//! its score-zero slice) lex ranges.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod atomic;
mod sorted;
mod state;
mod store;

pub use store::MemoryStore;
