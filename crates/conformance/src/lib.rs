//! Conformance suite for polystore backends
//!
//! Every backend and decorator must pass [`test_store`]. Backend crates
//! call it from an integration test with a factory producing fresh
//! stores:
//!
//! ```ignore
//! #[test]
//! fn conformance() {
//!     polystore_conformance::test_store(&|| Arc::new(MemoryStore::new()));
//! }
//! ```
//!
//! The sections are exported individually so a decorator with caching
//! semantics can also run them against a shared instance, and
//! [`CountingStore`] is provided for tests that need to observe or fail
//! the inner store of a decorator.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod atomic;
mod batch;
mod counting;
mod suite;

use std::sync::Arc;

use polystore_core::Store;

pub use atomic::test_atomic_write;
pub use batch::test_batch;
pub use counting::CountingStore;
pub use suite::{
    test_counter, test_hashes, test_lex_ranges, test_scalars, test_score_ranges, test_sets,
    test_sorted_hashes, test_store_views, test_z_incr_by,
};

/// Runs the whole suite, one fresh store per section.
pub fn test_store(new_store: &dyn Fn() -> Arc<dyn Store>) {
    test_scalars(&*new_store());
    test_counter(&*new_store());
    test_sets(&*new_store());
    test_hashes(&*new_store());
    test_score_ranges(&*new_store());
    test_lex_ranges(&*new_store());
    test_sorted_hashes(&*new_store());
    test_z_incr_by(new_store());
    test_store_views(new_store());
    test_atomic_write(&*new_store());
    test_batch(&*new_store());
}

pub(crate) fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).expect("suite members are utf-8")
}

pub(crate) fn texts(members: Vec<Vec<u8>>) -> Vec<String> {
    members.into_iter().map(text).collect()
}

pub(crate) fn sorted_texts(members: Vec<Vec<u8>>) -> Vec<String> {
    let mut names = texts(members);
    names.sort();
    names
}
