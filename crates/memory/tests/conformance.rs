//! The in-memory backend is the reference: it must pass the whole suite.

use std::sync::Arc;

use polystore_memory::MemoryStore;

#[test]
fn conformance() {
    polystore_conformance::test_store(&|| Arc::new(MemoryStore::new()));
}

#[test]
fn conformance_after_reinitialize() {
    let store = MemoryStore::new();
    polystore_conformance::test_scalars(&store);
    store.reinitialize();
    // A reinitialized store behaves like a brand new one.
    polystore_conformance::test_scalars(&store);
}
