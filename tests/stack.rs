//! End-to-end behavior of a composed stack: read cache over invalidator
//! over the in-memory backend, all speaking the same contract.

use std::sync::Arc;

use parking_lot::Mutex;

use polystore::{Invalidator, MemoryStore, ReadCache, Store, Value};

#[test]
fn full_stack_conformance() {
    polystore_conformance::test_store(&|| {
        let memory = Arc::new(MemoryStore::new());
        let invalidator = Invalidator::new(memory, Arc::new(|_key: &str| {}));
        Arc::new(ReadCache::new(Arc::new(invalidator)))
    });
}

#[test]
fn decorators_share_one_backend() {
    let memory: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let cache_a = ReadCache::new(Arc::clone(&memory));
    let cache_b = ReadCache::new(Arc::clone(&memory));

    // Writes through one decorator are visible through the other; the
    // second cache just pays its own first read.
    cache_a.set("k", Value::from("v")).unwrap();
    assert_eq!(cache_b.get("k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn external_observer_sees_cache_writes() {
    let touched = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&touched);

    let memory = Arc::new(MemoryStore::new());
    let observed = Invalidator::new(
        memory,
        Arc::new(move |key: &str| sink.lock().push(key.to_owned())),
    );
    let cache = ReadCache::new(Arc::new(observed));

    cache.set("a", Value::from("1")).unwrap();
    cache.get("a").unwrap();

    let mut tx = cache.atomic_write();
    tx.set("b", Value::from("2"));
    assert!(tx.exec().unwrap());

    assert_eq!(*touched.lock(), vec!["a", "b"]);
}

#[test]
fn unwrapping_walks_the_stack() {
    let memory: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let invalidator: Arc<dyn Store> =
        Arc::new(Invalidator::new(Arc::clone(&memory), Arc::new(|_: &str| {})));
    let cache: Arc<dyn Store> = Arc::new(ReadCache::new(Arc::clone(&invalidator)));

    memory.set("deep", Value::from("value")).unwrap();

    let mut store = cache;
    let mut depth = 0;
    while let Some(inner) = store.unwrap_inner() {
        store = inner;
        depth += 1;
    }
    assert_eq!(depth, 2);
    assert_eq!(store.get("deep").unwrap(), Some(b"value".to_vec()));
}
