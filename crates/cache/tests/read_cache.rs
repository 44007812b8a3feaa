//! Read-cache behavior: full conformance, memoization of values and
//! errors, plane separation, and invalidation through every write path.

use std::sync::Arc;

use polystore_cache::ReadCache;
use polystore_conformance::CountingStore;
use polystore_core::{Store, StoreError, Value};
use polystore_memory::MemoryStore;

fn counting_cache() -> (ReadCache, CountingStore) {
    let counting = CountingStore::new(Arc::new(MemoryStore::new()));
    let cache = ReadCache::new(Arc::new(counting.clone()));
    (cache, counting)
}

#[test]
fn conformance() {
    // The cache must be transparent: the whole backend suite holds.
    polystore_conformance::test_store(&|| {
        Arc::new(ReadCache::new(Arc::new(MemoryStore::new())))
    });
}

#[test]
fn get_is_memoized() {
    let (cache, counting) = counting_cache();
    cache.set("foo", Value::from("bar")).unwrap();

    assert_eq!(cache.get("foo").unwrap(), Some(b"bar".to_vec()));
    assert_eq!(cache.get("foo").unwrap(), Some(b"bar".to_vec()));
    assert_eq!(counting.read_count(), 1);

    // Absence is memoized too.
    assert_eq!(cache.get("missing").unwrap(), None);
    assert_eq!(cache.get("missing").unwrap(), None);
    assert_eq!(counting.read_count(), 2);
}

#[test]
fn errors_are_memoized() {
    let (cache, counting) = counting_cache();

    counting.inject_error(Some(StoreError::io("backend down")));
    assert!(matches!(cache.get("foo"), Err(StoreError::Io { .. })));
    assert_eq!(counting.read_count(), 1);

    // The inner store heals, but the cached error keeps serving: repeated
    // reads must not amplify load against a failing store.
    counting.inject_error(None);
    assert!(matches!(cache.get("foo"), Err(StoreError::Io { .. })));
    assert_eq!(counting.read_count(), 1);

    // Invalidation clears the memoized error.
    cache.invalidate("foo");
    assert_eq!(cache.get("foo").unwrap(), None);
    assert_eq!(counting.read_count(), 2);
}

#[test]
fn writes_invalidate() {
    let (cache, counting) = counting_cache();

    cache.set("foo", Value::from("one")).unwrap();
    assert_eq!(cache.get("foo").unwrap(), Some(b"one".to_vec()));
    assert_eq!(counting.read_count(), 1);

    cache.set("foo", Value::from("two")).unwrap();
    assert_eq!(cache.get("foo").unwrap(), Some(b"two".to_vec()));
    assert_eq!(counting.read_count(), 2);

    // Conditional writes invalidate whether or not they wrote.
    assert!(!cache.set_nx("foo", Value::from("three")).unwrap());
    assert_eq!(cache.get("foo").unwrap(), Some(b"two".to_vec()));
    assert_eq!(counting.read_count(), 3);
}

#[test]
fn h_get_served_from_h_get_all() {
    let (cache, counting) = counting_cache();
    cache
        .h_set(
            "h",
            vec![
                ("a".to_owned(), Value::from("1")),
                ("b".to_owned(), Value::from("2")),
            ],
        )
        .unwrap();

    assert_eq!(cache.h_get_all("h").unwrap().len(), 2);
    assert_eq!(counting.read_count(), 1);

    // Both present and absent fields come out of the full-hash entry.
    assert_eq!(cache.h_get("h", "a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(cache.h_get("h", "zzz").unwrap(), None);
    assert_eq!(counting.read_count(), 1);
}

#[test]
fn h_get_entries_accumulate_until_h_get_all() {
    let (cache, counting) = counting_cache();
    cache
        .h_set(
            "h",
            vec![
                ("a".to_owned(), Value::from("1")),
                ("b".to_owned(), Value::from("2")),
            ],
        )
        .unwrap();

    assert_eq!(cache.h_get("h", "a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(cache.h_get("h", "a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(counting.read_count(), 1);

    // A different field is its own miss.
    assert_eq!(cache.h_get("h", "b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(counting.read_count(), 2);

    // h_get_all supersedes the accumulated per-field entries.
    assert_eq!(cache.h_get_all("h").unwrap().len(), 2);
    assert_eq!(counting.read_count(), 3);
    assert_eq!(cache.h_get("h", "a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(counting.read_count(), 3);
}

#[test]
fn sorted_sub_entries_are_keyed_by_query() {
    let (cache, counting) = counting_cache();
    for (member, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
        cache.z_add("z", Value::from(member), score).unwrap();
    }

    assert_eq!(cache.z_score("z", Value::from("a")).unwrap(), Some(1.0));
    assert_eq!(cache.z_score("z", Value::from("a")).unwrap(), Some(1.0));
    assert_eq!(counting.read_count(), 1);
    assert_eq!(cache.z_score("z", Value::from("b")).unwrap(), Some(2.0));
    assert_eq!(counting.read_count(), 2);

    assert_eq!(cache.z_count("z", 1.0, 2.0).unwrap(), 2);
    assert_eq!(cache.z_count("z", 1.0, 2.0).unwrap(), 2);
    assert_eq!(counting.read_count(), 3);
    assert_eq!(cache.z_count("z", 1.0, 3.0).unwrap(), 3);
    assert_eq!(counting.read_count(), 4);

    // Forward and reverse ranges are distinct sub-entries.
    assert_eq!(cache.z_range_by_score("z", 1.0, 3.0, 0).unwrap().len(), 3);
    assert_eq!(counting.read_count(), 5);
    assert_eq!(cache.z_rev_range_by_score("z", 1.0, 3.0, 0).unwrap().len(), 3);
    assert_eq!(counting.read_count(), 6);
    assert_eq!(cache.z_range_by_score("z", 1.0, 3.0, 0).unwrap().len(), 3);
    assert_eq!(counting.read_count(), 6);
}

#[test]
fn cached_range_limits_subsume_smaller_requests() {
    let (cache, counting) = counting_cache();
    for member in ["a", "b", "c"] {
        cache.z_add("z", Value::from(member), 0.0).unwrap();
    }

    // limit 2 cached; limit 1 is served from it.
    assert_eq!(cache.z_range_by_lex("z", "-", "+", 2).unwrap().len(), 2);
    assert_eq!(counting.read_count(), 1);
    assert_eq!(cache.z_range_by_lex("z", "-", "+", 1).unwrap().len(), 2);
    assert_eq!(counting.read_count(), 1);

    // limit 3 exceeds the cached limit and refetches.
    assert_eq!(cache.z_range_by_lex("z", "-", "+", 3).unwrap().len(), 3);
    assert_eq!(counting.read_count(), 2);

    // An unlimited fetch does not subsume a limited one: the contract's
    // rule is the literal `limit <= cached_limit` with 0 as unlimited,
    // so the limited request refetches.
    assert_eq!(cache.z_range_by_score("z", 0.0, 0.0, 0).unwrap().len(), 3);
    assert_eq!(counting.read_count(), 3);
    assert_eq!(cache.z_range_by_score("z", 0.0, 0.0, 2).unwrap().len(), 2);
    assert_eq!(counting.read_count(), 4);
}

#[test]
fn failed_transaction_still_invalidates_every_referenced_key() {
    let (cache, counting) = counting_cache();
    cache.set("foo", Value::from("old")).unwrap();
    cache.set("guard", Value::from("present")).unwrap();

    assert_eq!(cache.get("foo").unwrap(), Some(b"old".to_vec()));
    assert_eq!(counting.read_count(), 1);

    // The transaction writes "foo" but fails its condition on "guard".
    let mut tx = cache.atomic_write();
    tx.set("foo", Value::from("new"));
    let failing = tx.set_nx("guard", Value::from("present"));
    let committed = tx.exec().unwrap();
    assert!(!committed);
    assert!(failing.conditional_failed());

    // "foo" must be re-read from the inner store, and still holds the old
    // value since nothing committed.
    assert_eq!(cache.get("foo").unwrap(), Some(b"old".to_vec()));
    assert_eq!(counting.read_count(), 2);
}

#[test]
fn committed_transaction_invalidates_too() {
    let (cache, counting) = counting_cache();
    cache.set("foo", Value::from("old")).unwrap();
    assert_eq!(cache.get("foo").unwrap(), Some(b"old".to_vec()));

    let mut tx = cache.atomic_write();
    tx.set("foo", Value::from("new"));
    assert!(tx.exec().unwrap());

    assert_eq!(cache.get("foo").unwrap(), Some(b"new".to_vec()));
    assert_eq!(counting.read_count(), 2);
}

#[test]
fn eventually_consistent_reads_use_their_own_plane() {
    let (cache, counting) = counting_cache();
    cache.set("k", Value::from("v")).unwrap();

    assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(counting.read_count(), 1);

    // The relaxed view misses on its own plane, then caches there.
    let relaxed = cache.with_eventually_consistent_reads();
    assert_eq!(relaxed.get("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(counting.read_count(), 2);
    assert_eq!(relaxed.get("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(counting.read_count(), 2);

    // Relaxed reads never touched the strong plane.
    assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(counting.read_count(), 2);

    // Writes invalidate both planes.
    cache.set("k", Value::from("w")).unwrap();
    assert_eq!(relaxed.get("k").unwrap(), Some(b"w".to_vec()));
    assert_eq!(cache.get("k").unwrap(), Some(b"w".to_vec()));
    assert_eq!(counting.read_count(), 4);

    // Deriving twice returns an equivalent relaxed view.
    let again = relaxed.with_eventually_consistent_reads();
    assert_eq!(again.get("k").unwrap(), Some(b"w".to_vec()));
    assert_eq!(counting.read_count(), 4);
}

#[test]
fn with_backend_shares_the_planes() {
    let (cache, counting) = counting_cache();
    cache.set("k", Value::from("v")).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(counting.read_count(), 1);

    // A cache re-targeted at a different store still serves the shared
    // entry without consulting its own backend.
    let other = CountingStore::new(Arc::new(MemoryStore::new()));
    let retargeted = cache.with_backend(Arc::new(other.clone()));
    assert_eq!(retargeted.get("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(other.read_count(), 0);
}

#[test]
fn cache_introspection_and_bulk_invalidation() {
    let (cache, counting) = counting_cache();
    cache.set("a", Value::from("1")).unwrap();
    cache.set("b", Value::from("2")).unwrap();

    assert!(!cache.has_key_cached("a"));
    cache.get("a").unwrap();
    assert!(cache.has_key_cached("a"));

    cache.get("b").unwrap();
    cache.invalidate_all();
    assert!(!cache.has_key_cached("a"));
    assert!(!cache.has_key_cached("b"));

    cache.get("a").unwrap();
    cache.get("b").unwrap();
    assert_eq!(counting.read_count(), 4);
}

#[test]
fn batch_reads_are_served_from_cache_and_fill_it() {
    let (cache, counting) = counting_cache();
    cache.set("hit", Value::from("cached")).unwrap();
    cache.set("miss", Value::from("fresh")).unwrap();
    assert_eq!(cache.get("hit").unwrap(), Some(b"cached".to_vec()));
    assert_eq!(counting.read_count(), 1);

    let mut batch = cache.batch();
    let hit = batch.get("hit");
    let miss = batch.get("miss");
    batch.exec().unwrap();
    assert_eq!(hit.result().unwrap(), Some(b"cached".to_vec()));
    assert_eq!(miss.result().unwrap(), Some(b"fresh".to_vec()));
    // Only the miss reached the inner store.
    assert_eq!(counting.read_count(), 2);

    // The miss populated the cache for later direct reads.
    assert_eq!(cache.get("miss").unwrap(), Some(b"fresh".to_vec()));
    assert_eq!(counting.read_count(), 2);
}

#[test]
fn batch_writes_invalidate_after_exec() {
    let (cache, counting) = counting_cache();
    cache.set("k", Value::from("old")).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(b"old".to_vec()));
    assert_eq!(counting.read_count(), 1);

    let mut batch = cache.batch();
    batch.set("k", Value::from("new"));
    batch.exec().unwrap();

    assert_eq!(cache.get("k").unwrap(), Some(b"new".to_vec()));
    assert_eq!(counting.read_count(), 2);
}

#[test]
fn unwrap_returns_the_inner_store() {
    let (cache, _counting) = counting_cache();
    cache.set("foo", Value::from("bar")).unwrap();
    let inner = cache.unwrap_inner().unwrap();
    assert_eq!(inner.get("foo").unwrap(), Some(b"bar".to_vec()));
}
