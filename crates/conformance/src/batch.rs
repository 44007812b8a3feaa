//! Batch section of the conformance suite

use polystore_core::{Store, StoreError, Value};

use crate::{sorted_texts, texts};

/// Deferred reads, ordered writes to one key, and handle behavior.
pub fn test_batch(store: &dyn Store) {
    // Reads resolve after exec; absent keys resolve to None.
    store.set("b:foo", Value::from("bar")).unwrap();
    store.set("b:foo2", Value::from("bar2")).unwrap();

    let mut batch = store.batch();
    let first = batch.get("b:foo");
    let second = batch.get("b:foo2");
    let missing = batch.get("b:foo3");
    assert!(matches!(first.result(), Err(StoreError::BatchNotExecuted)));
    batch.exec().unwrap();

    assert_eq!(first.result().unwrap(), Some(b"bar".to_vec()));
    assert_eq!(second.result().unwrap(), Some(b"bar2".to_vec()));
    assert_eq!(missing.result().unwrap(), None);

    // Set members read back through a batch.
    store
        .s_add("b:set", vec![Value::from("a"), Value::from("b")])
        .unwrap();
    let mut batch = store.batch();
    let members = batch.s_members("b:set");
    batch.exec().unwrap();
    assert_eq!(sorted_texts(members.result().unwrap()), vec!["a", "b"]);

    // Writes to one key apply in submission order.
    let mut batch = store.batch();
    batch.set("b:ordered", Value::from("a"));
    batch.set("b:ordered", Value::from("b"));
    batch.exec().unwrap();
    assert_eq!(store.get("b:ordered").unwrap(), Some(b"b".to_vec()));

    let mut batch = store.batch();
    batch.set("b:doomed", Value::from("a"));
    batch.delete("b:doomed");
    batch.exec().unwrap();
    assert_eq!(store.get("b:doomed").unwrap(), None);

    // Deleting a missing key in a batch is fine.
    let mut batch = store.batch();
    batch.delete("b:doomed");
    batch.exec().unwrap();

    // Sorted-set writes and score reads.
    let mut batch = store.batch();
    batch.z_add("b:z", Value::from("a"), 0.0);
    batch.z_add("b:z", Value::from("b"), 10.0);
    batch.exec().unwrap();
    assert_eq!(texts(store.z_range_by_score("b:z", 0.0, 100.0, 0).unwrap()), vec!["a", "b"]);

    // Re-adds through a batch move the member, last submission winning.
    let mut batch = store.batch();
    batch.z_add("b:z", Value::from("a"), 5.0);
    batch.z_add("b:z", Value::from("a"), 20.0);
    batch.exec().unwrap();
    assert_eq!(texts(store.z_range_by_score("b:z", 0.0, 100.0, 0).unwrap()), vec!["b", "a"]);

    let mut batch = store.batch();
    let score_a = batch.z_score("b:z", Value::from("a"));
    let score_b = batch.z_score("b:z", Value::from("b"));
    let score_absent = batch.z_score("b:z", Value::from("absent"));
    batch.exec().unwrap();
    assert_eq!(score_a.result().unwrap(), Some(20.0));
    assert_eq!(score_b.result().unwrap(), Some(10.0));
    assert_eq!(score_absent.result().unwrap(), None);

    // Set removal through a batch.
    let mut batch = store.batch();
    batch.s_rem("b:set", vec![Value::from("a")]);
    batch.s_add("b:set", vec![Value::from("c")]);
    batch.z_rem("b:z", Value::from("b"));
    batch.exec().unwrap();
    assert_eq!(sorted_texts(store.s_members("b:set").unwrap()), vec!["b", "c"]);
    assert_eq!(texts(store.z_range_by_score("b:z", 0.0, 100.0, 0).unwrap()), vec!["a"]);

    // An empty batch is a no-op.
    store.batch().exec().unwrap();
}
