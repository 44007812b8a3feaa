//! Atomic-write section of the conformance suite

use polystore_core::{AtomicWriteResult, Store, StoreError, Value, MAX_ATOMIC_WRITE_OPERATIONS};

use crate::{sorted_texts, texts};

fn assert_pass(result: &AtomicWriteResult) {
    assert!(!result.conditional_failed());
}

fn assert_fail(result: &AtomicWriteResult) {
    assert!(result.conditional_failed());
}

/// Conditional transactions: per-op flags, all-or-nothing commits, the
/// 25-op cap, and every conditional sub-operation.
pub fn test_atomic_write(store: &dyn Store) {
    // Unconditional sets commit.
    let mut tx = store.atomic_write();
    let a = tx.set("aw:a", Value::from("1"));
    let b = tx.set("aw:b", Value::from("2"));
    assert!(tx.exec().unwrap());
    assert_pass(&a);
    assert_pass(&b);
    assert_eq!(store.get("aw:a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get("aw:b").unwrap(), Some(b"2".to_vec()));

    // A failed condition aborts the entire transaction and each handle
    // reports only its own outcome.
    store.set("aw:guard", Value::from("present")).unwrap();
    let mut tx = store.atomic_write();
    let failing = tx.set_nx("aw:guard", Value::from("present"));
    let passing = tx.set("aw:other", Value::from("qux"));
    let exec = tx.exec().unwrap();
    assert!(!exec);
    assert_fail(&failing);
    assert_pass(&passing);
    assert_eq!(store.get("aw:other").unwrap(), None);

    // set_nx against a free key commits.
    let mut tx = store.atomic_write();
    let nx = tx.set_nx("aw:free", Value::from("won"));
    assert!(tx.exec().unwrap());
    assert_pass(&nx);
    assert_eq!(store.get("aw:free").unwrap(), Some(b"won".to_vec()));

    // set_xx requires presence.
    let mut tx = store.atomic_write();
    let xx = tx.set_xx("aw:absent", Value::from("nope"));
    assert!(!tx.exec().unwrap());
    assert_fail(&xx);
    assert_eq!(store.get("aw:absent").unwrap(), None);

    let mut tx = store.atomic_write();
    let xx = tx.set_xx("aw:free", Value::from("replaced"));
    assert!(tx.exec().unwrap());
    assert_pass(&xx);
    assert_eq!(store.get("aw:free").unwrap(), Some(b"replaced".to_vec()));

    // set_eq requires the exact prior bytes.
    let mut tx = store.atomic_write();
    let eq = tx.set_eq("aw:free", Value::from("final"), Value::from("wrong"));
    assert!(!tx.exec().unwrap());
    assert_fail(&eq);
    assert_eq!(store.get("aw:free").unwrap(), Some(b"replaced".to_vec()));

    let mut tx = store.atomic_write();
    let eq = tx.set_eq("aw:free", Value::from("final"), Value::from("replaced"));
    assert!(tx.exec().unwrap());
    assert_pass(&eq);
    assert_eq!(store.get("aw:free").unwrap(), Some(b"final".to_vec()));

    // delete is unconditional; delete_xx requires presence.
    let mut tx = store.atomic_write();
    tx.delete("aw:free");
    tx.delete("aw:never-existed");
    assert!(tx.exec().unwrap());
    assert_eq!(store.get("aw:free").unwrap(), None);

    let mut tx = store.atomic_write();
    let dxx = tx.delete_xx("aw:free");
    assert!(!tx.exec().unwrap());
    assert_fail(&dxx);

    store.set("aw:doomed", Value::from("x")).unwrap();
    let mut tx = store.atomic_write();
    let dxx = tx.delete_xx("aw:doomed");
    assert!(tx.exec().unwrap());
    assert_pass(&dxx);
    assert_eq!(store.get("aw:doomed").unwrap(), None);

    // n_incr_by seeds inside a transaction too.
    let mut tx = store.atomic_write();
    tx.n_incr_by("aw:n", 1);
    assert!(tx.exec().unwrap());
    assert_eq!(store.get("aw:n").unwrap(), Some(b"1".to_vec()));

    // An aborted transaction does not increment.
    let mut tx = store.atomic_write();
    tx.n_incr_by("aw:n", 10);
    let guard = tx.set_nx("aw:free2", Value::from("x"));
    let failing = tx.set_nx("aw:n", Value::from("x"));
    assert!(!tx.exec().unwrap());
    assert_pass(&guard);
    assert_fail(&failing);
    assert_eq!(store.get("aw:n").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get("aw:free2").unwrap(), None);

    // Sorted-set sub-ops under a failing condition apply nothing.
    store.set("aw:zguard", Value::from("present")).unwrap();
    let mut tx = store.atomic_write();
    tx.set_nx("aw:zguard", Value::from("present"));
    tx.z_add("aw:zset", Value::from("foo"), 1.0);
    assert!(!tx.exec().unwrap());
    assert_eq!(store.z_count("aw:zset", 0.0, 10.0).unwrap(), 0);

    let mut tx = store.atomic_write();
    tx.z_add("aw:zset", Value::from("foo"), 1.0);
    tx.z_add("aw:zset", Value::from("bar"), 2.0);
    assert!(tx.exec().unwrap());
    assert_eq!(store.z_count("aw:zset", 0.0, 10.0).unwrap(), 2);

    let mut tx = store.atomic_write();
    tx.z_rem("aw:zset", Value::from("foo"));
    assert!(tx.exec().unwrap());
    assert_eq!(texts(store.z_range_by_score("aw:zset", 0.0, 10.0, 0).unwrap()), vec!["bar"]);

    // z_add_nx: all-new members commit; one existing member aborts the
    // whole transaction, including the fresh members staged next to it.
    let mut tx = store.atomic_write();
    let foo = tx.z_add_nx("aw:zaddnx", Value::from("foo"), 0.0);
    assert!(tx.exec().unwrap());
    assert_pass(&foo);

    let mut tx = store.atomic_write();
    let baz = tx.z_add_nx("aw:zaddnx", Value::from("baz"), 0.0);
    let dup = tx.z_add_nx("aw:zaddnx", Value::from("foo"), 0.0);
    assert!(!tx.exec().unwrap());
    assert_pass(&baz);
    assert_fail(&dup);
    assert_eq!(texts(store.z_range_by_lex("aw:zaddnx", "-", "+", 0).unwrap()), vec!["foo"]);

    let mut tx = store.atomic_write();
    let baz = tx.z_add_nx("aw:zaddnx", Value::from("baz"), 0.0);
    let qux = tx.z_add_nx("aw:zaddnx", Value::from("qux"), 0.0);
    assert!(tx.exec().unwrap());
    assert_pass(&baz);
    assert_pass(&qux);

    // Sorted-hash sub-ops.
    let mut tx = store.atomic_write();
    tx.zh_add("aw:zh", b"f", Value::from("foo"), 0.0);
    tx.zh_add("aw:zh", b"b", Value::from("bar"), 0.0);
    assert!(tx.exec().unwrap());
    assert_eq!(texts(store.z_range_by_lex("aw:zh", "-", "+", 0).unwrap()), vec!["bar", "foo"]);

    let mut tx = store.atomic_write();
    tx.zh_rem("aw:zh", b"f");
    assert!(tx.exec().unwrap());
    assert_eq!(texts(store.z_range_by_lex("aw:zh", "-", "+", 0).unwrap()), vec!["bar"]);

    // Set sub-ops under conditions.
    store.set("aw:sguard", Value::from("present")).unwrap();
    let mut tx = store.atomic_write();
    tx.set_nx("aw:sguard", Value::from("present"));
    tx.s_add("aw:set", vec![Value::from("foo"), Value::from("bar")]);
    assert!(!tx.exec().unwrap());
    assert!(store.s_members("aw:set").unwrap().is_empty());

    let mut tx = store.atomic_write();
    tx.s_add("aw:set", vec![Value::from("foo"), Value::from("bar")]);
    assert!(tx.exec().unwrap());
    assert_eq!(sorted_texts(store.s_members("aw:set").unwrap()), vec!["bar", "foo"]);

    let mut tx = store.atomic_write();
    tx.s_rem("aw:set", vec![Value::from("foo")]);
    assert!(tx.exec().unwrap());
    assert_eq!(texts(store.s_members("aw:set").unwrap()), vec!["bar"]);

    // Hash sub-ops; h_set_nx conditions on the field, not the key.
    let mut tx = store.atomic_write();
    tx.h_set("aw:h", vec![("foo".to_owned(), Value::from("bar"))]);
    assert!(tx.exec().unwrap());
    assert_eq!(store.h_get("aw:h", "foo").unwrap(), Some(b"bar".to_vec()));

    let mut tx = store.atomic_write();
    let hnx = tx.h_set_nx("aw:h", "other", Value::from("v"));
    assert!(tx.exec().unwrap());
    assert_pass(&hnx);

    let mut tx = store.atomic_write();
    let hnx = tx.h_set_nx("aw:h", "foo", Value::from("clobber"));
    assert!(!tx.exec().unwrap());
    assert_fail(&hnx);
    assert_eq!(store.h_get("aw:h", "foo").unwrap(), Some(b"bar".to_vec()));

    let mut tx = store.atomic_write();
    tx.h_del("aw:h", vec!["foo".to_owned(), "other".to_owned()]);
    assert!(tx.exec().unwrap());
    assert_eq!(store.h_get("aw:h", "foo").unwrap(), None);

    // More than the cap fails fast with no side effects.
    let mut tx = store.atomic_write();
    for i in 0..=MAX_ATOMIC_WRITE_OPERATIONS {
        tx.set(&format!("aw:cap:{i}"), Value::from("v"));
    }
    assert!(matches!(tx.exec(), Err(StoreError::MaxOperationCountExceeded)));
    assert_eq!(store.get("aw:cap:0").unwrap(), None);

    let mut tx = store.atomic_write();
    for i in 0..MAX_ATOMIC_WRITE_OPERATIONS {
        tx.set(&format!("aw:cap:{i}"), Value::from("v"));
    }
    assert!(tx.exec().unwrap());
    assert_eq!(store.get("aw:cap:24").unwrap(), Some(b"v".to_vec()));
}
