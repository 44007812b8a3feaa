//! The invalidator must be invisible to callers (full conformance) while
//! reporting exactly the keys writes touch.

use std::sync::Arc;

use parking_lot::Mutex;

use polystore_core::{Store, Value};
use polystore_invalidator::Invalidator;
use polystore_memory::MemoryStore;

fn tracking_store() -> (Invalidator, Arc<Mutex<Vec<String>>>) {
    let touched = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&touched);
    let store = Invalidator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(move |key: &str| sink.lock().push(key.to_owned())),
    );
    (store, touched)
}

#[test]
fn conformance() {
    polystore_conformance::test_store(&|| {
        Arc::new(Invalidator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(|_key: &str| {}),
        ))
    });
}

#[test]
fn writes_report_their_key() {
    let (store, touched) = tracking_store();

    store.set("a", Value::from("1")).unwrap();
    store.n_incr_by("b", 1).unwrap();
    store.s_add("c", vec![Value::from("m")]).unwrap();
    store.h_set("d", vec![("f".to_owned(), Value::from("v"))]).unwrap();
    store.z_add("e", Value::from("m"), 1.0).unwrap();
    store.zh_rem("e", b"m").unwrap();
    store.delete("a").unwrap();

    assert_eq!(
        *touched.lock(),
        vec!["a", "b", "c", "d", "e", "e", "a"]
    );
}

#[test]
fn reads_report_nothing() {
    let (store, touched) = tracking_store();
    store.set("a", Value::from("1")).unwrap();
    touched.lock().clear();

    store.get("a").unwrap();
    store.s_members("a").unwrap();
    store.h_get("a", "f").unwrap();
    store.h_get_all("a").unwrap();
    store.z_score("a", Value::from("m")).unwrap();
    store.z_count("a", 0.0, 1.0).unwrap();
    store.z_range_by_lex("a", "-", "+", 0).unwrap();

    assert!(touched.lock().is_empty());
}

#[test]
fn atomic_write_reports_every_referenced_key_once_per_reference() {
    let (store, touched) = tracking_store();
    store.set("guard", Value::from("present")).unwrap();
    touched.lock().clear();

    // The condition fails, so nothing commits, but every referenced key
    // is still reported: the caller's view of them was stale either way.
    let mut tx = store.atomic_write();
    tx.set("w1", Value::from("x"));
    tx.set_nx("guard", Value::from("x"));
    tx.set("w1", Value::from("y"));
    let committed = tx.exec().unwrap();
    assert!(!committed);
    assert_eq!(store.get("w1").unwrap(), None);
    assert_eq!(*touched.lock(), vec!["w1", "guard", "w1"]);

    // Nothing was reported before exec.
    touched.lock().clear();
    let mut tx = store.atomic_write();
    tx.set("w2", Value::from("x"));
    assert!(touched.lock().is_empty());
    assert!(tx.exec().unwrap());
    assert_eq!(*touched.lock(), vec!["w2"]);
}

#[test]
fn batch_reports_written_keys_after_exec() {
    let (store, touched) = tracking_store();
    store.set("r", Value::from("1")).unwrap();
    touched.lock().clear();

    let mut batch = store.batch();
    let read = batch.get("r");
    batch.set("w", Value::from("2"));
    batch.z_add("z", Value::from("m"), 1.0);
    assert!(touched.lock().is_empty());
    batch.exec().unwrap();

    assert_eq!(read.result().unwrap(), Some(b"1".to_vec()));
    assert_eq!(*touched.lock(), vec!["w", "z"]);
}

#[test]
fn unwrap_returns_the_inner_store() {
    let inner: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let store = Invalidator::new(Arc::clone(&inner), Arc::new(|_key: &str| {}));
    inner.set("foo", Value::from("bar")).unwrap();
    let unwrapped = store.unwrap_inner().unwrap();
    assert_eq!(unwrapped.get("foo").unwrap(), Some(b"bar".to_vec()));
}
