//! Basic operation sections of the conformance suite

use std::sync::Arc;

use polystore_core::{ScoredMember, Store, Value};

use crate::{sorted_texts, texts};

/// Scalar writes, conditional writes, and deletion.
pub fn test_scalars(store: &dyn Store) {
    // set / get round-trips every input kind to canonical bytes.
    store.set("text", Value::from("bar")).unwrap();
    assert_eq!(store.get("text").unwrap(), Some(b"bar".to_vec()));

    store.set("bytes", Value::from(&[0u8, 159, 146][..])).unwrap();
    assert_eq!(store.get("bytes").unwrap(), Some(vec![0, 159, 146]));

    store.set("int", Value::from(-42i64)).unwrap();
    assert_eq!(store.get("int").unwrap(), Some(b"-42".to_vec()));

    assert_eq!(store.get("missing").unwrap(), None);

    // set replaces, never merges.
    store.set("text", Value::from("baz")).unwrap();
    assert_eq!(store.get("text").unwrap(), Some(b"baz".to_vec()));

    // Idempotent set.
    store.set("text", Value::from("baz")).unwrap();
    assert_eq!(store.get("text").unwrap(), Some(b"baz".to_vec()));

    // delete returns whether the key existed.
    assert!(!store.delete("missing").unwrap());
    assert!(store.delete("text").unwrap());
    assert_eq!(store.get("text").unwrap(), None);
    assert!(!store.delete("text").unwrap());

    // set_nx writes only when absent.
    assert!(store.set_nx("nx", Value::from("first")).unwrap());
    assert!(!store.set_nx("nx", Value::from("second")).unwrap());
    assert_eq!(store.get("nx").unwrap(), Some(b"first".to_vec()));

    // set_xx writes only when present.
    assert!(!store.set_xx("xx", Value::from("nope")).unwrap());
    assert_eq!(store.get("xx").unwrap(), None);
    store.set("xx", Value::from("old")).unwrap();
    assert!(store.set_xx("xx", Value::from("new")).unwrap());
    assert_eq!(store.get("xx").unwrap(), Some(b"new".to_vec()));

    // set_eq compares canonical bytes.
    store.set("eq", Value::from(1i64)).unwrap();
    assert!(store.set_eq("eq", Value::from("two"), Value::from("1")).unwrap());
    assert_eq!(store.get("eq").unwrap(), Some(b"two".to_vec()));
    assert!(!store.set_eq("eq", Value::from("three"), Value::from("wrong")).unwrap());
    assert_eq!(store.get("eq").unwrap(), Some(b"two".to_vec()));
    assert!(!store.set_eq("eq-missing", Value::from("v"), Value::from("v")).unwrap());
}

/// Counter seeding and accumulation.
pub fn test_counter(store: &dyn Store) {
    // Seeds to n when absent.
    assert_eq!(store.n_incr_by("n", 1).unwrap(), 1);
    assert_eq!(store.get("n").unwrap(), Some(b"1".to_vec()));

    assert_eq!(store.n_incr_by("n", 2).unwrap(), 3);
    assert_eq!(store.get("n").unwrap(), Some(b"3".to_vec()));

    assert_eq!(store.n_incr_by("n", -5).unwrap(), -2);
    assert_eq!(store.get("n").unwrap(), Some(b"-2".to_vec()));

    // Counters share storage with scalars.
    store.set("preset", Value::from(10i64)).unwrap();
    assert_eq!(store.n_incr_by("preset", 2).unwrap(), 12);
}

/// Set membership.
pub fn test_sets(store: &dyn Store) {
    store.s_add("set", vec![Value::from("bar")]).unwrap();
    assert_eq!(texts(store.s_members("set").unwrap()), vec!["bar"]);

    // Adding twice keeps one copy.
    store.s_add("set", vec![Value::from("baz")]).unwrap();
    store.s_add("set", vec![Value::from("baz")]).unwrap();
    assert_eq!(sorted_texts(store.s_members("set").unwrap()), vec!["bar", "baz"]);

    // Multi-member add and remove.
    store
        .s_add("set", vec![Value::from("a"), Value::from("b")])
        .unwrap();
    store
        .s_rem("set", vec![Value::from("a"), Value::from("bar")])
        .unwrap();
    assert_eq!(sorted_texts(store.s_members("set").unwrap()), vec!["b", "baz"]);

    // Removing from a missing key is fine.
    store.s_rem("missing-set", vec![Value::from("x")]).unwrap();
    assert!(store.s_members("missing-set").unwrap().is_empty());

    // Removing the last member deletes the key entirely.
    store
        .s_rem("set", vec![Value::from("b"), Value::from("baz")])
        .unwrap();
    assert!(store.s_members("set").unwrap().is_empty());
    assert!(store.set_nx("set", Value::from("now-a-scalar")).unwrap());
    store.delete("set").unwrap();
}

/// Hash fields.
pub fn test_hashes(store: &dyn Store) {
    assert_eq!(store.h_get("h", "field").unwrap(), None);

    store
        .h_set(
            "h",
            vec![
                ("bar".to_owned(), Value::from("baz")),
                ("baz".to_owned(), Value::from("qux")),
            ],
        )
        .unwrap();
    assert_eq!(store.h_get("h", "bar").unwrap(), Some(b"baz".to_vec()));
    assert_eq!(store.h_get("h", "missing").unwrap(), None);

    let all = store.h_get_all("h").unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["bar"], b"baz".to_vec());
    assert_eq!(all["baz"], b"qux".to_vec());

    // Field replacement.
    store
        .h_set("h", vec![("bar".to_owned(), Value::from("new"))])
        .unwrap();
    assert_eq!(store.h_get("h", "bar").unwrap(), Some(b"new".to_vec()));

    // Deleting a missing field is fine; deleting the last field deletes
    // the key.
    store.h_del("h", vec!["missing".to_owned()]).unwrap();
    store
        .h_del("h", vec!["bar".to_owned(), "baz".to_owned()])
        .unwrap();
    assert!(store.h_get_all("h").unwrap().is_empty());
    assert!(store.set_nx("h", Value::from("now-a-scalar")).unwrap());
    store.delete("h").unwrap();
}

fn fill_mixed_scores(store: &dyn Store, key: &str) {
    for (member, score) in [
        ("-2", -2.0),
        ("-1", -1.0),
        ("-0.5", -0.5),
        ("0", 0.0),
        ("0.5", 0.5),
        ("0.5b", 0.5),
        ("1", 1.0),
        ("2", 2.0),
    ] {
        store.z_add(key, Value::from(member), score).unwrap();
    }
}

/// Score-ordered range scans over negative, zero, and positive scores.
pub fn test_score_ranges(store: &dyn Store) {
    fill_mixed_scores(store, "scores");

    assert_eq!(
        texts(store.z_range_by_score("scores", -0.5, 1.0, 0).unwrap()),
        vec!["-0.5", "0", "0.5", "0.5b", "1"]
    );
    assert_eq!(
        texts(store.z_range_by_score("scores", f64::NEG_INFINITY, 1.0, 0).unwrap()),
        vec!["-2", "-1", "-0.5", "0", "0.5", "0.5b", "1"]
    );
    assert_eq!(
        texts(store.z_range_by_score("scores", -0.5, f64::INFINITY, 0).unwrap()),
        vec!["-0.5", "0", "0.5", "0.5b", "1", "2"]
    );

    assert_eq!(
        texts(store.z_rev_range_by_score("scores", -0.5, 1.0, 0).unwrap()),
        vec!["1", "0.5b", "0.5", "0", "-0.5"]
    );
    assert_eq!(
        texts(store.z_rev_range_by_score("scores", f64::NEG_INFINITY, 1.0, 0).unwrap()),
        vec!["1", "0.5b", "0.5", "0", "-0.5", "-1", "-2"]
    );
    assert_eq!(
        texts(store.z_rev_range_by_score("scores", -0.5, f64::INFINITY, 0).unwrap()),
        vec!["2", "1", "0.5b", "0.5", "0", "-0.5"]
    );

    // A full unbounded scan enumerates every member exactly once.
    assert_eq!(
        texts(store.z_range_by_score("scores", f64::NEG_INFINITY, f64::INFINITY, 0).unwrap()),
        vec!["-2", "-1", "-0.5", "0", "0.5", "0.5b", "1", "2"]
    );

    // Scored variants carry the scores.
    assert_eq!(
        store.z_range_by_score_with_scores("scores", 0.5, 1.0, 0).unwrap(),
        vec![
            ScoredMember { score: 0.5, member: b"0.5".to_vec() },
            ScoredMember { score: 0.5, member: b"0.5b".to_vec() },
            ScoredMember { score: 1.0, member: b"1".to_vec() },
        ]
    );
    assert_eq!(
        store.z_rev_range_by_score_with_scores("scores", 0.5, 1.0, 0).unwrap(),
        vec![
            ScoredMember { score: 1.0, member: b"1".to_vec() },
            ScoredMember { score: 0.5, member: b"0.5b".to_vec() },
            ScoredMember { score: 0.5, member: b"0.5".to_vec() },
        ]
    );

    // z_count agrees with the unlimited range for every bound pair.
    for (min, max, expected) in [
        (-0.5, 1.0, 5),
        (f64::NEG_INFINITY, f64::INFINITY, 8),
        (0.5, 0.5, 2),
        (3.0, 4.0, 0),
        (f64::NEG_INFINITY, -1.0, 2),
    ] {
        assert_eq!(
            store.z_count("scores", min, max).unwrap(),
            expected,
            "z_count({min}, {max})"
        );
        assert_eq!(
            store.z_range_by_score("scores", min, max, 0).unwrap().len(),
            expected
        );
    }

    // Limits truncate; zero means unlimited.
    assert_eq!(
        texts(store.z_range_by_score("scores", f64::NEG_INFINITY, 1.0, 2).unwrap()),
        vec!["-2", "-1"]
    );
    assert_eq!(
        texts(store.z_rev_range_by_score("scores", f64::NEG_INFINITY, 1.0, 2).unwrap()),
        vec!["1", "0.5b"]
    );

    // Re-adding moves the member to its new score.
    store.z_add("moving", Value::from("foo"), 2.0).unwrap();
    assert_eq!(texts(store.z_range_by_score("moving", 1.5, 2.5, 0).unwrap()), vec!["foo"]);
    store.z_add("moving", Value::from("foo"), 3.0).unwrap();
    assert!(store.z_range_by_score("moving", 1.5, 2.5, 0).unwrap().is_empty());
    assert_eq!(texts(store.z_range_by_score("moving", 2.5, 3.5, 0).unwrap()), vec!["foo"]);

    // z_score reflects the last add; z_rem removes.
    assert_eq!(store.z_score("moving", Value::from("foo")).unwrap(), Some(3.0));
    assert_eq!(store.z_score("moving", Value::from("nope")).unwrap(), None);
    store.z_rem("moving", Value::from("foo")).unwrap();
    assert_eq!(store.z_score("moving", Value::from("foo")).unwrap(), None);
}

/// Lexicographical range scans over a zero-score sorted set.
pub fn test_lex_ranges(store: &dyn Store) {
    for member in ["a", "b", "c", "d"] {
        store.z_add("lex", Value::from(member), 0.0).unwrap();
    }

    let range = |min: &str, max: &str, limit: usize| {
        texts(store.z_range_by_lex("lex", min, max, limit).unwrap())
    };
    let rev_range = |min: &str, max: &str, limit: usize| {
        texts(store.z_rev_range_by_lex("lex", min, max, limit).unwrap())
    };

    assert_eq!(range("-", "+", 0), vec!["a", "b", "c", "d"]);
    assert_eq!(range("(a", "(d", 0), vec!["b", "c"]);
    assert_eq!(range("[a", "[d", 0), vec!["a", "b", "c", "d"]);
    assert_eq!(range("[b", "[c", 0), vec!["b", "c"]);
    assert_eq!(range("[b", "[b", 0), vec!["b"]);
    assert!(range("[z", "[z", 1).is_empty());
    assert!(range("(d", "(a", 0).is_empty());
    assert_eq!(range("-", "+", 2), vec!["a", "b"]);

    assert_eq!(rev_range("-", "+", 0), vec!["d", "c", "b", "a"]);
    assert_eq!(rev_range("(a", "(d", 0), vec!["c", "b"]);
    assert_eq!(rev_range("[a", "[d", 0), vec!["d", "c", "b", "a"]);
    assert_eq!(rev_range("[b", "[c", 0), vec!["c", "b"]);
    assert!(rev_range("[z", "[z", 1).is_empty());
    assert_eq!(rev_range("-", "+", 2), vec!["d", "c"]);

    // Count every bound-shape combination over sparse members.
    store.delete("lexcount").unwrap();
    for member in ["a", "c", "e", "g"] {
        store.z_add("lexcount", Value::from(member), 0.0).unwrap();
    }
    for (min, max, expected) in [
        ("[g", "[g", 1),
        ("[a", "[g", 4),
        ("(a", "[g", 3),
        ("[a", "(g", 3),
        ("[c", "[e", 2),
        ("[e", "(g", 1),
        ("(a", "[e", 2),
        ("[e", "[e", 1),
        ("[f", "[f", 0),
        ("[_", "[g", 4),
        ("[a", "[h", 4),
        ("-", "[e", 3),
        ("[c", "+", 3),
        ("-", "+", 4),
        ("[a", "(e", 2),
        ("[a", "(f", 3),
    ] {
        assert_eq!(
            store.z_lex_count("lexcount", min, max).unwrap(),
            expected,
            "z_lex_count({min:?}, {max:?})"
        );
    }

    // Malformed bounds are errors, not empty results.
    assert!(store.z_range_by_lex("lex", "a", "+", 0).is_err());
    assert!(store.z_rev_range_by_lex("lex", "-", "", 0).is_err());
    assert!(store.z_lex_count("lex", "bogus", "+").is_err());
}

/// Sorted hashes, including interchangeability with plain sorted sets.
pub fn test_sorted_hashes(store: &dyn Store) {
    store.zh_add("zh", b"f", Value::from("foo"), 1.0).unwrap();
    store.zh_add("zh", b"b", Value::from("bar"), 2.0).unwrap();

    // Range queries return member bytes, ordered by (score, field).
    assert_eq!(
        texts(store.z_range_by_score("zh", 0.0, 10.0, 0).unwrap()),
        vec!["foo", "bar"]
    );

    // The field is the identity: z_score looks it up, zh_rem removes it.
    assert_eq!(store.z_score("zh", Value::from("f")).unwrap(), Some(1.0));
    store.zh_rem("zh", b"b").unwrap();
    assert_eq!(texts(store.z_range_by_score("zh", 0.0, 10.0, 0).unwrap()), vec!["foo"]);

    // Re-adding a field replaces member and score in place.
    store.zh_add("zh", b"f", Value::from("renamed"), 5.0).unwrap();
    assert_eq!(store.z_score("zh", Value::from("f")).unwrap(), Some(5.0));
    assert_eq!(texts(store.z_range_by_score("zh", 4.0, 6.0, 0).unwrap()), vec!["renamed"]);
    assert_eq!(store.z_count("zh", 0.0, 10.0).unwrap(), 1);

    // Members added via z_add and zh_add interleave in one index: fields
    // a, b, c, d in lex order regardless of which operation added them.
    store.z_add("mixed", Value::from("a"), 0.0).unwrap();
    store.zh_add("mixed", b"b", Value::from("bob"), 0.0).unwrap();
    store.z_add("mixed", Value::from("c"), 0.0).unwrap();
    store.zh_add("mixed", b"d", Value::from("dan"), 0.0).unwrap();
    assert_eq!(
        texts(store.z_range_by_score("mixed", -0.5, 1.0, 0).unwrap()),
        vec!["a", "bob", "c", "dan"]
    );
    assert_eq!(
        texts(store.z_range_by_lex("mixed", "-", "+", 0).unwrap()),
        vec!["a", "bob", "c", "dan"]
    );
    assert_eq!(
        texts(store.z_rev_range_by_lex("mixed", "-", "+", 0).unwrap()),
        vec!["dan", "c", "bob", "a"]
    );

    // Removing the last entry deletes the key.
    store.zh_rem("zh", b"f").unwrap();
    assert_eq!(store.z_count("zh", f64::NEG_INFINITY, f64::INFINITY).unwrap(), 0);
    assert!(store.set_nx("zh", Value::from("now-a-scalar")).unwrap());
    store.delete("zh").unwrap();
}

/// Score increments, including concurrent writers.
pub fn test_z_incr_by(store: Arc<dyn Store>) {
    store.z_add("existing", Value::from("abc"), 0.5).unwrap();
    assert_eq!(store.z_incr_by("existing", Value::from("abc"), 1.0).unwrap(), 1.5);
    assert_eq!(texts(store.z_range_by_score("existing", 1.5, 1.5, 10).unwrap()), vec!["abc"]);
    assert!(store.z_range_by_score("existing", 0.0, 1.0, 10).unwrap().is_empty());

    // Missing member seeds at delta.
    assert_eq!(store.z_incr_by("missing", Value::from("bcd"), 1.0).unwrap(), 1.0);
    assert_eq!(texts(store.z_range_by_score("missing", 1.0, 1.0, 10).unwrap()), vec!["bcd"]);

    // Negative deltas cross zero.
    store.z_add("neg", Value::from("cde"), 0.5).unwrap();
    assert_eq!(store.z_incr_by("neg", Value::from("cde"), -1.0).unwrap(), -0.5);
    assert_eq!(texts(store.z_range_by_score("neg", -0.5, -0.5, 10).unwrap()), vec!["cde"]);

    // Concurrent increments all land.
    let threads: Vec<_> = (0..10)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..10 {
                    store.z_incr_by("contended", Value::from("foo"), 1.0).unwrap();
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    assert_eq!(store.z_score("contended", Value::from("foo")).unwrap(), Some(100.0));
}

/// Decorator plumbing every store must tolerate.
pub fn test_store_views(store: Arc<dyn Store>) {
    store.set("foo", Value::from("bar")).unwrap();

    // The eventually-consistent view observes writes eventually; for
    // in-process stores that means immediately.
    let relaxed = store.with_eventually_consistent_reads();
    assert_eq!(relaxed.get("foo").unwrap(), Some(b"bar".to_vec()));

    // Profiled views behave identically.
    let profiler = Arc::new(polystore_core::BasicProfiler::new());
    let profiled = store.with_profiler(profiler);
    assert_eq!(profiled.get("foo").unwrap(), Some(b"bar".to_vec()));
}
