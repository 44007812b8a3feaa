//! Atomic write evaluation
//!
//! Sub-operations are staged as data, not closures: each variant knows its
//! condition and its write. `exec` takes the store mutex once, evaluates
//! every condition against the pre-commit state, records the per-op
//! outcomes, and only then applies the writes in submission order. The
//! whole transaction is one critical section, so nothing can interleave
//! between condition evaluation and the writes.

use tracing::debug;

use polystore_core::{
    AtomicWriteOperation, AtomicWriteResult, StoreError, StoreResult, Value,
    MAX_ATOMIC_WRITE_OPERATIONS,
};

use crate::state::State;
use crate::store::MemoryStore;

enum WriteOp {
    Set { key: String, value: Vec<u8> },
    SetNx { key: String, value: Vec<u8> },
    SetXx { key: String, value: Vec<u8> },
    SetEq { key: String, value: Vec<u8>, old: Vec<u8> },
    Delete { key: String },
    DeleteXx { key: String },
    NIncrBy { key: String, n: i64 },
    ZAdd { key: String, field: Vec<u8>, member: Vec<u8>, score: f64 },
    ZAddNx { key: String, member: Vec<u8>, score: f64 },
    ZRem { key: String, field: Vec<u8> },
    SAdd { key: String, members: Vec<Value> },
    SRem { key: String, members: Vec<Value> },
    HSet { key: String, entries: Vec<(String, Value)> },
    HSetNx { key: String, field: String, value: Vec<u8> },
    HDel { key: String, fields: Vec<String> },
}

impl WriteOp {
    fn condition_passes(&self, state: &State) -> bool {
        match self {
            WriteOp::SetNx { key, .. } => state.get(key).is_none(),
            WriteOp::SetXx { key, .. } | WriteOp::DeleteXx { key } => state.get(key).is_some(),
            WriteOp::SetEq { key, old, .. } => state.get(key) == Some(old.as_slice()),
            WriteOp::ZAddNx { key, member, .. } => state.z_score(key, member).is_none(),
            WriteOp::HSetNx { key, field, .. } => state.h_get(key, field).is_none(),
            _ => true,
        }
    }

    fn apply(self, state: &mut State) {
        match self {
            WriteOp::Set { key, value }
            | WriteOp::SetNx { key, value }
            | WriteOp::SetXx { key, value }
            | WriteOp::SetEq { key, value, .. } => state.set(&key, Value::Bytes(value)),
            WriteOp::Delete { key } | WriteOp::DeleteXx { key } => {
                state.delete(&key);
            }
            WriteOp::NIncrBy { key, n } => {
                // No per-op error channel exists after commit; a malformed
                // stored value is left untouched.
                let _ = state.n_incr_by(&key, n);
            }
            WriteOp::ZAdd {
                key,
                field,
                member,
                score,
            } => state.zh_add(&key, &field, member, score),
            WriteOp::ZAddNx { key, member, score } => {
                let field = member.clone();
                state.zh_add(&key, &field, member, score);
            }
            WriteOp::ZRem { key, field } => state.zh_rem(&key, &field),
            WriteOp::SAdd { key, members } => state.s_add(&key, members),
            WriteOp::SRem { key, members } => state.s_rem(&key, members),
            WriteOp::HSet { key, entries } => state.h_set(&key, entries),
            WriteOp::HSetNx { key, field, value } => {
                state.h_set(&key, vec![(field, Value::Bytes(value))]);
            }
            WriteOp::HDel { key, fields } => state.h_del(&key, &fields),
        }
    }
}

struct StagedWrite {
    op: WriteOp,
    result: AtomicWriteResult,
}

pub(crate) struct MemoryAtomicWrite {
    store: MemoryStore,
    staged: Vec<StagedWrite>,
}

impl MemoryAtomicWrite {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            staged: Vec::new(),
        }
    }

    fn stage(&mut self, op: WriteOp) -> AtomicWriteResult {
        let result = AtomicWriteResult::new();
        self.staged.push(StagedWrite {
            op,
            result: result.clone(),
        });
        result
    }
}

impl AtomicWriteOperation for MemoryAtomicWrite {
    fn set(&mut self, key: &str, value: Value) -> AtomicWriteResult {
        self.stage(WriteOp::Set {
            key: key.to_owned(),
            value: value.into_bytes(),
        })
    }

    fn set_nx(&mut self, key: &str, value: Value) -> AtomicWriteResult {
        self.stage(WriteOp::SetNx {
            key: key.to_owned(),
            value: value.into_bytes(),
        })
    }

    fn set_xx(&mut self, key: &str, value: Value) -> AtomicWriteResult {
        self.stage(WriteOp::SetXx {
            key: key.to_owned(),
            value: value.into_bytes(),
        })
    }

    fn set_eq(&mut self, key: &str, value: Value, old_value: Value) -> AtomicWriteResult {
        self.stage(WriteOp::SetEq {
            key: key.to_owned(),
            value: value.into_bytes(),
            old: old_value.into_bytes(),
        })
    }

    fn delete(&mut self, key: &str) -> AtomicWriteResult {
        self.stage(WriteOp::Delete {
            key: key.to_owned(),
        })
    }

    fn delete_xx(&mut self, key: &str) -> AtomicWriteResult {
        self.stage(WriteOp::DeleteXx {
            key: key.to_owned(),
        })
    }

    fn n_incr_by(&mut self, key: &str, n: i64) -> AtomicWriteResult {
        self.stage(WriteOp::NIncrBy {
            key: key.to_owned(),
            n,
        })
    }

    fn z_add(&mut self, key: &str, member: Value, score: f64) -> AtomicWriteResult {
        let field = member.into_bytes();
        self.stage(WriteOp::ZAdd {
            key: key.to_owned(),
            member: field.clone(),
            field,
            score,
        })
    }

    fn z_add_nx(&mut self, key: &str, member: Value, score: f64) -> AtomicWriteResult {
        self.stage(WriteOp::ZAddNx {
            key: key.to_owned(),
            member: member.into_bytes(),
            score,
        })
    }

    fn z_rem(&mut self, key: &str, member: Value) -> AtomicWriteResult {
        self.stage(WriteOp::ZRem {
            key: key.to_owned(),
            field: member.into_bytes(),
        })
    }

    fn zh_add(&mut self, key: &str, field: &[u8], member: Value, score: f64) -> AtomicWriteResult {
        self.stage(WriteOp::ZAdd {
            key: key.to_owned(),
            field: field.to_vec(),
            member: member.into_bytes(),
            score,
        })
    }

    fn zh_rem(&mut self, key: &str, field: &[u8]) -> AtomicWriteResult {
        self.stage(WriteOp::ZRem {
            key: key.to_owned(),
            field: field.to_vec(),
        })
    }

    fn s_add(&mut self, key: &str, members: Vec<Value>) -> AtomicWriteResult {
        self.stage(WriteOp::SAdd {
            key: key.to_owned(),
            members,
        })
    }

    fn s_rem(&mut self, key: &str, members: Vec<Value>) -> AtomicWriteResult {
        self.stage(WriteOp::SRem {
            key: key.to_owned(),
            members,
        })
    }

    fn h_set(&mut self, key: &str, entries: Vec<(String, Value)>) -> AtomicWriteResult {
        self.stage(WriteOp::HSet {
            key: key.to_owned(),
            entries,
        })
    }

    fn h_set_nx(&mut self, key: &str, field: &str, value: Value) -> AtomicWriteResult {
        self.stage(WriteOp::HSetNx {
            key: key.to_owned(),
            field: field.to_owned(),
            value: value.into_bytes(),
        })
    }

    fn h_del(&mut self, key: &str, fields: Vec<String>) -> AtomicWriteResult {
        self.stage(WriteOp::HDel {
            key: key.to_owned(),
            fields,
        })
    }

    fn exec(self: Box<Self>) -> StoreResult<bool> {
        let MemoryAtomicWrite { store, staged } = *self;

        if staged.len() > MAX_ATOMIC_WRITE_OPERATIONS {
            return Err(StoreError::MaxOperationCountExceeded);
        }

        let mut state = store.state.lock();

        let mut all_passed = true;
        for write in &staged {
            let passed = write.op.condition_passes(&state);
            write.result.record_condition(passed);
            all_passed &= passed;
        }

        if !all_passed {
            debug!(ops = staged.len(), "atomic write aborted by failed condition");
            return Ok(false);
        }

        let ops = staged.len();
        for write in staged {
            write.op.apply(&mut state);
        }
        debug!(ops, "atomic write committed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::Store;

    #[test]
    fn test_conditions_see_pre_transaction_state() {
        let store = MemoryStore::new();

        // set_nx and a set on the same key in one transaction: the
        // condition must not observe the staged write.
        let mut tx = store.atomic_write();
        let first = tx.set_nx("foo", Value::from("a"));
        let second = tx.set_nx("foo", Value::from("b"));
        assert!(tx.exec().unwrap());
        assert!(!first.conditional_failed());
        assert!(!second.conditional_failed());
        // Both conditions passed against the empty state; writes applied
        // in order, so the second wins.
        assert_eq!(store.get("foo").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn test_failed_condition_applies_nothing() {
        let store = MemoryStore::new();
        store.set("foo", Value::from("bar")).unwrap();

        let mut tx = store.atomic_write();
        let failing = tx.set_nx("foo", Value::from("bar"));
        let passing = tx.set("baz", Value::from("qux"));
        assert!(!tx.exec().unwrap());
        assert!(failing.conditional_failed());
        assert!(!passing.conditional_failed());
        assert_eq!(store.get("baz").unwrap(), None);
    }

    #[test]
    fn test_operation_cap() {
        let store = MemoryStore::new();

        let mut tx = store.atomic_write();
        for i in 0..=MAX_ATOMIC_WRITE_OPERATIONS {
            tx.set(&format!("key:{i}"), Value::from("v"));
        }
        assert!(matches!(
            tx.exec(),
            Err(StoreError::MaxOperationCountExceeded)
        ));
        assert_eq!(store.get("key:0").unwrap(), None);

        // Exactly the cap is fine.
        let mut tx = store.atomic_write();
        for i in 0..MAX_ATOMIC_WRITE_OPERATIONS {
            tx.set(&format!("key:{i}"), Value::from("v"));
        }
        assert!(tx.exec().unwrap());
    }
}
