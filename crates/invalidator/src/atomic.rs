//! Atomic writes through the invalidator
//!
//! Every sub-operation records its key; after `exec`, all recorded keys
//! are reported regardless of the outcome. If the transaction was not
//! committed, one of the values was probably not what the client expected
//! and they will want to refetch it before retrying.

use polystore_core::{AtomicWriteOperation, AtomicWriteResult, StoreResult, Value};

use crate::Invalidator;

pub(crate) struct InvalidatorAtomicWrite {
    invalidator: Invalidator,
    inner: Box<dyn AtomicWriteOperation>,
    invalidations: Vec<String>,
}

impl InvalidatorAtomicWrite {
    pub fn new(invalidator: Invalidator, inner: Box<dyn AtomicWriteOperation>) -> Self {
        Self {
            invalidator,
            inner,
            invalidations: Vec::new(),
        }
    }

    fn touch(&mut self, key: &str) {
        self.invalidations.push(key.to_owned());
    }
}

impl AtomicWriteOperation for InvalidatorAtomicWrite {
    fn set(&mut self, key: &str, value: Value) -> AtomicWriteResult {
        self.touch(key);
        self.inner.set(key, value)
    }

    fn set_nx(&mut self, key: &str, value: Value) -> AtomicWriteResult {
        self.touch(key);
        self.inner.set_nx(key, value)
    }

    fn set_xx(&mut self, key: &str, value: Value) -> AtomicWriteResult {
        self.touch(key);
        self.inner.set_xx(key, value)
    }

    fn set_eq(&mut self, key: &str, value: Value, old_value: Value) -> AtomicWriteResult {
        self.touch(key);
        self.inner.set_eq(key, value, old_value)
    }

    fn delete(&mut self, key: &str) -> AtomicWriteResult {
        self.touch(key);
        self.inner.delete(key)
    }

    fn delete_xx(&mut self, key: &str) -> AtomicWriteResult {
        self.touch(key);
        self.inner.delete_xx(key)
    }

    fn n_incr_by(&mut self, key: &str, n: i64) -> AtomicWriteResult {
        self.touch(key);
        self.inner.n_incr_by(key, n)
    }

    fn z_add(&mut self, key: &str, member: Value, score: f64) -> AtomicWriteResult {
        self.touch(key);
        self.inner.z_add(key, member, score)
    }

    fn z_add_nx(&mut self, key: &str, member: Value, score: f64) -> AtomicWriteResult {
        self.touch(key);
        self.inner.z_add_nx(key, member, score)
    }

    fn z_rem(&mut self, key: &str, member: Value) -> AtomicWriteResult {
        self.touch(key);
        self.inner.z_rem(key, member)
    }

    fn zh_add(&mut self, key: &str, field: &[u8], member: Value, score: f64) -> AtomicWriteResult {
        self.touch(key);
        self.inner.zh_add(key, field, member, score)
    }

    fn zh_rem(&mut self, key: &str, field: &[u8]) -> AtomicWriteResult {
        self.touch(key);
        self.inner.zh_rem(key, field)
    }

    fn s_add(&mut self, key: &str, members: Vec<Value>) -> AtomicWriteResult {
        self.touch(key);
        self.inner.s_add(key, members)
    }

    fn s_rem(&mut self, key: &str, members: Vec<Value>) -> AtomicWriteResult {
        self.touch(key);
        self.inner.s_rem(key, members)
    }

    fn h_set(&mut self, key: &str, entries: Vec<(String, Value)>) -> AtomicWriteResult {
        self.touch(key);
        self.inner.h_set(key, entries)
    }

    fn h_set_nx(&mut self, key: &str, field: &str, value: Value) -> AtomicWriteResult {
        self.touch(key);
        self.inner.h_set_nx(key, field, value)
    }

    fn h_del(&mut self, key: &str, fields: Vec<String>) -> AtomicWriteResult {
        self.touch(key);
        self.inner.h_del(key, fields)
    }

    fn exec(self: Box<Self>) -> StoreResult<bool> {
        let InvalidatorAtomicWrite {
            invalidator,
            inner,
            invalidations,
        } = *self;
        let result = inner.exec();
        for key in &invalidations {
            invalidator.invalidate(key);
        }
        result
    }
}
