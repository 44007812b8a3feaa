//! Batches through the invalidator
//!
//! Reads pass straight through to the inner batch; writes additionally
//! record their key, reported after `exec`.

use polystore_core::{
    Batch, BatchGetResult, BatchMembersResult, BatchScoreResult, BatchWriteResult, StoreResult,
    Value,
};

use crate::Invalidator;

pub(crate) struct InvalidatorBatch {
    invalidator: Invalidator,
    inner: Box<dyn Batch>,
    invalidations: Vec<String>,
}

impl InvalidatorBatch {
    pub fn new(invalidator: Invalidator, inner: Box<dyn Batch>) -> Self {
        Self {
            invalidator,
            inner,
            invalidations: Vec::new(),
        }
    }
}

impl Batch for InvalidatorBatch {
    fn get(&mut self, key: &str) -> BatchGetResult {
        self.inner.get(key)
    }

    fn s_members(&mut self, key: &str) -> BatchMembersResult {
        self.inner.s_members(key)
    }

    fn z_score(&mut self, key: &str, field: Value) -> BatchScoreResult {
        self.inner.z_score(key, field)
    }

    fn set(&mut self, key: &str, value: Value) -> BatchWriteResult {
        self.invalidations.push(key.to_owned());
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &str) -> BatchWriteResult {
        self.invalidations.push(key.to_owned());
        self.inner.delete(key)
    }

    fn s_add(&mut self, key: &str, members: Vec<Value>) -> BatchWriteResult {
        self.invalidations.push(key.to_owned());
        self.inner.s_add(key, members)
    }

    fn s_rem(&mut self, key: &str, members: Vec<Value>) -> BatchWriteResult {
        self.invalidations.push(key.to_owned());
        self.inner.s_rem(key, members)
    }

    fn z_add(&mut self, key: &str, member: Value, score: f64) -> BatchWriteResult {
        self.invalidations.push(key.to_owned());
        self.inner.z_add(key, member, score)
    }

    fn z_rem(&mut self, key: &str, member: Value) -> BatchWriteResult {
        self.invalidations.push(key.to_owned());
        self.inner.z_rem(key, member)
    }

    fn exec(self: Box<Self>) -> StoreResult<()> {
        let InvalidatorBatch {
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
