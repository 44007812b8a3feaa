//! Batches through the read cache
//!
//! Reads are not checked against the cache at staging time: they queue up
//! and consult it when `exec` runs, so a read staged before a cache fill
//! still benefits from it. Misses are forwarded to the inner batch, and
//! their results are written back to the cache afterwards. Writes pass
//! through and invalidate their keys after `exec`.
//!
//! A cached error short-circuits the whole batch the same way a cached
//! error short-circuits a direct read: nothing is forwarded and the error
//! is returned.

use polystore_core::{
    Batch, BatchGetResult, BatchMembersResult, BatchScoreResult, BatchWriteResult, StoreError,
    StoreResult, Value,
};

use crate::entry::{sub_key, Entry, SortedEntry};
use crate::ReadCache;

enum QueuedRead {
    Get {
        key: String,
        handle: BatchGetResult,
    },
    Members {
        key: String,
        handle: BatchMembersResult,
    },
    Score {
        key: String,
        field: Vec<u8>,
        handle: BatchScoreResult,
    },
}

enum PendingMiss {
    Get {
        key: String,
        dest: BatchGetResult,
        source: BatchGetResult,
    },
    Members {
        key: String,
        dest: BatchMembersResult,
        source: BatchMembersResult,
    },
    Score {
        key: String,
        field: Vec<u8>,
        dest: BatchScoreResult,
        source: BatchScoreResult,
    },
}

pub(crate) struct CacheBatch {
    cache: ReadCache,
    inner: Box<dyn Batch>,
    reads: Vec<QueuedRead>,
    invalidations: Vec<String>,
}

impl CacheBatch {
    pub fn new(cache: ReadCache, inner: Box<dyn Batch>) -> Self {
        Self {
            cache,
            inner,
            reads: Vec::new(),
            invalidations: Vec::new(),
        }
    }
}

impl Batch for CacheBatch {
    fn get(&mut self, key: &str) -> BatchGetResult {
        let handle = BatchGetResult::new();
        self.reads.push(QueuedRead::Get {
            key: key.to_owned(),
            handle: handle.clone(),
        });
        handle
    }

    fn s_members(&mut self, key: &str) -> BatchMembersResult {
        let handle = BatchMembersResult::new();
        self.reads.push(QueuedRead::Members {
            key: key.to_owned(),
            handle: handle.clone(),
        });
        handle
    }

    fn z_score(&mut self, key: &str, field: Value) -> BatchScoreResult {
        let handle = BatchScoreResult::new();
        self.reads.push(QueuedRead::Score {
            key: key.to_owned(),
            field: field.into_bytes(),
            handle: handle.clone(),
        });
        handle
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
        let CacheBatch {
            cache,
            mut inner,
            reads,
            invalidations,
        } = *self;

        let mut first_error: Option<StoreError> = None;
        let mut pending: Vec<PendingMiss> = Vec::new();

        for read in reads {
            match read {
                QueuedRead::Get { key, handle } => {
                    if let Some(Entry::Get(result)) = cache.load(&key) {
                        if first_error.is_none() {
                            if let Err(err) = &result {
                                first_error = Some(err.clone());
                            }
                        }
                        handle.resolve(result);
                    } else {
                        let source = inner.get(&key);
                        pending.push(PendingMiss::Get {
                            key,
                            dest: handle,
                            source,
                        });
                    }
                }
                QueuedRead::Members { key, handle } => {
                    if let Some(Entry::Members(result)) = cache.load(&key) {
                        if first_error.is_none() {
                            if let Err(err) = &result {
                                first_error = Some(err.clone());
                            }
                        }
                        handle.resolve(result);
                    } else {
                        let source = inner.s_members(&key);
                        pending.push(PendingMiss::Members {
                            key,
                            dest: handle,
                            source,
                        });
                    }
                }
                QueuedRead::Score { key, field, handle } => {
                    let subkey = sub_key(&[b"zs", &field]);
                    if let Some(SortedEntry::Score(result)) = cache.load_sorted_sub(&key, &subkey) {
                        if first_error.is_none() {
                            if let Err(err) = &result {
                                first_error = Some(err.clone());
                            }
                        }
                        handle.resolve(result);
                    } else {
                        let source = inner.z_score(&key, Value::Bytes(field.clone()));
                        pending.push(PendingMiss::Score {
                            key,
                            field,
                            dest: handle,
                            source,
                        });
                    }
                }
            }
        }

        if first_error.is_some() || (pending.is_empty() && invalidations.is_empty()) {
            return match first_error {
                Some(err) => Err(err),
                None => Ok(()),
            };
        }

        let exec_result = inner.exec();

        for miss in pending {
            match miss {
                PendingMiss::Get { key, dest, source } => {
                    let result = source.result();
                    cache.store_entry(&key, Entry::Get(result.clone()));
                    dest.resolve(result);
                }
                PendingMiss::Members { key, dest, source } => {
                    let result = source.result();
                    cache.store_entry(&key, Entry::Members(result.clone()));
                    dest.resolve(result);
                }
                PendingMiss::Score {
                    key,
                    field,
                    dest,
                    source,
                } => {
                    let result = source.result();
                    cache.store_sorted_sub(
                        &key,
                        sub_key(&[b"zs", &field]),
                        SortedEntry::Score(result.clone()),
                    );
                    dest.resolve(result);
                }
            }
        }

        for key in &invalidations {
            cache.invalidate(key);
        }

        exec_result
    }
}
