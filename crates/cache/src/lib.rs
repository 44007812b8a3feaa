//! Read cache for polystore
//!
//! [`ReadCache`] memoizes reads permanently, or until a write through the
//! cache invalidates the key. Entries record errors as well as values, so
//! repeated reads of a failing key do not amplify load on the inner store.
//!
//! Two planes exist side by side: the strong cache and an
//! eventually-consistent one. `with_eventually_consistent_reads` derives a
//! cache that reads and writes only the eventually-consistent plane,
//! backed by the inner store's own eventually-consistent view, so relaxed
//! reads never contaminate strict ones. Writes invalidate the key in both
//! planes.
//!
//! Concurrent misses on one key may each consult the inner store; the
//! last writer wins. That is sound: whatever lands is either fresh enough
//! or about to be invalidated by the write that changed it.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod batch;
mod entry;

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use polystore_core::{
    AtomicWriteOperation, Batch, Profiler, ScoredMember, Store, StoreResult, Value,
};
use polystore_invalidator::Invalidator;

use crate::batch::CacheBatch;
use crate::entry::{float_key, sub_key, Entry, SortedEntry};

type Plane = DashMap<String, Entry>;

/// Memoizing decorator over any store.
#[derive(Clone)]
pub struct ReadCache {
    inner: Arc<dyn Store>,
    cache: Arc<Plane>,
    eventually_consistent_cache: Arc<Plane>,
    eventually_consistent_reads: bool,
}

impl ReadCache {
    /// Wraps `inner` with fresh cache planes.
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            cache: Arc::new(DashMap::new()),
            eventually_consistent_cache: Arc::new(DashMap::new()),
            eventually_consistent_reads: false,
        }
    }

    /// A cache over a different inner store that shares this one's planes.
    pub fn with_backend(&self, inner: Arc<dyn Store>) -> ReadCache {
        Self {
            inner,
            ..self.clone()
        }
    }

    /// True when the strong plane holds an entry for `key`.
    pub fn has_key_cached(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Drops `key` from both planes.
    pub fn invalidate(&self, key: &str) {
        trace!(key, "invalidating cached reads");
        self.cache.remove(key);
        self.eventually_consistent_cache.remove(key);
    }

    /// Drops every entry from both planes.
    pub fn invalidate_all(&self) {
        self.cache.clear();
        self.eventually_consistent_cache.clear();
    }

    fn plane(&self) -> &Plane {
        if self.eventually_consistent_reads {
            &self.eventually_consistent_cache
        } else {
            &self.cache
        }
    }

    pub(crate) fn load(&self, key: &str) -> Option<Entry> {
        self.plane().get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn store_entry(&self, key: &str, entry: Entry) {
        self.plane().insert(key.to_owned(), entry);
    }

    pub(crate) fn load_sorted_sub(&self, key: &str, subkey: &[u8]) -> Option<SortedEntry> {
        match self.load(key) {
            Some(Entry::Sorted(subs)) => subs.get(subkey).cloned(),
            _ => None,
        }
    }

    pub(crate) fn store_sorted_sub(&self, key: &str, subkey: Vec<u8>, sub: SortedEntry) {
        use dashmap::mapref::entry::Entry as MapEntry;
        match self.plane().entry(key.to_owned()) {
            MapEntry::Occupied(mut occupied) => {
                if let Entry::Sorted(subs) = occupied.get_mut() {
                    subs.insert(subkey, sub);
                } else {
                    *occupied.get_mut() = Entry::Sorted(HashMap::from([(subkey, sub)]));
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::Sorted(HashMap::from([(subkey, sub)])));
            }
        }
    }

    fn merge_hash_field(&self, key: &str, field: &str, result: StoreResult<Option<Vec<u8>>>) {
        use dashmap::mapref::entry::Entry as MapEntry;
        match self.plane().entry(key.to_owned()) {
            MapEntry::Occupied(mut occupied) => {
                if let Entry::HashFields(fields) = occupied.get_mut() {
                    fields.insert(field.to_owned(), result);
                } else {
                    *occupied.get_mut() =
                        Entry::HashFields(HashMap::from([(field.to_owned(), result)]));
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::HashFields(HashMap::from([(field.to_owned(), result)])));
            }
        }
    }

    /// Serves a cached range when its limit subsumes the request's; the
    /// rule is the literal `limit <= cached_limit` of the contract, with
    /// 0 meaning unlimited on both sides.
    fn cached_range(
        &self,
        key: &str,
        subkey: Vec<u8>,
        limit: usize,
        fetch: impl FnOnce() -> StoreResult<Vec<ScoredMember>>,
    ) -> StoreResult<Vec<ScoredMember>> {
        if let Some(SortedEntry::Range {
            members,
            limit: cached_limit,
        }) = self.load_sorted_sub(key, &subkey)
        {
            if limit <= cached_limit {
                return members;
            }
        }
        let result = fetch();
        self.store_sorted_sub(
            key,
            subkey,
            SortedEntry::Range {
                members: result.clone(),
                limit,
            },
        );
        result
    }
}

impl Store for ReadCache {
    fn batch(&self) -> Box<dyn Batch> {
        Box::new(CacheBatch::new(self.clone(), self.inner.batch()))
    }

    fn atomic_write(&self) -> Box<dyn AtomicWriteOperation> {
        let cache = self.clone();
        Invalidator::new(
            Arc::clone(&self.inner),
            Arc::new(move |key: &str| cache.invalidate(key)),
        )
        .atomic_write()
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if let Some(Entry::Get(result)) = self.load(key) {
            return result;
        }
        let result = self.inner.get(key);
        self.store_entry(key, Entry::Get(result.clone()));
        result
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let result = self.inner.set(key, value);
        self.invalidate(key);
        result
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let result = self.inner.delete(key);
        self.invalidate(key);
        result
    }

    fn set_nx(&self, key: &str, value: Value) -> StoreResult<bool> {
        let result = self.inner.set_nx(key, value);
        self.invalidate(key);
        result
    }

    fn set_xx(&self, key: &str, value: Value) -> StoreResult<bool> {
        let result = self.inner.set_xx(key, value);
        self.invalidate(key);
        result
    }

    fn set_eq(&self, key: &str, value: Value, old_value: Value) -> StoreResult<bool> {
        let result = self.inner.set_eq(key, value, old_value);
        self.invalidate(key);
        result
    }

    fn n_incr_by(&self, key: &str, n: i64) -> StoreResult<i64> {
        let result = self.inner.n_incr_by(key, n);
        self.invalidate(key);
        result
    }

    fn s_add(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        let result = self.inner.s_add(key, members);
        self.invalidate(key);
        result
    }

    fn s_rem(&self, key: &str, members: Vec<Value>) -> StoreResult<()> {
        let result = self.inner.s_rem(key, members);
        self.invalidate(key);
        result
    }

    fn s_members(&self, key: &str) -> StoreResult<Vec<Vec<u8>>> {
        if let Some(Entry::Members(result)) = self.load(key) {
            return result;
        }
        let result = self.inner.s_members(key);
        self.store_entry(key, Entry::Members(result.clone()));
        result
    }

    fn h_set(&self, key: &str, entries: Vec<(String, Value)>) -> StoreResult<()> {
        let result = self.inner.h_set(key, entries);
        self.invalidate(key);
        result
    }

    fn h_del(&self, key: &str, fields: Vec<String>) -> StoreResult<()> {
        let result = self.inner.h_del(key, fields);
        self.invalidate(key);
        result
    }

    fn h_get(&self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.load(key) {
            Some(Entry::HashAll(Ok(fields))) => return Ok(fields.get(field).cloned()),
            Some(Entry::HashAll(Err(err))) => return Err(err),
            Some(Entry::HashFields(fields)) => {
                if let Some(result) = fields.get(field) {
                    return result.clone();
                }
            }
            _ => {}
        }
        let result = self.inner.h_get(key, field);
        self.merge_hash_field(key, field, result.clone());
        result
    }

    fn h_get_all(&self, key: &str) -> StoreResult<HashMap<String, Vec<u8>>> {
        if let Some(Entry::HashAll(result)) = self.load(key) {
            return result;
        }
        let result = self.inner.h_get_all(key);
        self.store_entry(key, Entry::HashAll(result.clone()));
        result
    }

    fn zh_add(&self, key: &str, field: &[u8], member: Value, score: f64) -> StoreResult<()> {
        let result = self.inner.zh_add(key, field, member, score);
        self.invalidate(key);
        result
    }

    fn zh_rem(&self, key: &str, field: &[u8]) -> StoreResult<()> {
        let result = self.inner.zh_rem(key, field);
        self.invalidate(key);
        result
    }

    fn z_score(&self, key: &str, field: Value) -> StoreResult<Option<f64>> {
        let field = field.into_bytes();
        let subkey = sub_key(&[b"zs", &field]);
        if let Some(SortedEntry::Score(result)) = self.load_sorted_sub(key, &subkey) {
            return result;
        }
        let result = self.inner.z_score(key, Value::Bytes(field));
        self.store_sorted_sub(key, subkey, SortedEntry::Score(result.clone()));
        result
    }

    fn z_incr_by(&self, key: &str, member: Value, delta: f64) -> StoreResult<f64> {
        let result = self.inner.z_incr_by(key, member, delta);
        self.invalidate(key);
        result
    }

    fn z_count(&self, key: &str, min: f64, max: f64) -> StoreResult<usize> {
        let subkey = sub_key(&[b"zc", &float_key(min), &float_key(max)]);
        if let Some(SortedEntry::Count(result)) = self.load_sorted_sub(key, &subkey) {
            return result;
        }
        let result = self.inner.z_count(key, min, max);
        self.store_sorted_sub(key, subkey, SortedEntry::Count(result.clone()));
        result
    }

    fn z_lex_count(&self, key: &str, min: &str, max: &str) -> StoreResult<usize> {
        let subkey = sub_key(&[b"zlc", min.as_bytes(), max.as_bytes()]);
        if let Some(SortedEntry::Count(result)) = self.load_sorted_sub(key, &subkey) {
            return result;
        }
        let result = self.inner.z_lex_count(key, min, max);
        self.store_sorted_sub(key, subkey, SortedEntry::Count(result.clone()));
        result
    }

    fn z_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        let subkey = sub_key(&[b"zrbs", &float_key(min), &float_key(max)]);
        self.cached_range(key, subkey, limit, || {
            self.inner.z_range_by_score_with_scores(key, min, max, limit)
        })
    }

    fn z_rev_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: usize,
    ) -> StoreResult<Vec<ScoredMember>> {
        let subkey = sub_key(&[b"zrrbs", &float_key(min), &float_key(max)]);
        self.cached_range(key, subkey, limit, || {
            self.inner
                .z_rev_range_by_score_with_scores(key, min, max, limit)
        })
    }

    fn z_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> StoreResult<Vec<Vec<u8>>> {
        let subkey = sub_key(&[b"zrbl", min.as_bytes(), max.as_bytes()]);
        let members = self.cached_range(key, subkey, limit, || {
            Ok(self
                .inner
                .z_range_by_lex(key, min, max, limit)?
                .into_iter()
                .map(|member| ScoredMember { score: 0.0, member })
                .collect())
        })?;
        Ok(members.into_iter().map(|m| m.member).collect())
    }

    fn z_rev_range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> StoreResult<Vec<Vec<u8>>> {
        let subkey = sub_key(&[b"zrrbl", min.as_bytes(), max.as_bytes()]);
        let members = self.cached_range(key, subkey, limit, || {
            Ok(self
                .inner
                .z_rev_range_by_lex(key, min, max, limit)?
                .into_iter()
                .map(|member| ScoredMember { score: 0.0, member })
                .collect())
        })?;
        Ok(members.into_iter().map(|m| m.member).collect())
    }

    fn with_eventually_consistent_reads(&self) -> Arc<dyn Store> {
        if self.eventually_consistent_reads {
            return Arc::new(self.clone());
        }
        Arc::new(Self {
            inner: self.inner.with_eventually_consistent_reads(),
            cache: Arc::clone(&self.cache),
            eventually_consistent_cache: Arc::clone(&self.eventually_consistent_cache),
            eventually_consistent_reads: true,
        })
    }

    fn with_profiler(&self, profiler: Arc<dyn Profiler>) -> Arc<dyn Store> {
        Arc::new(Self {
            inner: self.inner.with_profiler(profiler),
            ..self.clone()
        })
    }

    fn unwrap_inner(&self) -> Option<Arc<dyn Store>> {
        Some(Arc::clone(&self.inner))
    }
}
