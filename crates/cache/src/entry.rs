//! Cache entry shapes and sub-entry keys
//!
//! One entry per key, shaped by the kind of read that populated it. An
//! entry of the wrong shape for the current read is treated as a miss and
//! replaced wholesale; within the sorted shape, sub-entries accumulate
//! under `(op tag, min, max)` keys.
//!
//! Entries record the result, errors included, so a failing inner store
//! is not hammered by repeated reads of the same key.

use std::collections::HashMap;

use polystore_core::{ScoredMember, StoreResult};

#[derive(Clone)]
pub(crate) enum Entry {
    Get(StoreResult<Option<Vec<u8>>>),
    /// Per-field results accumulated by h_get misses.
    HashFields(HashMap<String, StoreResult<Option<Vec<u8>>>>),
    /// A full h_get_all result; supersedes `HashFields` and serves h_get.
    HashAll(StoreResult<HashMap<String, Vec<u8>>>),
    Members(StoreResult<Vec<Vec<u8>>>),
    /// Sorted-hash sub-entries keyed by [`sub_key`].
    Sorted(HashMap<Vec<u8>, SortedEntry>),
}

#[derive(Clone)]
pub(crate) enum SortedEntry {
    Score(StoreResult<Option<f64>>),
    Count(StoreResult<usize>),
    /// A cached range and the limit it was fetched with. Lex ranges are
    /// stored with zeroed scores; member-only reads drop the scores.
    Range {
        members: StoreResult<Vec<ScoredMember>>,
        limit: usize,
    },
}

/// Big-endian IEEE-754 bits: distinct for every distinct bound, including
/// -0.0 vs 0.0.
pub(crate) fn float_key(f: f64) -> [u8; 8] {
    f.to_bits().to_be_bytes()
}

/// Length-prefixed concatenation, so distinct part lists can never
/// collide.
pub(crate) fn sub_key(parts: &[&[u8]]) -> Vec<u8> {
    let mut key = Vec::with_capacity(parts.iter().map(|p| 8 + p.len()).sum());
    for part in parts {
        key.extend_from_slice(&(part.len() as u64).to_be_bytes());
        key.extend_from_slice(part);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_keys_do_not_collide() {
        // Same concatenated bytes, different splits.
        assert_ne!(sub_key(&[b"ab", b"c"]), sub_key(&[b"a", b"bc"]));
        assert_ne!(sub_key(&[b"zrbs", b"x"]), sub_key(&[b"zrrbs", b"x"]));
        assert_eq!(sub_key(&[b"zs", b"m"]), sub_key(&[b"zs", b"m"]));
    }

    #[test]
    fn test_float_keys_distinguish_zero_signs() {
        assert_ne!(float_key(0.0), float_key(-0.0));
        assert_eq!(float_key(1.5), float_key(1.5));
    }
}
