//! Sorted-hash representation
//!
//! Two structures kept consistent under every mutation:
//! - `scores`: field → score, for O(1) score lookups and replacement
//! - `index`: `sort_key(score) ∥ field` → member bytes, ordered, for
//!   score and lex range scans
//!
//! Lex queries read the slice of the index whose keys start with
//! `sort_key(0.0)`; the contract requires lex-queried members to have been
//! added with score zero.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use polystore_core::lex::LexBound;
use polystore_core::sort_key::{sort_key, sort_key_after, sort_key_score, SORT_KEY_LEN};
use polystore_core::ScoredMember;

fn index_key(score: f64, field: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(SORT_KEY_LEN + field.len());
    key.extend_from_slice(&sort_key(score));
    key.extend_from_slice(field);
    key
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SortedHash {
    scores: HashMap<Vec<u8>, f64>,
    index: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl SortedHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score(&self, field: &[u8]) -> Option<f64> {
        self.scores.get(field).copied()
    }

    /// Adds or replaces an entry. The previous score's index entry is
    /// removed first so the member appears exactly once.
    pub fn insert(&mut self, field: &[u8], member: Vec<u8>, score: f64) {
        if let Some(previous) = self.scores.get(field) {
            self.index.remove(&index_key(*previous, field));
        }
        self.index.insert(index_key(score, field), member);
        self.scores.insert(field.to_vec(), score);
    }

    /// Adds `delta` to the field's score, seeding at `delta` if absent.
    /// Returns the new score.
    pub fn increment(&mut self, field: &[u8], member: Vec<u8>, delta: f64) -> f64 {
        let score = match self.scores.get(field) {
            Some(previous) => previous + delta,
            None => delta,
        };
        self.insert(field, member, score);
        score
    }

    /// Removes an entry by field. Returns whether it existed.
    pub fn remove(&mut self, field: &[u8]) -> bool {
        match self.scores.remove(field) {
            Some(previous) => {
                self.index.remove(&index_key(previous, field));
                true
            }
            None => false,
        }
    }

    pub fn range_by_score(&self, min: f64, max: f64, limit: usize) -> Vec<ScoredMember> {
        let min_key = sort_key(min);
        let max_key = sort_key(max);
        let mut members = Vec::new();
        for (key, member) in self
            .index
            .range::<[u8], _>((Bound::Included(&min_key[..]), Bound::Unbounded))
        {
            if key[..SORT_KEY_LEN] > max_key[..] {
                break;
            }
            if limit != 0 && members.len() == limit {
                break;
            }
            members.push(ScoredMember {
                score: sort_key_score(key),
                member: member.clone(),
            });
        }
        members
    }

    pub fn rev_range_by_score(&self, min: f64, max: f64, limit: usize) -> Vec<ScoredMember> {
        let min_key = sort_key(min);
        // Walk down from the first key past max; past +∞ means from the end.
        let upper = match sort_key_after(max) {
            Some(after) => Bound::Excluded(after.to_vec()),
            None => Bound::Unbounded,
        };
        let mut members = Vec::new();
        for (key, member) in self.index.range((Bound::Unbounded, upper)).rev() {
            if key[..] < min_key[..] {
                break;
            }
            if limit != 0 && members.len() == limit {
                break;
            }
            members.push(ScoredMember {
                score: sort_key_score(key),
                member: member.clone(),
            });
        }
        members
    }

    pub fn range_by_lex(&self, min: &LexBound, max: &LexBound, limit: usize) -> Vec<Vec<u8>> {
        let prefix = sort_key(0.0);
        let lower = match min {
            LexBound::NegInf => Bound::Included(prefix.to_vec()),
            LexBound::PosInf => return Vec::new(),
            LexBound::Inclusive(bound) => Bound::Included(index_key(0.0, bound)),
            LexBound::Exclusive(bound) => Bound::Excluded(index_key(0.0, bound)),
        };
        let mut members = Vec::new();
        for (key, member) in self.index.range((lower, Bound::Unbounded)) {
            if !key.starts_with(&prefix) {
                break;
            }
            let field = &key[SORT_KEY_LEN..];
            if !max.admits_as_max(field) {
                break;
            }
            if limit != 0 && members.len() == limit {
                break;
            }
            members.push(member.clone());
        }
        members
    }

    pub fn rev_range_by_lex(&self, min: &LexBound, max: &LexBound, limit: usize) -> Vec<Vec<u8>> {
        let prefix = sort_key(0.0);
        let upper = match max {
            LexBound::NegInf => return Vec::new(),
            LexBound::PosInf => match sort_key_after(0.0) {
                Some(end) => Bound::Excluded(end.to_vec()),
                None => Bound::Unbounded,
            },
            LexBound::Inclusive(bound) => Bound::Included(index_key(0.0, bound)),
            LexBound::Exclusive(bound) => Bound::Excluded(index_key(0.0, bound)),
        };
        let mut members = Vec::new();
        for (key, member) in self.index.range((Bound::Unbounded, upper)).rev() {
            if !key.starts_with(&prefix) {
                break;
            }
            let field = &key[SORT_KEY_LEN..];
            if !min.admits_as_min(field) {
                break;
            }
            if limit != 0 && members.len() == limit {
                break;
            }
            members.push(member.clone());
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zset(entries: &[(&str, f64)]) -> SortedHash {
        let mut sorted = SortedHash::new();
        for (member, score) in entries {
            sorted.insert(member.as_bytes(), member.as_bytes().to_vec(), *score);
        }
        sorted
    }

    fn names(members: Vec<Vec<u8>>) -> Vec<String> {
        members
            .into_iter()
            .map(|m| String::from_utf8(m).unwrap())
            .collect()
    }

    fn scored_names(members: Vec<ScoredMember>) -> Vec<String> {
        members
            .into_iter()
            .map(|m| String::from_utf8(m.member).unwrap())
            .collect()
    }

    #[test]
    fn test_range_by_score_mixed_signs() {
        let sorted = zset(&[
            ("-2", -2.0),
            ("-1", -1.0),
            ("-0.5", -0.5),
            ("0", 0.0),
            ("0.5", 0.5),
            ("0.5b", 0.5),
            ("1", 1.0),
            ("2", 2.0),
        ]);

        assert_eq!(
            scored_names(sorted.range_by_score(-0.5, 1.0, 0)),
            vec!["-0.5", "0", "0.5", "0.5b", "1"]
        );
        assert_eq!(
            scored_names(sorted.rev_range_by_score(-0.5, 1.0, 0)),
            vec!["1", "0.5b", "0.5", "0", "-0.5"]
        );
        assert_eq!(
            scored_names(sorted.range_by_score(f64::NEG_INFINITY, f64::INFINITY, 0)),
            vec!["-2", "-1", "-0.5", "0", "0.5", "0.5b", "1", "2"]
        );
        assert_eq!(
            scored_names(sorted.rev_range_by_score(-0.5, f64::INFINITY, 0)),
            vec!["2", "1", "0.5b", "0.5", "0", "-0.5"]
        );
    }

    #[test]
    fn test_range_by_score_limit() {
        let sorted = zset(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        assert_eq!(
            scored_names(sorted.range_by_score(f64::NEG_INFINITY, f64::INFINITY, 2)),
            vec!["a", "b"]
        );
        assert_eq!(
            scored_names(sorted.rev_range_by_score(f64::NEG_INFINITY, f64::INFINITY, 2)),
            vec!["c", "b"]
        );
    }

    #[test]
    fn test_ties_break_by_field() {
        let sorted = zset(&[("b", 1.0), ("a", 1.0), ("c", 1.0)]);
        assert_eq!(
            scored_names(sorted.range_by_score(1.0, 1.0, 0)),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_insert_replaces_old_score() {
        let mut sorted = zset(&[("foo", 2.0)]);
        sorted.insert(b"foo", b"foo".to_vec(), 3.0);
        assert!(sorted.range_by_score(1.5, 2.5, 0).is_empty());
        assert_eq!(scored_names(sorted.range_by_score(2.5, 3.5, 0)), vec!["foo"]);
        assert_eq!(sorted.score(b"foo"), Some(3.0));
    }

    #[test]
    fn test_range_by_lex_bounds() {
        let sorted = zset(&[("a", 0.0), ("b", 0.0), ("c", 0.0), ("d", 0.0)]);
        let range = |min: &str, max: &str| {
            names(sorted.range_by_lex(
                &LexBound::parse(min).unwrap(),
                &LexBound::parse(max).unwrap(),
                0,
            ))
        };

        assert_eq!(range("-", "+"), vec!["a", "b", "c", "d"]);
        assert_eq!(range("(a", "(d"), vec!["b", "c"]);
        assert_eq!(range("[a", "[d"), vec!["a", "b", "c", "d"]);
        assert_eq!(range("[b", "[b"), vec!["b"]);
        assert!(range("(d", "(a").is_empty());
        assert!(range("[z", "[z").is_empty());
    }

    #[test]
    fn test_rev_range_by_lex_bounds() {
        let sorted = zset(&[("w", 0.0), ("x", 0.0), ("y", 0.0), ("z", 0.0)]);
        let range = |min: &str, max: &str| {
            names(sorted.rev_range_by_lex(
                &LexBound::parse(min).unwrap(),
                &LexBound::parse(max).unwrap(),
                0,
            ))
        };

        assert_eq!(range("-", "+"), vec!["z", "y", "x", "w"]);
        assert_eq!(range("(w", "(z"), vec!["y", "x"]);
        assert_eq!(range("[w", "[z"), vec!["z", "y", "x", "w"]);
        assert_eq!(range("[x", "[y"), vec!["y", "x"]);
        assert!(range("[q", "[q").is_empty());
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut sorted = zset(&[("a", 0.0), ("b", 0.0)]);
        assert!(sorted.remove(b"a"));
        assert!(!sorted.remove(b"a"));
        assert_eq!(
            names(sorted.range_by_lex(&LexBound::NegInf, &LexBound::PosInf, 0)),
            vec!["b"]
        );
        assert!(sorted.remove(b"b"));
        assert!(sorted.is_empty());
    }
}
