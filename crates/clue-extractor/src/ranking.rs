//! Candidate ranking
//!
//! Orders competing predicates best-first. A specific relation beats the
//! default `is`; among equals, more populated fields win; remaining ties
//! keep discovery order.

use std::cmp::Reverse;

use clue_core::Predicate;

/// Sort key: lower is better
fn rank_key(predicate: &Predicate) -> (bool, Reverse<usize>) {
    (
        predicate.comparator.is_default(),
        Reverse(predicate.populated_fields()),
    )
}

/// Best-first list of candidate predicates
#[derive(Debug, Clone, Default)]
pub struct CandidateRanker {
    candidates: Vec<Predicate>,
}

impl CandidateRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate, keeping the list ordered
    pub fn push(&mut self, predicate: Predicate) {
        let key = rank_key(&predicate);
        // After every candidate of equal rank, so ties stay in discovery order
        let at = self.candidates.partition_point(|c| rank_key(c) <= key);
        self.candidates.insert(at, predicate);
    }

    pub fn best(&self) -> Option<&Predicate> {
        self.candidates.first()
    }

    pub fn into_best(self) -> Option<Predicate> {
        self.candidates.into_iter().next()
    }

    pub fn into_sorted(self) -> Vec<Predicate> {
        self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl FromIterator<Predicate> for CandidateRanker {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        let mut ranker = Self::new();
        for predicate in iter {
            ranker.push(predicate);
        }
        ranker
    }
}

// ============================================================================
// Tests
// ============================================================================
