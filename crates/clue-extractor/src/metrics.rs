//! Batch quality metrics
//!
//! Tallies how many clues were parsed, how many agreed with the expected
//! predicate, and grades the overall run.

use serde::{Deserialize, Serialize};

// ============================================================================
// Verdict
// ============================================================================

/// Outcome of one clue against its optional expected line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Parsed, and equal to the expected line (or nothing was expected)
    Match,
    /// Parsed, but different from the expected line
    Mismatch,
    /// Nothing was extracted
    Unparsed,
}

impl Verdict {
    pub fn classify(actual: Option<&str>, expected: Option<&str>) -> Self {
        match (actual, expected) {
            (None, _) => Self::Unparsed,
            (Some(_), None) => Self::Match,
            (Some(actual), Some(expected)) if actual == expected => Self::Match,
            (Some(_), Some(_)) => Self::Mismatch,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Match)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Mismatch => "mismatch",
            Self::Unparsed => "unparsed",
        }
    }
}

// ============================================================================
// Grade
// ============================================================================

/// Overall grade of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    Failure,
    Decent,
    Success,
}

impl Grade {
    /// Below 70% is a failure, below 90% decent
    pub fn from_rate(rate: f32) -> Self {
        if rate < 0.70 {
            Self::Failure
        } else if rate < 0.90 {
            Self::Decent
        } else {
            Self::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failure => "FAILURE",
            Self::Decent => "DECENT",
            Self::Success => "SUCCESS",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Parse Metrics
// ============================================================================

/// Counters for one puzzle or a whole batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseMetrics {
    /// Non-blank clues attempted
    pub total: usize,
    pub success: usize,
    /// `mismatched + unparsed`
    pub fail: usize,
    pub mismatched: usize,
    pub unparsed: usize,
}

impl ParseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: Verdict) {
        self.total += 1;
        match verdict {
            Verdict::Match => self.success += 1,
            Verdict::Mismatch => {
                self.mismatched += 1;
                self.fail += 1;
            }
            Verdict::Unparsed => {
                self.unparsed += 1;
                self.fail += 1;
            }
        }
    }

    /// Fraction of clues that succeeded; 0.0 for an empty run
    pub fn success_rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f32 / self.total as f32
        }
    }

    pub fn grade(&self) -> Grade {
        Grade::from_rate(self.success_rate())
    }

    pub fn merge(&mut self, other: &ParseMetrics) {
        self.total += other.total;
        self.success += other.success;
        self.fail += other.fail;
        self.mismatched += other.mismatched;
        self.unparsed += other.unparsed;
    }

    /// `N% success - S of T total statements`
    pub fn summary(&self) -> String {
        format!(
            "{}% success - {} of {} total statements",
            (self.success * 100).checked_div(self.total).unwrap_or(0),
            self.success,
            self.total
        )
    }
}

impl FromIterator<Verdict> for ParseMetrics {
    fn from_iter<I: IntoIterator<Item = Verdict>>(iter: I) -> Self {
        let mut metrics = Self::new();
        for verdict in iter {
            metrics.record(verdict);
        }
        metrics
    }
}

// ============================================================================
// Tests
// ============================================================================
