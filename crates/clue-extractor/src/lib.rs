//! CLUE Extractor - Clue sentence to predicate pipeline
//!
//! Turns candidate constituent parses of a logic-puzzle clue into a
//! structured predicate such as `before(Greg, maroon, 2 minutes)`.
//!
//! Stages, leaves first:
//! - [`ner`]: dictionary entity recognition over word spans
//! - [`comparator`]: comparator word and quantifier resolution
//! - [`pattern`]: phrase-tag sequence rules
//! - [`special`]: either/or and mutual-exclusion sentence shapes
//! - [`ranking`]: candidate ordering
//! - [`substitution`]: placeholder retry for parser-hostile entity names
//! - [`pipeline`]: per-sentence orchestration

use clue_core::{EntityCatalog, ParseTree, Result};

use crate::comparator::ComparatorResolver;
use crate::ner::EntityRecognizer;

/// Source of candidate parse trees for a sentence.
///
/// Returning an empty list means the parser found no linkage; that is
/// distinct from trees that no rule can interpret.
pub trait LinkageParser: Send + Sync {
    fn parse(&self, sentence: &str) -> Result<Vec<ParseTree>>;
}

/// Request-scoped state shared by every extraction stage
pub struct ExtractContext<'a> {
    pub catalog: &'a EntityCatalog,
    pub recognizer: EntityRecognizer<'a>,
    pub resolver: ComparatorResolver,
    /// Log rule matches, rejections and fallbacks
    pub verbose: bool,
}

impl<'a> ExtractContext<'a> {
    pub fn new(catalog: &'a EntityCatalog, verbose: bool) -> Self {
        Self {
            catalog,
            recognizer: EntityRecognizer::new(catalog),
            resolver: ComparatorResolver::new(catalog),
            verbose,
        }
    }
}

pub mod comparator;
pub mod linkage;
pub mod metrics;
pub mod ner;
pub mod pattern;
pub mod pipeline;
pub mod ranking;
pub mod special;
pub mod substitution;

pub use linkage::{CommandParser, LinkageFile};
pub use metrics::{Grade, ParseMetrics, Verdict};
pub use pattern::{PatternRule, PatternRuleSet};
pub use pipeline::{Extraction, SentenceExtractor, Strategy};
pub use ranking::CandidateRanker;
