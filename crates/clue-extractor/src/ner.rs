//! Named Entity Recognition (NER) module
//!
//! Dictionary matching of catalog entity names against a word span.
//! Names are matched on the lowercase space-joined span, and again with
//! all whitespace removed so that tokenizer splits ("sail boat") still
//! find compound names ("sailboat").

use std::cmp::Reverse;

use clue_core::{compact, join_lower, EntityCatalog};

/// A catalog name prepared for matching
#[derive(Debug, Clone)]
struct Candidate<'a> {
    name: &'a str,
    lower: String,
    compact: String,
}

/// Catalog-backed entity recognizer
#[derive(Debug, Clone)]
pub struct EntityRecognizer<'a> {
    /// Longest names first
    candidates: Vec<Candidate<'a>>,
}

impl<'a> EntityRecognizer<'a> {
    pub fn new(catalog: &'a EntityCatalog) -> Self {
        let mut candidates: Vec<Candidate<'a>> = catalog
            .entity_names()
            .map(|name| {
                let name = name.trim();
                Candidate {
                    name,
                    lower: name.to_lowercase(),
                    compact: compact(name),
                }
            })
            .collect();

        candidates.sort_by_key(|c| {
            (
                Reverse(c.name.split_whitespace().count()),
                Reverse(c.name.len()),
            )
        });

        Self { candidates }
    }

    /// Entity names occurring in `words`, ordered by first occurrence
    pub fn recognize<S: AsRef<str>>(&self, words: &[S]) -> Vec<&'a str> {
        let sentence = join_lower(words);
        let sentence_compact = compact(&sentence);

        let mut found: Vec<(usize, &Candidate<'a>)> = self
            .candidates
            .iter()
            .filter_map(|c| {
                sentence
                    .find(&c.lower)
                    .or_else(|| sentence_compact.find(&c.compact))
                    .map(|pos| (pos, c))
            })
            .collect();

        // Stable: equal positions keep the longest-first order
        found.sort_by_key(|(pos, _)| *pos);

        // "2 silver" must not survive next to "12 silver"
        found
            .iter()
            .filter(|(_, c)| {
                !found
                    .iter()
                    .any(|(_, other)| other.lower != c.lower && other.lower.contains(&c.lower))
            })
            .map(|(_, c)| c.name)
            .collect()
    }

    /// Recognize over raw sentence text split on whitespace
    pub fn recognize_text(&self, text: &str) -> Vec<&'a str> {
        let words: Vec<&str> = text.split_whitespace().collect();
        self.recognize(&words)
    }
}

// ============================================================================
// Tests
// ============================================================================
