//! Comparator and quantifier resolution
//!
//! Classifies the words of a comparison phrase against the fixed
//! comparator vocabulary and pulls an optional numeric quantifier
//! ("2 minutes", "3") out of the surrounding words.

use clue_core::{Comparator, EntityCatalog, Quantifier};

/// Vague amounts ("somewhat", "sometime") never form a quantifier
const VAGUE_MARKER: &str = "some";

/// Whether a word is a vague amount rather than part of a quantifier
pub(crate) fn is_vague(word: &str) -> bool {
    word.to_lowercase().contains(VAGUE_MARKER)
}

/// Resolved comparator with its optional quantifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub comparator: Comparator,
    pub quantifier: Option<Quantifier>,
}

impl Resolution {
    /// Default equality, used when no comparator word is present
    pub fn equality() -> Self {
        Self {
            comparator: Comparator::Is,
            quantifier: None,
        }
    }
}

/// Comparator/quantifier resolver bound to a catalog's category names
#[derive(Debug, Clone)]
pub struct ComparatorResolver {
    /// Lowercase category names, used to spot quantifier units
    category_names: Vec<String>,
}

impl ComparatorResolver {
    pub fn new(catalog: &EntityCatalog) -> Self {
        Self {
            category_names: catalog.category_names().map(str::to_lowercase).collect(),
        }
    }

    /// Resolve comparator candidates and an optional quantifier span.
    ///
    /// An empty `quantifier_words` means no quantifier span was supplied; one
    /// is then synthesized from the non-comparator candidate words.
    pub fn resolve<S: AsRef<str>>(&self, comparator_words: &[S], quantifier_words: &[S]) -> Resolution {
        let Some(comparator) = comparator_words
            .iter()
            .find_map(|w| Comparator::from_word(w.as_ref()))
        else {
            return Resolution::equality();
        };

        let quantifier_words: Vec<&str> = if quantifier_words.is_empty() {
            comparator_words
                .iter()
                .map(|w| w.as_ref())
                .filter(|w| Comparator::from_word(w).is_none())
                .collect()
        } else {
            quantifier_words.iter().map(|w| w.as_ref()).collect()
        };

        Resolution {
            comparator,
            quantifier: self.refine_quantifier(&quantifier_words),
        }
    }

    /// First integer is the value; a word naming (part of) a category is the unit
    fn refine_quantifier(&self, words: &[&str]) -> Option<Quantifier> {
        let mut value: Option<&str> = None;
        let mut unit: Option<&str> = None;

        for word in words.iter().map(|w| w.trim()) {
            if word.is_empty() || is_vague(word) {
                continue;
            }
            if word.parse::<i64>().is_ok() {
                value = value.or(Some(word));
            } else if self.is_unit(word) {
                unit = Some(word);
            }
        }

        value.map(|v| Quantifier::new(v, unit.map(str::to_string)))
    }

    fn is_unit(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.category_names.iter().any(|c| c.contains(&word))
    }
}

// ============================================================================
// Tests
// ============================================================================
