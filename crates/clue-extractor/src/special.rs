//! Fixed sentence shapes
//!
//! Three clue shapes are recognized before any phrase rule runs:
//! - "Of A and B, one is C and the other is D" -> `is(xor(A, B), xor(C, D))`
//! - "X is either Y or Z" -> `is(X, xor(Y, Z))`
//! - a list of three or more entities -> `not(A, B, C, ...)`

use tracing::debug;

use clue_core::{tokenize, Comparator, Predicate};

use crate::ExtractContext;

/// Sentence shapes that bypass the phrase rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCase {
    DoubleEitherOr,
    EitherOr,
    MutualExclusion,
}

impl SpecialCase {
    /// Classify a sentence given the entities recognized in one of its trees
    pub fn detect(sentence: &str, entities: &[&str]) -> Option<Self> {
        let words = tokenize(sentence);
        let has_word = |target: &str| words.iter().any(|w| w.eq_ignore_ascii_case(target));

        // "Of" opens the double form; a lowercase "of" is an ordinary preposition
        let opens_with_of = words.iter().any(|w| w == "Of");
        let either_or = has_word("either") && has_word("or");

        if opens_with_of && entities.len() == 4 {
            Some(Self::DoubleEitherOr)
        } else if either_or {
            Some(Self::EitherOr)
        } else if entities.len() > 2 {
            Some(Self::MutualExclusion)
        } else {
            None
        }
    }

    /// Build the predicate for this shape
    pub fn extract(self, sentence: &str, entities: &[&str], ctx: &ExtractContext<'_>) -> Predicate {
        if ctx.verbose {
            debug!(case = ?self, entities = ?entities, "special sentence shape");
        }

        match self {
            Self::DoubleEitherOr => {
                let (first, second) = entities.split_at(2);
                Predicate {
                    entities: vec![either_group(ctx, first), either_group(ctx, second)],
                    comparator: Comparator::Is,
                    quantifier: None,
                }
            }
            Self::EitherOr => {
                let words = tokenize(sentence);
                let split = words
                    .iter()
                    .position(|w| w.eq_ignore_ascii_case("either"))
                    .unwrap_or(words.len());
                let (before, after) = words.split_at(split);
                let after = after.get(1..).unwrap_or_default();

                let subject = either_group(ctx, &ctx.recognizer.recognize(before));
                let alternatives = either_group(ctx, &ctx.recognizer.recognize(after));

                // A sentence-initial "Either" makes the alternatives the subject
                let entities = match subject {
                    Some(subject) => vec![Some(subject), alternatives],
                    None => vec![alternatives, None],
                };

                Predicate {
                    entities,
                    comparator: Comparator::Is,
                    quantifier: None,
                }
            }
            Self::MutualExclusion => Predicate::new(
                entities.iter().map(|e| e.to_string()).collect(),
                Comparator::Not,
            ),
        }
    }
}

/// One entity stays bare, several become `xor(a, b)`, none leaves the slot empty
fn either_group(ctx: &ExtractContext<'_>, entities: &[&str]) -> Option<String> {
    // Re-recognize so pairs joined from neighbouring spans collapse consistently
    let entities = ctx.recognizer.recognize(entities);
    match entities.as_slice() {
        [] => None,
        [single] => Some(single.to_string()),
        many => Some(format!("xor({})", many.join(", "))),
    }
}

// ============================================================================
// Tests
// ============================================================================
