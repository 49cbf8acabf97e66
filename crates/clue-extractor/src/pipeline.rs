//! Per-sentence extraction
//!
//! ```text
//! Start -> direct parse -> Success
//!               |
//!               +-- recoverable failure -> placeholder retry -> Success | Failure
//! ```
//!
//! The direct parse walks every candidate tree, tries the fixed sentence
//! shapes first and the phrase rules otherwise, then picks one predicate
//! across trees. When no tree yields anything, a bare `is(...)` over the
//! entities found in the whole sentence is the last resort.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use clue_core::{ClueError, Comparator, EntityCatalog, ExtractorConfig, Predicate, Result};

use crate::pattern::PatternRuleSet;
use crate::ranking::CandidateRanker;
use crate::special::SpecialCase;
use crate::substitution::EntitySubstitution;
use crate::{ExtractContext, LinkageParser};

/// Which path produced a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A special shape or a phrase rule on one of the parse trees
    Tree,
    /// Every entity in the sentence under the default `is`
    Default,
    /// Extracted after placeholder substitution
    Substituted,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Default => "default",
            Self::Substituted => "substituted",
        }
    }
}

/// A predicate and the strategy that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub predicate: Predicate,
    pub strategy: Strategy,
}

/// Extracts one predicate per clue sentence
#[derive(Clone)]
pub struct SentenceExtractor {
    parser: Arc<dyn LinkageParser>,
    rules: Arc<PatternRuleSet>,
    catalog: Arc<EntityCatalog>,
    config: ExtractorConfig,
}

impl SentenceExtractor {
    pub fn new(
        parser: Arc<dyn LinkageParser>,
        rules: Arc<PatternRuleSet>,
        catalog: Arc<EntityCatalog>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            parser,
            rules,
            catalog,
            config,
        }
    }

    /// Extract a predicate, retrying with placeholders on recoverable failure.
    ///
    /// When the retry also fails recoverably, the first error is returned.
    pub fn extract(&self, sentence: &str) -> Result<Extraction> {
        let error = match self.extract_with(sentence, &self.catalog) {
            Err(e) if e.is_recoverable() => e,
            other => return other,
        };

        if self.config.verbose {
            debug!(error = %error, "direct extraction failed, trying placeholder substitution");
        }

        match self.extract_substituted(sentence) {
            Some(Ok(extraction)) => Ok(extraction),
            Some(Err(retry)) if !retry.is_recoverable() => Err(retry),
            Some(Err(retry)) => {
                if self.config.verbose {
                    debug!(error = %retry, "placeholder substitution failed");
                }
                Err(error)
            }
            None => Err(error),
        }
    }

    /// `None` when substitution does not apply to this catalog
    fn extract_substituted(&self, sentence: &str) -> Option<Result<Extraction>> {
        let category = self.config.volatile_category.as_deref()?;
        let substitution =
            EntitySubstitution::prepare(&self.catalog, category, &self.config.placeholder_prefix)?;

        let result = substitution
            .substitute_catalog(&self.catalog)
            .and_then(|catalog| {
                let replaced = substitution.substitute(sentence);
                if self.config.verbose {
                    debug!(
                        sentence = %replaced,
                        category = substitution.category(),
                        "retrying with placeholders"
                    );
                }
                self.extract_with(&replaced, &catalog)
            })
            .map(|extraction| Extraction {
                predicate: substitution.restore(extraction.predicate),
                strategy: Strategy::Substituted,
            });

        Some(result)
    }

    fn extract_with(&self, sentence: &str, catalog: &EntityCatalog) -> Result<Extraction> {
        let ctx = ExtractContext::new(catalog, self.config.verbose);

        let trees = self.parser.parse(sentence)?;
        if trees.is_empty() {
            return Err(ClueError::NoLinkageFound);
        }

        let mut candidates = Vec::new();
        for (i, tree) in trees.iter().enumerate() {
            let words = tree.words();
            let entities = ctx.recognizer.recognize(&words);

            if let Some(case) = SpecialCase::detect(sentence, &entities) {
                candidates.push(case.extract(sentence, &entities, &ctx));
                continue;
            }

            let found = self.rules.match_tree(tree, &ctx);
            if ctx.verbose {
                debug!(tree = i, candidates = found.len(), "tree matched");
            }
            candidates.extend(found.into_iter().next());
        }

        if let Some(predicate) = select(candidates) {
            return Ok(Extraction {
                predicate,
                strategy: Strategy::Tree,
            });
        }

        let entities = ctx.recognizer.recognize_text(sentence);
        if entities.len() >= 2 {
            if ctx.verbose {
                debug!(?entities, "no tree matched, defaulting to equality");
            }
            let entities = entities.into_iter().map(str::to_string).collect();
            return Ok(Extraction {
                predicate: Predicate::new(entities, Comparator::Is),
                strategy: Strategy::Default,
            });
        }

        Err(ClueError::NoViableExtraction { tried: trees.len() })
    }
}

/// First candidate with an either/or group or a quantifier, else the ranked best
fn select(candidates: Vec<Predicate>) -> Option<Predicate> {
    if let Some(i) = candidates
        .iter()
        .position(|p| p.has_xor() || p.quantifier.is_some())
    {
        return candidates.into_iter().nth(i);
    }
    candidates.into_iter().collect::<CandidateRanker>().into_best()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clue_core::{Category, ParseTree, PhraseNode, Quantifier};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Parser that replays fixed trees and counts calls
    #[derive(Default)]
    struct ScriptedParser {
        trees: HashMap<String, Vec<ParseTree>>,
        calls: AtomicUsize,
    }

    impl ScriptedParser {
        fn with(mut self, sentence: &str, trees: Vec<ParseTree>) -> Self {
            self.trees.insert(sentence.to_string(), trees);
            self
        }
    }

    impl LinkageParser for ScriptedParser {
        fn parse(&self, sentence: &str) -> Result<Vec<ParseTree>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.trees.get(sentence).cloned().unwrap_or_default())
        }
    }

    struct BrokenParser;

    impl LinkageParser for BrokenParser {
        fn parse(&self, _sentence: &str) -> Result<Vec<ParseTree>> {
            Err(ClueError::ParserBackend("link-parser: exited with 1".into()))
        }
    }

    fn tree(nodes: &[(&str, &[&str])]) -> ParseTree {
        ParseTree::new(nodes.iter().map(|(t, w)| PhraseNode::new(*t, w)).collect())
    }

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Category::new("names", vec!["Greg".into(), "Ida".into()]),
            Category::new("colors", vec!["red".into(), "blue".into(), "green".into()]),
            Category::new("ages", vec!["109".into(), "110".into()]),
            Category::new("minutes", vec!["10".into(), "12".into()]),
        ])
        .unwrap()
    }

    fn extractor(parser: impl LinkageParser + 'static, catalog: EntityCatalog) -> SentenceExtractor {
        SentenceExtractor::new(
            Arc::new(parser),
            Arc::new(PatternRuleSet::standard().unwrap()),
            Arc::new(catalog),
            ExtractorConfig::default(),
        )
    }

    const LARGER: &str = "The red item is larger than the blue item";

    fn larger_tree() -> ParseTree {
        tree(&[
            ("S", &[]),
            ("NP", &["The", "red", "item"]),
            ("VP", &["is"]),
            ("ADJP", &["larger"]),
            ("PP", &["than"]),
            ("NP", &["the", "blue", "item"]),
        ])
    }

    #[test]
    fn test_phrase_rule_extraction() {
        let catalog = EntityCatalog::new(vec![Category::new(
            "colors",
            vec!["red".into(), "blue".into()],
        )])
        .unwrap();
        let parser = ScriptedParser::default().with(LARGER, vec![larger_tree()]);

        let extraction = extractor(parser, catalog).extract(LARGER).unwrap();
        assert_eq!(extraction.strategy, Strategy::Tree);
        assert_eq!(
            extraction.predicate,
            Predicate::new(vec!["red".into(), "blue".into()], Comparator::Larger)
        );
        assert_eq!(extraction.predicate.render().unwrap(), "larger(red, blue)");
    }

    #[test]
    fn test_leading_either_or() {
        let sentence = "Either the red item or the blue item is first";
        let parser = ScriptedParser::default().with(
            sentence,
            vec![tree(&[
                ("S", &[]),
                ("NP", &["Either", "the", "red", "item", "or", "the", "blue", "item"]),
                ("VP", &["is"]),
                ("ADJP", &["first"]),
            ])],
        );

        let predicate = extractor(parser, catalog()).extract(sentence).unwrap().predicate;
        assert_eq!(predicate.entities, vec![Some("xor(red, blue)".to_string()), None]);
        assert_eq!(predicate.comparator, Comparator::Is);
        assert!(matches!(predicate.render(), Err(ClueError::Format(_))));
    }

    #[test]
    fn test_mutual_exclusion() {
        let sentence = "The red item, the blue item, and the green item are all different";
        let parser = ScriptedParser::default().with(
            sentence,
            vec![tree(&[
                ("S", &[]),
                ("NP", &["The", "red", "item", "the", "blue", "item", "and", "the", "green", "item"]),
                ("VP", &["are"]),
                ("ADJP", &["all", "different"]),
            ])],
        );

        let predicate = extractor(parser, catalog()).extract(sentence).unwrap().predicate;
        assert_eq!(predicate.render().unwrap(), "not(red, blue, green)");
    }

    #[test]
    fn test_quantified_tree_wins() {
        let sentence = "Greg finished 2 minutes before Ida";
        let parser = ScriptedParser::default().with(
            sentence,
            vec![
                tree(&[("S", &[]), ("NP", &["Greg"]), ("VP", &["finished"]), ("NP", &["Ida"])]),
                tree(&[
                    ("S", &[]),
                    ("NP", &["Greg"]),
                    ("VP", &["finished"]),
                    ("NP", &["2", "minutes", "before"]),
                    ("PP", &[]),
                    ("NP", &["Ida"]),
                ]),
            ],
        );

        let predicate = extractor(parser, catalog()).extract(sentence).unwrap().predicate;
        assert_eq!(predicate.comparator, Comparator::Before);
        assert_eq!(
            predicate.quantifier,
            Some(Quantifier::new("2", Some("minutes".to_string())))
        );
    }

    #[test]
    fn test_default_equality_when_no_rule_matches() {
        let sentence = "Greg, who chose red, came last";
        let parser = ScriptedParser::default()
            .with(sentence, vec![tree(&[("S", &[]), ("ADVP", &["Greg", "red"])])]);

        let extraction = extractor(parser, catalog()).extract(sentence).unwrap();
        assert_eq!(extraction.strategy, Strategy::Default);
        assert_eq!(extraction.predicate.render().unwrap(), "is(Greg, red)");
    }

    #[test]
    fn test_zero_trees_and_no_entities_fails() {
        let parser = ScriptedParser::default();
        let err = extractor(parser, catalog())
            .extract("Nothing here is recognizable")
            .unwrap_err();
        assert!(matches!(err, ClueError::NoLinkageFound));
    }

    #[test]
    fn test_single_entity_is_not_viable() {
        let sentence = "Greg came last";
        let parser = ScriptedParser::default()
            .with(sentence, vec![tree(&[("S", &[]), ("ADVP", &["Greg"])]), tree(&[("S", &[])])]);

        let err = extractor(parser, catalog()).extract(sentence).unwrap_err();
        assert!(matches!(err, ClueError::NoViableExtraction { tried: 2 }));
    }

    #[test]
    fn test_substitution_fallback() {
        let sentence = "Greg is older than the 109 year old";
        let replaced = "Greg is older than the Entity1 year old";
        let parser = ScriptedParser::default().with(
            replaced,
            vec![tree(&[
                ("S", &[]),
                ("NP", &["Greg"]),
                ("VP", &["is"]),
                ("ADJP", &["older"]),
                ("PP", &["than"]),
                ("NP", &["the", "Entity1", "year", "old"]),
            ])],
        );

        let extraction = extractor(parser, catalog()).extract(sentence).unwrap();
        assert_eq!(extraction.strategy, Strategy::Substituted);
        assert_eq!(extraction.predicate.render().unwrap(), "older(Greg, 109)");
    }

    #[test]
    fn test_failed_fallback_keeps_original_error() {
        let parser = Arc::new(ScriptedParser::default());
        let extractor = SentenceExtractor::new(
            parser.clone(),
            Arc::new(PatternRuleSet::standard().unwrap()),
            Arc::new(catalog()),
            ExtractorConfig::default(),
        );

        let err = extractor.extract("Greg is 109").unwrap_err();
        assert!(matches!(err, ClueError::NoLinkageFound));
        // direct attempt plus one retry
        assert_eq!(parser.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_substitution_disabled() {
        let parser = Arc::new(ScriptedParser::default());
        let config = ExtractorConfig {
            volatile_category: None,
            ..ExtractorConfig::default()
        };
        let extractor = SentenceExtractor::new(
            parser.clone(),
            Arc::new(PatternRuleSet::standard().unwrap()),
            Arc::new(catalog()),
            config,
        );

        assert!(extractor.extract("Greg is 109").is_err());
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backend_error_skips_fallback() {
        let err = extractor(BrokenParser, catalog()).extract(LARGER).unwrap_err();
        assert!(matches!(err, ClueError::ParserBackend(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let parser = ScriptedParser::default().with(LARGER, vec![larger_tree()]);
        let extractor = extractor(parser, catalog());

        let first = extractor.extract(LARGER).unwrap();
        let second = extractor.extract(LARGER).unwrap();
        assert_eq!(first, second);
    }
}
