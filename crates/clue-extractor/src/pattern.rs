//! Phrase-type sequence rules
//!
//! Each rule is a regex over the space-joined phrase tags of a parse tree
//! (e.g. `S NP VP ADJP PP NP`) with named capture groups, plus bindings that
//! say which groups hold the entities, which one holds the comparator and
//! which ones may hold the quantifier. A capture span is mapped back to the
//! words of every phrase node whose tag starts inside it.

use regex::Regex;
use tracing::debug;

use clue_core::{ClueError, ParseTree, Predicate, Result};

use crate::comparator::is_vague;
use crate::ranking::CandidateRanker;
use crate::ExtractContext;

// ============================================================================
// Entity phrase fragments
// ============================================================================

/// Noun phrase optionally preceded by other noun, verb or prepositional phrases
const ENTITY_PHRASE: &str = "(?:(?:NP )?(?:NP )?(?:(?:VP )?PP )?)?NP";

/// One or two noun phrases
const ENTITY_PHRASE_SIMPLE: &str = "(?:NP )?NP";

/// Noun phrase followed by a relative clause ("the man who was born in ...")
const ENTITY_PHRASE_PASSIVE: &str = "(?:NP )?NP SBAR WHNP S VP (?:PP )?(?:NP )?NP";

fn group(name: &str, body: &str) -> String {
    format!("(?P<{}>{})", name, body)
}

// ============================================================================
// Pattern Rules
// ============================================================================

/// A named structural template over a phrase-tag sequence
#[derive(Debug, Clone)]
pub struct PatternRule {
    name: String,
    regex: Regex,
    /// Capture groups holding entities, in predicate order
    entities: Vec<String>,
    /// Capture group holding the comparator words
    comparator: String,
    /// Capture groups that may hold the quantifier; first non-empty wins
    quantifiers: Vec<String>,
}

impl PatternRule {
    /// Compile a rule and check that its bindings and capture groups agree
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        entities: &[&str],
        comparator: &str,
        quantifiers: &[&str],
    ) -> Result<Self> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|e| ClueError::InvalidRule {
            rule: name.clone(),
            reason: e.to_string(),
        })?;

        if entities.is_empty() {
            return Err(ClueError::InvalidRule {
                rule: name,
                reason: "no entity groups bound".to_string(),
            });
        }

        let groups: Vec<&str> = regex.capture_names().flatten().collect();
        let bound: Vec<&str> = entities
            .iter()
            .chain(std::iter::once(&comparator))
            .chain(quantifiers.iter())
            .copied()
            .collect();

        if let Some(missing) = bound.iter().find(|b| !groups.contains(b)) {
            return Err(ClueError::InvalidRule {
                rule: name,
                reason: format!("bound group '{}' is not in the pattern", missing),
            });
        }
        if let Some(unbound) = groups.iter().find(|g| !bound.contains(g)) {
            return Err(ClueError::InvalidRule {
                rule: name,
                reason: format!("group '{}' is not bound to a role", unbound),
            });
        }

        Ok(Self {
            name,
            regex,
            entities: entities.iter().map(|s| s.to_string()).collect(),
            comparator: comparator.to_string(),
            quantifiers: quantifiers.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Apply the rule to a tag sequence.
    ///
    /// Returns `None` when the pattern does not match, or when it matches but
    /// an entity or comparator span comes up empty.
    pub fn apply(&self, tags: &str, index: &WordIndex<'_>, ctx: &ExtractContext<'_>) -> Option<Predicate> {
        let captures = self.regex.captures(tags)?;
        let span = |group: &str| -> Vec<&str> {
            captures
                .name(group)
                .map(|m| index.words_in(m.start(), m.end()))
                .unwrap_or_default()
        };

        let mut entities = Vec::with_capacity(self.entities.len());
        for group in &self.entities {
            let found = ctx.recognizer.recognize(&span(group));
            if found.is_empty() {
                if ctx.verbose {
                    debug!(rule = %self.name, group = %group, "no entity in matched span");
                }
                return None;
            }
            entities.push(found.join(" "));
        }

        let comparator_words = span(&self.comparator);
        if comparator_words.is_empty() {
            if ctx.verbose {
                debug!(rule = %self.name, "empty comparator span");
            }
            return None;
        }

        // Comparator and vague words are dropped here; an emptied span lets the
        // resolver fall back to the comparator words
        let quantifier_words: Vec<&str> = self
            .quantifiers
            .iter()
            .map(|group| span(group))
            .find(|words| !words.is_empty())
            .map(|words| {
                words
                    .into_iter()
                    .filter(|w| !comparator_words.contains(w) && !is_vague(w))
                    .collect()
            })
            .unwrap_or_default();

        let resolution = ctx.resolver.resolve(&comparator_words, &quantifier_words);

        Some(Predicate::new(entities, resolution.comparator).with_quantifier(resolution.quantifier))
    }
}

// ============================================================================
// Word Index
// ============================================================================

/// Maps character offsets in a tag sequence to the words of each node
#[derive(Debug, Clone)]
pub struct WordIndex<'t> {
    /// (offset of the node's tag, node words), ascending by offset
    entries: Vec<(usize, &'t [String])>,
}

impl<'t> WordIndex<'t> {
    pub fn new(tree: &'t ParseTree) -> Self {
        let mut offset = 0;
        let entries = tree
            .nodes
            .iter()
            .map(|node| {
                let entry = (offset, node.words.as_slice());
                // Tags are separated by single spaces
                offset += node.category.as_str().len() + 1;
                entry
            })
            .collect();
        Self { entries }
    }

    /// Words of every node whose tag starts in `start..end`
    pub fn words_in(&self, start: usize, end: usize) -> Vec<&'t str> {
        self.entries
            .iter()
            .filter(|(offset, _)| (start..end).contains(offset))
            .flat_map(|(_, words)| words.iter().map(String::as_str))
            .collect()
    }
}

// ============================================================================
// Rule Set
// ============================================================================

/// Ordered collection of pattern rules
#[derive(Debug, Clone)]
pub struct PatternRuleSet {
    rules: Vec<PatternRule>,
}

impl PatternRuleSet {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    /// The clue grammar, in priority order
    pub fn standard() -> Result<Self> {
        let ep = ENTITY_PHRASE;
        let simple = ENTITY_PHRASE_SIMPLE;
        let passive = ENTITY_PHRASE_PASSIVE;

        let rules = vec![
            // "Greg will finish 2 minutes ahead of maroon"
            PatternRule::new(
                "Future (ADVP)",
                &format!(
                    "^S {}.* VP (?P<measure_alt>NP )?(?P<measure>ADVP )(?P<relation>PP) {}$",
                    group("subject", ep),
                    group("object", ep)
                ),
                &["subject", "object"],
                "relation",
                &["measure", "measure_alt"],
            )?,
            PatternRule::new(
                "Future (VPVPVP)",
                &format!(
                    "^S {}.* VP (?:VP )+(?P<measure>NP )?(?P<relation>PP ){}$",
                    group("subject", ep),
                    group("object", ep)
                ),
                &["subject", "object"],
                "relation",
                &["measure"],
            )?,
            // "Greg finished 2 minutes before maroon"
            PatternRule::new(
                "Simple (NP)",
                &format!(
                    "^S {}.* (?:PP )?(?P<relation>NP )PP {}$",
                    group("subject", ep),
                    group("object", ep)
                ),
                &["subject", "object"],
                "relation",
                &["relation"],
            )?,
            // "The red item is larger than the blue item"
            PatternRule::new(
                "Present (ADJP)",
                &format!(
                    "^S {}.* (?P<clause>VP (?P<measure>NP )?(?P<relation>ADJP )PP) {}$",
                    group("subject", ep),
                    group("object", ep)
                ),
                &["subject", "object"],
                "relation",
                &["measure", "clause"],
            )?,
            PatternRule::new(
                "Present (PP)",
                &format!(
                    "^S {} VP (?P<measure>NP )?(?P<relation>PP )(?P<measure_alt>NP )?{}$",
                    group("subject", ep),
                    group("object", ep)
                ),
                &["subject", "object"],
                "relation",
                &["measure", "measure_alt"],
            )?,
            PatternRule::new(
                "Simple (VP)",
                &format!(
                    "^S {}.* (?P<relation>VP ){}$",
                    group("subject", ep),
                    group("object", ep)
                ),
                &["subject", "object"],
                "relation",
                &[],
            )?,
            PatternRule::new(
                "Past Passive (WHNP_VP)",
                &format!(
                    "^S .* SBAR WHNP S (?:VP (?:PP )?)?{} (?P<relation>VP ){}",
                    group("subject", simple),
                    group("object", simple)
                ),
                &["subject", "object"],
                "relation",
                &[],
            )?,
            PatternRule::new(
                "Past Passive (WHNP_PP)",
                &format!(
                    "^S .*?{} (?P<relation>VP (?:NP )?(?:PP )?NP) (?:PP )?{}$",
                    group("subject", passive),
                    group("object", ep)
                ),
                &["subject", "object"],
                "relation",
                &[],
            )?,
            PatternRule::new(
                "Past Passive (WHNP_ADJP)",
                &format!(
                    "^S .*?{} VP (?:NP )?(?:PP )?NP (?P<relation>ADJP ADVP (?:PP )?){}$",
                    group("subject", passive),
                    group("object", passive)
                ),
                &["subject", "object"],
                "relation",
                &["relation"],
            )?,
        ];

        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Every predicate the rules extract from `tree`, best first
    pub fn match_tree(&self, tree: &ParseTree, ctx: &ExtractContext<'_>) -> Vec<Predicate> {
        let tags = tree.tag_sequence();
        let index = WordIndex::new(tree);
        let mut ranker = CandidateRanker::new();

        if ctx.verbose {
            debug!(tags = %tags, "matching phrase rules");
        }

        for rule in &self.rules {
            if let Some(predicate) = rule.apply(&tags, &index, ctx) {
                if ctx.verbose {
                    debug!(rule = %rule.name, ?predicate, "rule matched");
                }
                ranker.push(predicate);
            }
        }

        ranker.into_sorted()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clue_core::{Category, Comparator, EntityCatalog, PhraseNode, Quantifier};

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Category::new("names", vec!["Greg".into(), "Ida".into(), "Vera".into()]),
            Category::new("colors", vec!["red".into(), "blue".into(), "maroon".into()]),
            Category::new("minutes", vec!["10".into(), "12".into(), "14".into()]),
        ])
        .unwrap()
    }

    fn tree(nodes: &[(&str, &[&str])]) -> ParseTree {
        ParseTree::new(nodes.iter().map(|(t, w)| PhraseNode::new(*t, w)).collect())
    }

    #[test]
    fn test_standard_rules_validate() {
        let rules = PatternRuleSet::standard().unwrap();
        assert_eq!(rules.rules().len(), 9);
        assert_eq!(rules.rules()[0].name(), "Future (ADVP)");
        assert_eq!(rules.rules()[8].name(), "Past Passive (WHNP_ADJP)");
    }

    #[test]
    fn test_unbound_group_rejected() {
        let err = PatternRule::new("bad", "^S (?P<subject>NP) (?P<extra>VP) (?P<object>NP)$", &["subject", "object"], "subject", &[])
            .unwrap_err();
        assert!(matches!(err, ClueError::InvalidRule { .. }));
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn test_missing_group_rejected() {
        let err = PatternRule::new("bad", "^S (?P<subject>NP) VP (?P<object>NP)$", &["subject", "object"], "relation", &[])
            .unwrap_err();
        assert!(err.to_string().contains("relation"));
    }

    #[test]
    fn test_word_index() {
        let t = tree(&[("S", &[]), ("NP", &["The", "red", "item"]), ("VP", &["is"]), ("ADJP", &["larger"])]);
        let index = WordIndex::new(&t);

        // "S NP VP ADJP": NP at 2, VP at 5, ADJP at 8
        assert_eq!(index.words_in(2, 4), vec!["The", "red", "item"]);
        assert_eq!(index.words_in(5, 12), vec!["is", "larger"]);
        assert!(index.words_in(3, 5).is_empty());
    }

    #[test]
    fn test_present_adjp() {
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, true);
        let rules = PatternRuleSet::standard().unwrap();

        let t = tree(&[
            ("S", &[]),
            ("NP", &["The", "red", "item"]),
            ("VP", &["is"]),
            ("ADJP", &["larger"]),
            ("PP", &["than"]),
            ("NP", &["the", "blue", "item"]),
        ]);

        let candidates = rules.match_tree(&t, &ctx);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0], Predicate::new(vec!["red".into(), "blue".into()], Comparator::Larger));
    }

    #[test]
    fn test_simple_np_with_quantifier() {
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        let rules = PatternRuleSet::standard().unwrap();

        // "Greg finished 2 minutes before maroon"
        let t = tree(&[
            ("S", &[]),
            ("NP", &["Greg"]),
            ("VP", &["finished"]),
            ("NP", &["2", "minutes", "before"]),
            ("PP", &[]),
            ("NP", &["maroon"]),
        ]);

        let candidates = rules.match_tree(&t, &ctx);
        let best = &candidates[0];
        assert_eq!(best.entities, vec![Some("Greg".to_string()), Some("maroon".to_string())]);
        assert_eq!(best.comparator, Comparator::Before);
        assert_eq!(best.quantifier, Some(Quantifier::new("2", Some("minutes".to_string()))));
    }

    #[test]
    fn test_present_pp() {
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        let rules = PatternRuleSet::standard().unwrap();

        // "Ida arrived 10 minutes after Vera"
        let t = tree(&[
            ("S", &[]),
            ("NP", &["Ida"]),
            ("VP", &["arrived"]),
            ("NP", &["10", "minutes"]),
            ("PP", &["after"]),
            ("NP", &["Vera"]),
        ]);

        let candidates = rules.match_tree(&t, &ctx);
        let best = &candidates[0];
        assert_eq!(best.entities, vec![Some("Ida".to_string()), Some("Vera".to_string())]);
        assert_eq!(best.comparator, Comparator::After);
        assert_eq!(best.quantifier, Some(Quantifier::new("10", Some("minutes".to_string()))));
    }

    #[test]
    fn test_missing_entity_rejects_rule() {
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        let rules = PatternRuleSet::standard().unwrap();

        let t = tree(&[
            ("S", &[]),
            ("NP", &["The", "winner"]),
            ("VP", &["is"]),
            ("ADJP", &["older"]),
            ("PP", &["than"]),
            ("NP", &["Vera"]),
        ]);

        assert!(rules.match_tree(&t, &ctx).is_empty());
    }

    #[test]
    fn test_simple_vp_equality() {
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        let rules = PatternRuleSet::standard().unwrap();

        // "Greg chose maroon"
        let t = tree(&[("S", &[]), ("NP", &["Greg"]), ("VP", &["chose"]), ("NP", &["maroon"])]);

        let candidates = rules.match_tree(&t, &ctx);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].comparator, Comparator::Is);
    }

    fn apply_rule(name: &str, t: &ParseTree) -> Option<String> {
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        let rules = PatternRuleSet::standard().unwrap();
        let rule = rules.rules().iter().find(|r| r.name() == name).unwrap();
        rule.apply(&t.tag_sequence(), &WordIndex::new(t), &ctx)
            .map(|p| p.render().unwrap())
    }

    #[test]
    fn test_future_advp() {
        let t = tree(&[
            ("S", &[]),
            ("NP", &["Greg"]),
            ("VP", &["will"]),
            ("VP", &["finish"]),
            ("ADVP", &["2", "minutes", "earlier"]),
            ("PP", &["before"]),
            ("NP", &["maroon"]),
        ]);

        assert_eq!(
            apply_rule("Future (ADVP)", &t).as_deref(),
            Some("before(Greg, maroon, 2 minutes)")
        );

        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        assert_eq!(PatternRuleSet::standard().unwrap().match_tree(&t, &ctx).len(), 1);
    }

    #[test]
    fn test_future_vpvpvp() {
        // "Greg will finish 2 minutes before maroon"
        let t = tree(&[
            ("S", &[]),
            ("NP", &["Greg"]),
            ("VP", &["will"]),
            ("VP", &["finish"]),
            ("NP", &["2", "minutes"]),
            ("PP", &["before"]),
            ("NP", &["maroon"]),
        ]);

        assert_eq!(
            apply_rule("Future (VPVPVP)", &t).as_deref(),
            Some("before(Greg, maroon, 2 minutes)")
        );

        // Simple (NP) and Simple (VP) also match but only find equality
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        let candidates = PatternRuleSet::standard().unwrap().match_tree(&t, &ctx);
        assert_eq!(candidates[0].render().unwrap(), "before(Greg, maroon, 2 minutes)");
        assert!(candidates[1..].iter().all(|c| c.comparator == Comparator::Is));
    }

    #[test]
    fn test_past_passive_whnp_vp() {
        // Subject comes from the relative clause, not the leading noun phrase
        let t = tree(&[
            ("S", &[]),
            ("NP", &["The", "color"]),
            ("SBAR", &[]),
            ("WHNP", &["that"]),
            ("S", &[]),
            ("NP", &["Greg"]),
            ("VP", &["chose"]),
            ("NP", &["maroon"]),
        ]);

        assert_eq!(
            apply_rule("Past Passive (WHNP_VP)", &t).as_deref(),
            Some("is(Greg, maroon)")
        );
    }

    #[test]
    fn test_past_passive_whnp_pp() {
        // "The person who chose maroon was 2 minutes ahead of Ida"
        let t = tree(&[
            ("S", &[]),
            ("NP", &["The", "person"]),
            ("SBAR", &[]),
            ("WHNP", &["who"]),
            ("S", &[]),
            ("VP", &["chose"]),
            ("NP", &["maroon"]),
            ("VP", &["was"]),
            ("NP", &["2", "minutes", "ahead"]),
            ("PP", &["of"]),
            ("NP", &["Ida"]),
        ]);

        // The subject span covers the whole relative clause
        assert_eq!(
            apply_rule("Past Passive (WHNP_PP)", &t).as_deref(),
            Some("ahead(maroon, Ida, 2 minutes)")
        );

        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        assert_eq!(PatternRuleSet::standard().unwrap().match_tree(&t, &ctx).len(), 1);
    }

    #[test]
    fn test_past_passive_whnp_adjp() {
        let t = tree(&[
            ("S", &[]),
            ("NP", &["The", "person"]),
            ("SBAR", &[]),
            ("WHNP", &["who"]),
            ("S", &[]),
            ("VP", &["chose"]),
            ("NP", &["maroon"]),
            ("VP", &["finished"]),
            ("NP", &["the", "race"]),
            ("ADJP", &["2", "minutes"]),
            ("ADVP", &["ahead"]),
            ("PP", &["of"]),
            ("NP", &["the", "person"]),
            ("SBAR", &[]),
            ("WHNP", &["who"]),
            ("S", &[]),
            ("VP", &["chose"]),
            ("NP", &["blue"]),
        ]);

        assert_eq!(
            apply_rule("Past Passive (WHNP_ADJP)", &t).as_deref(),
            Some("ahead(maroon, blue, 2 minutes)")
        );
    }

    #[test]
    fn test_vague_measure_falls_back_to_comparator_words() {
        let t = tree(&[
            ("S", &[]),
            ("NP", &["Greg"]),
            ("VP", &["ran"]),
            ("NP", &["somewhat"]),
            ("ADJP", &["2", "minutes", "longer"]),
            ("PP", &["than"]),
            ("NP", &["Vera"]),
        ]);

        assert_eq!(
            apply_rule("Present (ADJP)", &t).as_deref(),
            Some("longer(Greg, Vera, 2 minutes)")
        );
    }

    #[test]
    fn test_unmatched_tags() {
        let catalog = catalog();
        let ctx = ExtractContext::new(&catalog, false);
        let rules = PatternRuleSet::standard().unwrap();

        let t = tree(&[("S", &[]), ("ADVP", &["Greg"])]);
        assert!(rules.match_tree(&t, &ctx).is_empty());
    }
}
