//! Placeholder substitution for parser-hostile entity names
//!
//! Some categories (numeric ages such as "109") break the external grammar
//! parser. When a clue fails to parse, names of that category are swapped for
//! neutral placeholders (`Entity1`, `Entity2`, ...), the clue is extracted
//! again, and the placeholders in the result are mapped back.

use clue_core::{EntityCatalog, Predicate, Result};

/// Literal <-> placeholder table for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySubstitution {
    category: String,
    /// (literal, placeholder) in category order
    table: Vec<(String, String)>,
}

impl EntitySubstitution {
    /// Build the table for `category`, or `None` when the catalog lacks it
    pub fn prepare(catalog: &EntityCatalog, category: &str, prefix: &str) -> Option<Self> {
        let entities = &catalog.category(category)?.entities;
        let table = entities
            .iter()
            .enumerate()
            .map(|(i, literal)| (literal.clone(), format!("{}{}", prefix, i + 1)))
            .collect();

        Some(Self {
            category: category.to_string(),
            table,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Replace every literal occurrence with its placeholder
    pub fn substitute(&self, sentence: &str) -> String {
        replace_longest(sentence, self.table.iter().map(|(l, p)| (l.as_str(), p.as_str())))
    }

    /// Catalog whose volatile category holds the placeholders
    pub fn substitute_catalog(&self, catalog: &EntityCatalog) -> Result<EntityCatalog> {
        let placeholders = self.table.iter().map(|(_, p)| p.clone()).collect();
        catalog.with_category_entities(&self.category, placeholders)
    }

    /// Map placeholders in every entity slot back to their literals
    pub fn restore(&self, mut predicate: Predicate) -> Predicate {
        for slot in predicate.entities.iter_mut().flatten() {
            *slot = self.restore_text(slot);
        }
        predicate
    }

    pub fn restore_text(&self, text: &str) -> String {
        replace_longest(text, self.table.iter().map(|(l, p)| (p.as_str(), l.as_str())))
    }
}

/// Single left-to-right pass; at each position the longest matching key wins.
/// Replaced text is never rescanned, so "Entity1" cannot be hit by a key "1".
fn replace_longest<'a>(text: &str, pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut pairs: Vec<(&str, &str)> = pairs.filter(|(from, _)| !from.is_empty()).collect();
    pairs.sort_by_key(|(from, _)| std::cmp::Reverse(from.len()));

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match pairs.iter().find(|(from, _)| rest.starts_with(from)) {
            Some((from, to)) => {
                out.push_str(to);
                rest = &rest[from.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clue_core::{Category, Comparator};
    use proptest::prelude::*;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Category::new("names", vec!["Greg".into(), "Ida".into()]),
            Category::new("ages", vec!["1".into(), "11".into(), "109".into(), "110".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_prepare_missing_category() {
        assert!(EntitySubstitution::prepare(&catalog(), "lengths", "Entity").is_none());
    }

    #[test]
    fn test_substitute_sentence() {
        let sub = EntitySubstitution::prepare(&catalog(), "ages", "Entity").unwrap();
        assert_eq!(
            sub.substitute("Greg is 109 and Ida is 11, not 1"),
            "Greg is Entity3 and Ida is Entity2, not Entity1"
        );
        assert_eq!(sub.category(), "ages");
    }

    #[test]
    fn test_substitute_catalog() {
        let catalog = catalog();
        let sub = EntitySubstitution::prepare(&catalog, "ages", "Entity").unwrap();
        let replaced = sub.substitute_catalog(&catalog).unwrap();

        assert_eq!(
            replaced.category("ages").unwrap().entities,
            vec!["Entity1", "Entity2", "Entity3", "Entity4"]
        );
        assert_eq!(replaced.category("names"), catalog.category("names"));
    }

    #[test]
    fn test_restore_predicate() {
        let sub = EntitySubstitution::prepare(&catalog(), "ages", "Entity").unwrap();
        let predicate = Predicate {
            entities: vec![Some("Greg".into()), Some("xor(Entity3, Entity4)".into()), None],
            comparator: Comparator::Is,
            quantifier: None,
        };

        let restored = sub.restore(predicate);
        assert_eq!(
            restored.entities,
            vec![Some("Greg".into()), Some("xor(109, 110)".into()), None]
        );
    }

    #[test]
    fn test_restore_distinguishes_two_digit_placeholders() {
        let entities: Vec<String> = (1..=12).map(|i| format!("age{}", i * 7)).collect();
        let catalog = EntityCatalog::new(vec![Category::new("ages", entities)]).unwrap();
        let sub = EntitySubstitution::prepare(&catalog, "ages", "Entity").unwrap();

        assert_eq!(sub.restore_text("Entity12 and Entity1"), "age84 and age7");
    }

    proptest! {
        #[test]
        fn substitution_round_trips(
            ages in prop::collection::btree_set(1u32..200, 1..6),
            picks in prop::collection::vec(any::<prop::sample::Index>(), 1..4),
        ) {
            let ages: Vec<String> = ages.iter().map(|a| a.to_string()).collect();
            let catalog = EntityCatalog::new(vec![
                Category::new("names", vec!["Greg".into()]),
                Category::new("ages", ages.clone()),
            ]).unwrap();
            let sub = EntitySubstitution::prepare(&catalog, "ages", "Entity").unwrap();

            let chosen: Vec<String> = picks.iter().map(|i| i.get(&ages).clone()).collect();
            let sentence = format!("Greg is {} years old", chosen.join(" or "));

            let substituted = sub.substitute(&sentence);
            prop_assert_eq!(sub.restore_text(&substituted), sentence);

            let predicate = Predicate::new(
                chosen.iter().map(|a| sub.substitute(a)).collect(),
                Comparator::Is,
            );
            let restored = sub.restore(predicate);
            let expected: Vec<Option<String>> = chosen.into_iter().map(Some).collect();
            prop_assert_eq!(restored.entities, expected);
        }
    }
}
