//! Entity catalog
//!
//! Known entity names grouped by category, loaded once per puzzle from the
//! two-block `entities.txt` format:
//!
//! ```text
//! names, colors, ages
//!
//! Greg, Ida, Vera
//! maroon, teal, white
//! 109, 110, 111
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ClueError, Result};

/// Separator between values on a catalog line
const VALUE_SEPARATOR: &str = ", ";

/// A named group of entity names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub entities: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, entities: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entities,
        }
    }
}

/// Immutable catalog of categories and their entity names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCatalog {
    categories: Vec<Category>,
}

impl EntityCatalog {
    /// Build a catalog, checking that categories are non-empty and
    /// entity names are unique across categories
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let mut seen = HashSet::new();

        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(ClueError::InvalidCatalog(
                    "category name is empty".to_string(),
                ));
            }
            if category.entities.is_empty() {
                return Err(ClueError::InvalidCatalog(format!(
                    "category '{}' has no entities",
                    category.name
                )));
            }
            for entity in &category.entities {
                if entity.trim().is_empty() {
                    return Err(ClueError::InvalidCatalog(format!(
                        "category '{}' contains an empty entity name",
                        category.name
                    )));
                }
                if !seen.insert(entity.as_str()) {
                    return Err(ClueError::InvalidCatalog(format!(
                        "entity '{}' appears more than once",
                        entity
                    )));
                }
            }
        }

        Ok(Self { categories })
    }

    /// Parse the two-block text format
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.replace("\r\n", "\n");
        let (header, body) = content.split_once("\n\n").ok_or_else(|| {
            ClueError::InvalidCatalog(
                "expected a category line, a blank line, then one line per category".to_string(),
            )
        })?;

        let names: Vec<&str> = header.trim().split(VALUE_SEPARATOR).map(str::trim).collect();
        let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();

        if lines.len() != names.len() {
            return Err(ClueError::InvalidCatalog(format!(
                "{} categories declared but {} value lines found",
                names.len(),
                lines.len()
            )));
        }

        let categories = names
            .iter()
            .zip(lines)
            .map(|(name, line)| {
                let entities = line
                    .trim()
                    .split(VALUE_SEPARATOR)
                    .map(|e| e.trim().to_string())
                    .collect();
                Category::new(*name, entities)
            })
            .collect();

        Self::new(categories)
    }

    /// Load from an `entities.txt` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ClueError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Find a category by name
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Category names in declaration order
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// All entity names across categories, in declaration order
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|c| c.entities.iter().map(String::as_str))
    }

    /// Copy of this catalog with one category's entities replaced
    pub fn with_category_entities(&self, name: &str, entities: Vec<String>) -> Result<Self> {
        if self.category(name).is_none() {
            return Err(ClueError::InvalidCatalog(format!(
                "unknown category '{}'",
                name
            )));
        }

        let categories = self
            .categories
            .iter()
            .map(|c| {
                if c.name == name {
                    Category::new(name, entities.clone())
                } else {
                    c.clone()
                }
            })
            .collect();

        Self::new(categories)
    }
}

// ============================================================================
// Tests
// ============================================================================
