//! CLUE Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the clue
//! extraction system:
//! - Entity catalog (categories and their entity names)
//! - Constituent parse trees (phrase tags and word spans)
//! - Predicates (comparator, entities, quantifier)
//! - Common error types
//! - Configuration management

pub mod catalog;
pub mod config;

pub use catalog::{Category, EntityCatalog};
pub use config::{
    AppConfig, BatchConfig, ConfigError, ExtractorConfig, LoggingConfig, ParserBackend,
    ParserConfig,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for clue extraction
#[derive(Error, Debug)]
pub enum ClueError {
    #[error("No linkages found by the external parser")]
    NoLinkageFound,

    #[error("No viable entity/comparison/quantifier parses found (tried {tried} linkages)")]
    NoViableExtraction { tried: usize },

    #[error("Parser backend error: {0}")]
    ParserBackend(String),

    #[error("Invalid pattern rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Invalid entity catalog: {0}")]
    InvalidCatalog(String),

    #[error("Problem formatting parse: {0}")]
    Format(String),

    #[error("IO error reading {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClueError {
    /// Whether this failure may be retried with entity substitution
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoLinkageFound | Self::NoViableExtraction { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClueError>;

// ============================================================================
// Tokens
// ============================================================================

/// Lowercase a token span and join it with single spaces
pub fn join_lower<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| w.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercase and strip all whitespace ("Sail Boat" -> "sailboat")
pub fn compact(text: &str) -> String {
    text.split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

/// Split sentence text into word tokens, trimming surrounding punctuation
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Parse Trees
// ============================================================================

/// Phrase-type tag of a constituent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PhraseTag {
    S,
    Np,
    Vp,
    Pp,
    Adjp,
    Advp,
    Sbar,
    Whnp,
    /// Any tag outside the known vocabulary, kept verbatim
    Other(String),
}

impl PhraseTag {
    /// Get the string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::S => "S",
            Self::Np => "NP",
            Self::Vp => "VP",
            Self::Pp => "PP",
            Self::Adjp => "ADJP",
            Self::Advp => "ADVP",
            Self::Sbar => "SBAR",
            Self::Whnp => "WHNP",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for PhraseTag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "S" => Self::S,
            "NP" => Self::Np,
            "VP" => Self::Vp,
            "PP" => Self::Pp,
            "ADJP" => Self::Adjp,
            "ADVP" => Self::Advp,
            "SBAR" => Self::Sbar,
            "WHNP" => Self::Whnp,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for PhraseTag {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<PhraseTag> for String {
    fn from(tag: PhraseTag) -> Self {
        tag.as_str().to_string()
    }
}

impl std::fmt::Display for PhraseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A labeled constituent span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseNode {
    #[serde(rename = "type", alias = "category")]
    pub category: PhraseTag,
    #[serde(default)]
    pub words: Vec<String>,
}

impl PhraseNode {
    pub fn new(category: impl Into<PhraseTag>, words: &[&str]) -> Self {
        Self {
            category: category.into(),
            words: words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// One candidate flat constituent parse of a sentence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParseTree {
    pub nodes: Vec<PhraseNode>,
}

impl ParseTree {
    pub fn new(nodes: Vec<PhraseNode>) -> Self {
        Self { nodes }
    }

    /// Space-joined phrase tags, e.g. `S NP VP PP NP`
    pub fn tag_sequence(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.category.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All words covered by the tree, in node order
    pub fn words(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .flat_map(|n| n.words.iter().map(String::as_str))
            .collect()
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Relation between the entities of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    // Default equality
    Is,
    // Mutual exclusion of listed entities
    Not,

    // Temporal
    After,
    Before,

    // Magnitude
    More,
    Less,
    Fewer,
    Larger,
    Smaller,
    Taller,
    Shorter,
    Higher,
    Lower,
    Older,
    Younger,

    // Spatial / ordinal
    Ahead,
    Behind,
    Farther,
    Closer,
    Further,
    Nearer,
    Longer,
}

impl Comparator {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::Not => "not",
            Self::After => "after",
            Self::Before => "before",
            Self::More => "more",
            Self::Less => "less",
            Self::Fewer => "fewer",
            Self::Larger => "larger",
            Self::Smaller => "smaller",
            Self::Taller => "taller",
            Self::Shorter => "shorter",
            Self::Higher => "higher",
            Self::Lower => "lower",
            Self::Older => "older",
            Self::Younger => "younger",
            Self::Ahead => "ahead",
            Self::Behind => "behind",
            Self::Farther => "farther",
            Self::Closer => "closer",
            Self::Further => "further",
            Self::Nearer => "nearer",
            Self::Longer => "longer",
        }
    }

    /// Look up a clue word in the comparator vocabulary.
    ///
    /// Only relation words are recognized; `is` and `not` are never read
    /// from the sentence.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "after" => Some(Self::After),
            "before" => Some(Self::Before),
            "more" => Some(Self::More),
            "less" => Some(Self::Less),
            "fewer" => Some(Self::Fewer),
            "larger" => Some(Self::Larger),
            "smaller" => Some(Self::Smaller),
            "taller" => Some(Self::Taller),
            "shorter" => Some(Self::Shorter),
            "higher" => Some(Self::Higher),
            "lower" => Some(Self::Lower),
            "older" => Some(Self::Older),
            "younger" => Some(Self::Younger),
            "ahead" => Some(Self::Ahead),
            "behind" => Some(Self::Behind),
            "farther" => Some(Self::Farther),
            "closer" => Some(Self::Closer),
            "further" => Some(Self::Further),
            "nearer" => Some(Self::Nearer),
            "longer" => Some(Self::Longer),
            _ => None,
        }
    }

    /// Whether this is the default equality relation
    pub fn is_default(&self) -> bool {
        *self == Self::Is
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Amount modifying a comparator, e.g. "2 minutes"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantifier {
    /// Numeric value as written in the clue
    pub value: String,
    /// Category-type label, when one was found
    pub unit: Option<String>,
}

impl Quantifier {
    pub fn new(value: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            value: value.into(),
            unit,
        }
    }

    /// Quantifier tokens in output order
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens = vec![self.value.as_str()];
        if let Some(unit) = &self.unit {
            tokens.push(unit);
        }
        tokens
    }
}

impl std::fmt::Display for Quantifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}

/// Structured relation extracted from one clue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Entity slots; a slot is empty when an either/or half had no entity
    pub entities: Vec<Option<String>>,
    pub comparator: Comparator,
    pub quantifier: Option<Quantifier>,
}

impl Predicate {
    pub fn new(entities: Vec<String>, comparator: Comparator) -> Self {
        Self {
            entities: entities.into_iter().map(Some).collect(),
            comparator,
            quantifier: None,
        }
    }

    pub fn with_quantifier(mut self, quantifier: Option<Quantifier>) -> Self {
        self.quantifier = quantifier;
        self
    }

    /// Whether any entity slot holds an either/or group
    pub fn has_xor(&self) -> bool {
        self.entities
            .iter()
            .flatten()
            .any(|e| e.starts_with("xor("))
    }

    /// Count of populated fields (entities, comparator, quantifier)
    pub fn populated_fields(&self) -> usize {
        let entities = usize::from(self.entities.iter().any(Option::is_some));
        let quantifier = usize::from(self.quantifier.is_some());
        entities + 1 + quantifier
    }

    /// Render as `comparator(entity1, entity2[, quantifier])`
    pub fn render(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.entities.len() + 1);
        for (i, slot) in self.entities.iter().enumerate() {
            match slot {
                Some(entity) => parts.push(entity.clone()),
                None => {
                    return Err(ClueError::Format(format!(
                        "entity slot {} is empty in {:?}",
                        i + 1,
                        self.entities
                    )))
                }
            }
        }
        if let Some(quantifier) = &self.quantifier {
            parts.push(quantifier.to_string());
        }
        Ok(format!("{}({})", self.comparator, parts.join(", ")))
    }
}

// ============================================================================
// Tests
// ============================================================================
