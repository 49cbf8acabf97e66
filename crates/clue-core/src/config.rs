//! CLUE Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Extraction pipeline configuration
    pub extractor: ExtractorConfig,

    /// External parser configuration
    pub parser: ParserConfig,

    /// Puzzle batch configuration
    pub batch: BatchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Extractor
        if let Ok(verbose) = std::env::var("CLUE_VERBOSE") {
            self.extractor.verbose = parse_bool("CLUE_VERBOSE", &verbose)?;
        }
        if let Ok(category) = std::env::var("CLUE_VOLATILE_CATEGORY") {
            self.extractor.volatile_category = Some(category).filter(|c| !c.is_empty());
        }

        // Parser
        if let Ok(backend) = std::env::var("CLUE_PARSER_BACKEND") {
            self.parser.backend = backend.parse()?;
        }
        if let Ok(command) = std::env::var("CLUE_PARSER_COMMAND") {
            self.parser.command = Some(command);
        }
        if let Ok(timeout) = std::env::var("CLUE_PARSER_TIMEOUT_SECS") {
            self.parser.timeout_secs = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CLUE_PARSER_TIMEOUT_SECS".to_string(),
                value: timeout,
            })?;
        }

        // Batch
        if let Ok(workers) = std::env::var("CLUE_WORKERS") {
            self.batch.workers = workers.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CLUE_WORKERS".to_string(),
                value: workers,
            })?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch.workers".to_string(),
                value: "0".to_string(),
            });
        }
        if self.parser.backend == ParserBackend::Command && self.parser.command.is_none() {
            return Err(ConfigError::MissingRequired("parser.command".to_string()));
        }
        if self.extractor.placeholder_prefix.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "extractor.placeholder_prefix".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Log rule matches, rejections and fallbacks
    pub verbose: bool,

    /// Category whose names are swapped for placeholders when parsing fails
    pub volatile_category: Option<String>,

    /// Placeholder stem; placeholders are numbered from 1
    pub placeholder_prefix: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            // Numeric-looking ages confuse the grammar parser
            volatile_category: Some("ages".to_string()),
            placeholder_prefix: "Entity".to_string(),
        }
    }
}

/// External grammar parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Which adapter supplies parse trees
    pub backend: ParserBackend,

    /// Pre-parsed linkage file, relative to the puzzle directory
    pub linkage_file: String,

    /// Program for the command backend
    pub command: Option<String>,

    /// Extra arguments for the command backend
    pub args: Vec<String>,

    /// Per-sentence timeout for the command backend
    pub timeout_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            backend: ParserBackend::File,
            linkage_file: "linkages.json".to_string(),
            command: None,
            args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// Supported parser adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserBackend {
    File,
    Command,
}

impl std::str::FromStr for ParserBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "command" => Ok(Self::Command),
            _ => Err(ConfigError::InvalidValue {
                key: "CLUE_PARSER_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Puzzle directory batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Sentences extracted concurrently
    pub workers: usize,

    /// Only print mismatches and failures
    pub quiet: bool,

    pub entities_file: String,
    pub clues_file: String,
    pub expected_file: String,
    pub actual_file: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            quiet: false,
            entities_file: "entities.txt".to_string(),
            clues_file: "clues.txt".to_string(),
            expected_file: "parseExpected.txt".to_string(),
            actual_file: "parseActual.txt".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
