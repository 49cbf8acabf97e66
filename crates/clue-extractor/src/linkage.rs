//! External parser adapters
//!
//! The grammar parser itself lives outside this crate. Two adapters feed its
//! output into the pipeline:
//! - [`LinkageFile`]: parses prepared ahead of time, keyed by sentence
//! - [`CommandParser`]: a subprocess that reads one sentence on stdin and
//!   writes a JSON array of trees on stdout

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::time::timeout;
use tracing::debug;

use clue_core::{ClueError, ParseTree, Result};

use crate::LinkageParser;

// ============================================================================
// Pre-parsed linkage file
// ============================================================================

/// Parse trees loaded from a JSON object `{ "<sentence>": [[node, ...], ...] }`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LinkageFile {
    linkages: HashMap<String, Vec<ParseTree>>,
}

impl LinkageFile {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ClueError::ParserBackend(format!("invalid linkage file: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ClueError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.linkages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linkages.is_empty()
    }
}

impl LinkageParser for LinkageFile {
    fn parse(&self, sentence: &str) -> Result<Vec<ParseTree>> {
        Ok(self
            .linkages
            .get(sentence.trim())
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Subprocess parser
// ============================================================================

/// Runs an external parser program once per sentence.
///
/// `parse` blocks on the ambient tokio runtime when there is one, so it must
/// be called from a blocking context such as `spawn_blocking`. Without a
/// runtime it drives a private current-thread runtime for the call.
#[derive(Debug, Clone)]
pub struct CommandParser {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandParser {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn backend_error(&self, message: impl std::fmt::Display) -> ClueError {
        ClueError::ParserBackend(format!("{}: {}", self.program.display(), message))
    }

    /// Feed the sentence on stdin and collect stdout within the timeout
    async fn run(&self, sentence: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.backend_error(e))?;

        let stdin = child.stdin.take();
        let exchange = async move {
            // A parser may exit without reading its input; its exit status decides
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(format!("{}\n", sentence).as_bytes()).await {
                    debug!(error = %e, "parser closed stdin early");
                }
            }
            child.wait_with_output().await
        };

        // Dropping the exchange on timeout kills the child and closes its pipes
        let output = timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                self.backend_error(format!("timed out after {}s", self.timeout.as_secs_f32()))
            })?
            .map_err(|e| self.backend_error(e))?;

        if !output.status.success() {
            return Err(self.backend_error(format!("exited with {}", output.status)));
        }

        String::from_utf8(output.stdout).map_err(|e| self.backend_error(format!("invalid UTF-8: {}", e)))
    }
}

impl LinkageParser for CommandParser {
    fn parse(&self, sentence: &str) -> Result<Vec<ParseTree>> {
        let output = match Handle::try_current() {
            Ok(handle) => handle.block_on(self.run(sentence))?,
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| self.backend_error(e))?
                .block_on(self.run(sentence))?,
        };

        debug!(bytes = output.len(), "parser output received");

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&output).map_err(|e| self.backend_error(format!("invalid JSON: {}", e)))
    }
}

// ============================================================================
// Tests
// ============================================================================
