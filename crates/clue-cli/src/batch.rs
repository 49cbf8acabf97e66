//! Puzzle directory batch runner
//!
//! A puzzle directory holds `entities.txt`, `clues.txt`, an optional
//! `parseExpected.txt` and, for the file parser, `linkages.json`. Every clue
//! is extracted, compared with its expected line, printed, and the parsed
//! predicates are written to `parseActual.txt`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use clue_core::{
    AppConfig, BatchConfig, ClueError, EntityCatalog, ParserBackend, ParserConfig, Predicate,
};
use clue_extractor::{
    CommandParser, Extraction, Grade, LinkageFile, LinkageParser, ParseMetrics, PatternRuleSet,
    SentenceExtractor, Strategy, Verdict,
};

// ============================================================================
// Parser selection
// ============================================================================

/// Build the configured parser adapter; linkage files resolve against `dir`
pub fn build_parser(config: &ParserConfig, dir: &Path) -> Result<Arc<dyn LinkageParser>> {
    match config.backend {
        ParserBackend::Command => {
            let program = config
                .command
                .as_deref()
                .context("parser.command is required for the command backend")?;
            Ok(Arc::new(
                CommandParser::new(program)
                    .with_args(config.args.clone())
                    .with_timeout(Duration::from_secs(config.timeout_secs)),
            ))
        }
        ParserBackend::File => {
            let path = dir.join(&config.linkage_file);
            if !path.exists() {
                warn!(path = %path.display(), "linkage file not found, every clue will lack a parse");
                return Ok(Arc::new(LinkageFile::default()));
            }
            let linkages = LinkageFile::from_file(&path)
                .with_context(|| format!("Failed to load linkages from {}", path.display()))?;
            debug!(path = %path.display(), sentences = linkages.len(), "linkages loaded");
            Ok(Arc::new(linkages))
        }
    }
}

/// Text written for a predicate; a rendering problem is kept inline
pub fn render_line(predicate: &Predicate) -> String {
    match predicate.render() {
        Ok(line) => line,
        Err(e) => {
            warn!(error = %e, ?predicate, "could not format predicate");
            format!("{}({})", predicate.comparator, e)
        }
    }
}

// ============================================================================
// Puzzle input
// ============================================================================

/// Files of one puzzle directory
#[derive(Debug, Clone)]
pub struct PuzzleInput {
    pub catalog: EntityCatalog,
    /// Non-blank clues with their 1-based line in the clue file
    pub clues: Vec<(usize, String)>,
    /// Non-blank expected lines; the k-th one belongs to the k-th clue
    pub expected: Option<Vec<String>>,
}

impl PuzzleInput {
    pub fn load(dir: &Path, config: &BatchConfig) -> Result<Self> {
        let catalog = EntityCatalog::from_file(dir.join(&config.entities_file))
            .with_context(|| format!("Failed to load entities for {}", dir.display()))?;

        let clues_path = dir.join(&config.clues_file);
        let clues = read_statements(&clues_path)
            .with_context(|| format!("Failed to read clues from {}", clues_path.display()))?;

        let expected_path = dir.join(&config.expected_file);
        let expected = if expected_path.exists() {
            let lines = read_statements(&expected_path).with_context(|| {
                format!("Failed to read expected parses from {}", expected_path.display())
            })?;
            Some(lines.into_iter().map(|(_, line)| line).collect())
        } else {
            None
        };

        Ok(Self {
            catalog,
            clues,
            expected,
        })
    }

    /// Expected line for the `k`-th clue
    fn expected_for(&self, k: usize) -> Option<&str> {
        self.expected.as_ref()?.get(k).map(|s| s.as_str())
    }
}

/// Trimmed non-blank lines paired with their 1-based line number
fn read_statements(path: &Path) -> std::io::Result<Vec<(usize, String)>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect())
}

/// Immediate subdirectories of `root`, sorted by path
pub fn nested_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)
        .with_context(|| format!("Failed to list puzzle directories in {}", root.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

// ============================================================================
// Reports
// ============================================================================

/// Result of one clue
#[derive(Debug, Clone, Serialize)]
pub struct ClueOutcome {
    /// 1-based line number in the clue file
    pub line: usize,
    pub sentence: String,
    pub actual: Option<String>,
    pub expected: Option<String>,
    pub verdict: Verdict,
    pub strategy: Option<Strategy>,
    pub error: Option<String>,
}

impl ClueOutcome {
    fn new(line: usize, sentence: String, expected: Option<&str>, result: clue_core::Result<Extraction>) -> Self {
        let (actual, strategy, error) = match result {
            Ok(extraction) => (
                Some(render_line(&extraction.predicate)),
                Some(extraction.strategy),
                None,
            ),
            Err(e) => (None, None, Some(e.to_string())),
        };

        Self {
            line,
            verdict: Verdict::classify(actual.as_deref(), expected),
            expected: expected.map(str::to_string),
            sentence,
            actual,
            strategy,
            error,
        }
    }
}

/// Outcome of one puzzle directory
#[derive(Debug, Clone, Serialize)]
pub struct PuzzleReport {
    pub dir: PathBuf,
    pub metrics: ParseMetrics,
    pub clues: Vec<ClueOutcome>,
}

/// Outcome of a whole run, written with `--report`
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub metrics: ParseMetrics,
    pub grade: Grade,
    pub puzzles: Vec<PuzzleReport>,
    /// Directories that could not be processed
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs puzzle directories with a bounded pool of extraction tasks
pub struct BatchRunner {
    config: AppConfig,
    rules: Arc<PatternRuleSet>,
}

impl BatchRunner {
    pub fn new(config: AppConfig, rules: Arc<PatternRuleSet>) -> Self {
        Self { config, rules }
    }

    /// Process every directory; a directory that fails to load is skipped
    pub async fn run(&self, dirs: &[PathBuf]) -> BatchReport {
        let mut metrics = ParseMetrics::new();
        let mut puzzles = Vec::with_capacity(dirs.len());
        let mut skipped = Vec::new();

        for dir in dirs {
            match self.run_puzzle(dir).await {
                Ok(report) => {
                    metrics.merge(&report.metrics);
                    puzzles.push(report);
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %format!("{:#}", e), "skipping puzzle");
                    eprintln!("{}: {:#}", "error".red().bold(), e);
                    skipped.push(dir.clone());
                }
            }
        }

        BatchReport {
            generated_at: Utc::now(),
            grade: metrics.grade(),
            metrics,
            puzzles,
            skipped,
        }
    }

    pub async fn run_puzzle(&self, dir: &Path) -> Result<PuzzleReport> {
        let batch = &self.config.batch;
        let input = PuzzleInput::load(dir, batch)?;
        let parser = build_parser(&self.config.parser, dir)?;
        let extractor = SentenceExtractor::new(
            parser,
            Arc::clone(&self.rules),
            Arc::new(input.catalog.clone()),
            self.config.extractor.clone(),
        );

        println!();
        println!("{}", dir.display().to_string().blue());
        info!(dir = %dir.display(), clues = input.clues.len(), workers = batch.workers, "processing puzzle");

        // `buffered` yields in submission order, so output order never depends on workers
        let results: Vec<clue_core::Result<Extraction>> = stream::iter(input.clues.clone())
            .map(|(_, sentence)| {
                let extractor = extractor.clone();
                async move {
                    tokio::task::spawn_blocking(move || extractor.extract(&sentence))
                        .await
                        .unwrap_or_else(|e| Err(ClueError::Other(anyhow::anyhow!("extraction task failed: {}", e))))
                }
            })
            .buffered(batch.workers.max(1))
            .collect()
            .await;

        let mut metrics = ParseMetrics::new();
        let mut actuals = Vec::new();
        let mut clues = Vec::with_capacity(results.len());

        for (k, ((line, sentence), result)) in input.clues.iter().zip(results).enumerate() {
            let outcome = ClueOutcome::new(*line, sentence.clone(), input.expected_for(k), result);
            print_outcome(&outcome, input.expected.is_some(), batch.quiet);

            metrics.record(outcome.verdict);
            if let Some(actual) = &outcome.actual {
                actuals.push(actual.clone());
            }
            clues.push(outcome);
        }

        let actual_path = dir.join(&batch.actual_file);
        std::fs::write(&actual_path, format!("{}\n", actuals.join("\n")))
            .with_context(|| format!("Failed to write {}", actual_path.display()))?;

        info!(
            dir = %dir.display(),
            total = metrics.total,
            success = metrics.success,
            fail = metrics.fail,
            "puzzle done"
        );

        Ok(PuzzleReport {
            dir: dir.to_path_buf(),
            metrics,
            clues,
        })
    }
}

// ============================================================================
// Console output
// ============================================================================

fn print_outcome(outcome: &ClueOutcome, has_expected: bool, quiet: bool) {
    let quiet_hides = quiet && outcome.verdict == Verdict::Match;
    if !quiet_hides {
        println!("{}", format!("{}. {}", outcome.line, outcome.sentence).dimmed());
    }

    match (&outcome.actual, outcome.verdict) {
        (Some(actual), Verdict::Match) => {
            if !has_expected {
                println!("   {} (Actual)", actual);
            } else if !quiet {
                let mark = if outcome.expected.is_some() { "\u{2713}" } else { " " };
                println!("{}  {}", mark.bright_green(), actual);
            }
        }
        (Some(actual), _) => {
            println!("{}  {}\t (Actual)", "x".yellow(), actual);
            if let Some(expected) = &outcome.expected {
                println!("{}", format!("   {}\t (Expected)", expected).yellow());
            }
        }
        (None, _) => {
            let reason = outcome.error.as_deref().unwrap_or("no predicate");
            println!("{}  {}", "x".bright_red(), reason.bright_red());
            if let Some(expected) = &outcome.expected {
                println!("{}", format!("   {}\t (Expected)", expected).purple());
            }
        }
    }
}

/// Final grade banner and `N% success - S of T total statements`
pub fn print_summary(report: &BatchReport) {
    println!();
    println!();
    let banner = format!("## {}", report.grade);
    let banner = match report.grade {
        Grade::Failure => banner.red(),
        Grade::Decent => banner.yellow(),
        Grade::Success => banner.green(),
    };
    println!("{}", banner.bold());
    println!("{}", report.metrics.summary().white());
    if !report.skipped.is_empty() {
        println!(
            "{} {} puzzle director{} skipped",
            "WARNING:".yellow(),
            report.skipped.len(),
            if report.skipped.len() == 1 { "y" } else { "ies" }
        );
    }
    println!();
}

// ============================================================================
// Tests
// ============================================================================
