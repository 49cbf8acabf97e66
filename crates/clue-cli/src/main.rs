//! CLUE CLI - Command-line interface
//!
//! Usage:
//!   clue run -i <puzzle-dir>... [-d] [-v] [-q] [-j N] [--report FILE]
//!   clue extract <sentence> --entities <file> [--linkages <file>]
//!   clue rules

mod batch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use clue_core::{AppConfig, EntityCatalog, LoggingConfig, ParserBackend};
use clue_extractor::{PatternRuleSet, SentenceExtractor};

use crate::batch::{build_parser, nested_dirs, print_summary, render_line, BatchRunner};

#[derive(Parser)]
#[command(name = "clue")]
#[command(about = "Extract structured predicates from logic puzzle clues")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log rule matches, rejections and fallbacks
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// External parser program; selects the command backend
    #[arg(long, global = true)]
    parser_cmd: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every clue of one or more puzzle directories
    Run {
        /// Puzzle directories
        #[arg(long, short = 'i', required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Treat the single input as a directory of puzzle directories
        #[arg(long, short = 'd')]
        directory: bool,

        /// Only print mismatches and failures
        #[arg(long, short = 'q')]
        quiet: bool,

        /// Sentences extracted concurrently
        #[arg(long, short = 'j')]
        workers: Option<usize>,

        /// Write a JSON summary of the run
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Extract a single sentence
    Extract {
        /// Clue sentence
        sentence: String,

        /// Entity catalog file
        #[arg(long, short = 'e')]
        entities: PathBuf,

        /// Pre-parsed linkage file
        #[arg(long, short = 'l')]
        linkages: Option<PathBuf>,
    },
    /// Validate and list the phrase rules
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.logging, cli.verbose || config.extractor.verbose);

    let rules = Arc::new(PatternRuleSet::standard().context("Invalid phrase rules")?);

    match cli.command {
        Commands::Run {
            input,
            directory,
            quiet,
            workers,
            report,
        } => {
            let mut config = config;
            config.batch.quiet |= quiet;
            if let Some(workers) = workers {
                config.batch.workers = workers;
            }
            config.validate()?;

            let dirs = if directory {
                let [root] = input.as_slice() else {
                    bail!("--directory takes exactly one input directory");
                };
                let dirs = nested_dirs(root)?;
                println!("NESTED DIRS:");
                for dir in &dirs {
                    println!("  {}", dir.display());
                }
                dirs
            } else {
                input
            };

            let summary = BatchRunner::new(config, rules).run(&dirs).await;
            print_summary(&summary);

            if let Some(path) = report {
                summary.write_json(&path)?;
                tracing::info!(path = %path.display(), "report written");
            }

            if summary.metrics.total == 0 {
                bail!("No clues were processed");
            }
        }
        Commands::Extract {
            sentence,
            entities,
            linkages,
        } => {
            let mut config = config;
            if let Some(linkages) = linkages {
                config.parser.backend = ParserBackend::File;
                config.parser.linkage_file = linkages.to_string_lossy().to_string();
            }
            extract_one(&config, rules, sentence, &entities).await?;
        }
        Commands::Rules => {
            for (i, rule) in rules.rules().iter().enumerate() {
                println!("{:>2}. {}", i + 1, rule.name().green().bold());
                println!("    {}", rule.pattern().dimmed());
            }
            println!("{} {} rules valid", "OK".green(), rules.rules().len());
        }
    }

    Ok(())
}

/// Defaults < config file < environment < command-line flags
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let mut config = config.with_env_override()?;

    if cli.verbose {
        config.extractor.verbose = true;
    }
    if let Some(program) = &cli.parser_cmd {
        config.parser.backend = ParserBackend::Command;
        config.parser.command = Some(program.clone());
    }
    if cli.log_json {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn extract_one(
    config: &AppConfig,
    rules: Arc<PatternRuleSet>,
    sentence: String,
    entities: &Path,
) -> Result<()> {
    let catalog = EntityCatalog::from_file(entities)
        .with_context(|| format!("Failed to load entities from {}", entities.display()))?;

    // Relative linkage paths resolve against the working directory
    let parser = build_parser(&config.parser, Path::new("."))?;
    let extractor = SentenceExtractor::new(
        parser,
        rules,
        Arc::new(catalog),
        config.extractor.clone(),
    );

    // The command backend blocks on the runtime, so extraction stays off the async workers
    let result = tokio::task::spawn_blocking(move || extractor.extract(&sentence))
        .await
        .context("Extraction task failed")?;

    match result {
        Ok(extraction) => {
            println!(
                "{}  {} ({})",
                "\u{2713}".bright_green(),
                render_line(&extraction.predicate),
                extraction.strategy.as_str()
            );
            Ok(())
        }
        Err(e) => {
            println!("{}  {}", "x".bright_red(), e.to_string().bright_red());
            bail!("Failed to extract a predicate")
        }
    }
}
