//! Proof worksheet batch tool
//!
//! Loads worksheets from disk and reports what the loader found, without any unification.
//!
//! # Usage
//!
//! ```bash
//! # Check worksheets, one after the other
//! cargo run -p proof-worksheet-cli -- check a.mmp b.mmp
//!
//! # Print a worksheet with steps renumbered 10, 20, 30, ...
//! cargo run -p proof-worksheet-cli -- renumber --interval 10 a.mmp
//!
//! # Start a worksheet for a theorem in a YAML theorem table
//! cargo run -p proof-worksheet-cli -- --theorems set.yaml skeleton syl
//! ```
//!
//! Log output goes to stderr and is filtered with `RUST_LOG` (default `warn`).
//!
//! # Exit status
//!
//! - `0`: every worksheet loaded without structural errors
//! - `1`: at least one worksheet is structurally broken or unreadable, or a command failed
//! - `2`: an internal (`A-`) message was reported

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use proof_worksheet::{LoadRequest, TheoremTable, Worksheet, WorksheetSettings};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proof-worksheet", version, about = "Check and rewrite proof worksheets")]
struct Cli {
    /// YAML settings file.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// YAML theorem table to check worksheets against.
    #[arg(long, global = true)]
    theorems: Option<PathBuf>,

    /// Character offset of the caller's cursor.
    #[arg(long, global = true)]
    cursor: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load each worksheet and print its messages.
    Check {
        /// Worksheet files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print a worksheet with its steps renumbered.
    Renumber {
        /// Step number increment; defaults to `renumber_interval` from the settings.
        #[arg(long)]
        interval: Option<u32>,
        /// Worksheet file.
        file: PathBuf,
    },
    /// Print a new worksheet for an existing theorem.
    Skeleton {
        /// Theorem label.
        label: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Outcome {
    Clean,
    Broken,
    Abort,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::Broken => ExitCode::from(1),
            Outcome::Abort => ExitCode::from(2),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(outcome) => outcome.into(),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<Outcome> {
    let settings = match &cli.settings {
        Some(path) => WorksheetSettings::from_path(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => WorksheetSettings::default(),
    };
    let theorems = match &cli.theorems {
        Some(path) => load_theorems(path)?,
        None => TheoremTable::new(),
    };
    let request = LoadRequest {
        cursor_offset: cli.cursor,
        ..LoadRequest::default()
    };

    match &cli.command {
        Command::Check { files } => Ok(check(files, &request, &settings, &theorems)),
        Command::Renumber { interval, file } => {
            let mut ws = Worksheet::load(&read(file)?, &request, &settings, &theorems);
            if ws.has_structural_errors() {
                report(file, &ws);
                return Ok(outcome(&ws));
            }
            let changed = ws.renumber(interval.unwrap_or(settings.renumber_interval))?;
            tracing::info!(file = %file.display(), changed, "renumbered");
            print!("{}", ws.output_text());
            Ok(outcome(&ws))
        }
        Command::Skeleton { label } => {
            if cli.theorems.is_none() {
                bail!("skeleton needs a theorem table (--theorems)");
            }
            let ws = Worksheet::skeleton(label, &theorems, &settings)?;
            print!("{}", ws.output_text());
            Ok(outcome(&ws))
        }
    }
}

/// Check every file; an unreadable file counts as broken and the rest are still checked.
fn check(
    files: &[PathBuf],
    request: &LoadRequest,
    settings: &WorksheetSettings,
    theorems: &TheoremTable,
) -> Outcome {
    let mut worst = Outcome::Clean;
    for path in files {
        let text = match read(path) {
            Ok(text) => text,
            Err(err) => {
                println!("{}: unreadable ({err:#})", path.display());
                worst = worst.max(Outcome::Broken);
                continue;
            }
        };
        let ws = Worksheet::load(&text, request, settings, theorems);
        report(path, &ws);
        worst = worst.max(outcome(&ws));
    }
    worst
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_theorems(path: &Path) -> Result<TheoremTable> {
    let yaml = read(path)?;
    let table = TheoremTable::from_yaml_str(&yaml)
        .with_context(|| format!("invalid theorem table {}", path.display()))?;
    tracing::debug!(theorems = table.len(), "loaded theorem table");
    Ok(table)
}

fn outcome(ws: &Worksheet) -> Outcome {
    if ws.messages().has_abort() {
        Outcome::Abort
    } else if ws.has_structural_errors() {
        Outcome::Broken
    } else {
        Outcome::Clean
    }
}

fn report(path: &Path, ws: &Worksheet) {
    let status = if ws.has_structural_errors() {
        "broken"
    } else {
        "ok"
    };
    println!(
        "{}: {status} ({} steps, {} messages)",
        path.display(),
        ws.proof_steps().count(),
        ws.messages().len()
    );
    for message in ws.messages().iter() {
        println!("  {message}");
    }
    if let Some(location) = ws.cursor_location() {
        println!("  cursor at {}", location.position);
    }
}
