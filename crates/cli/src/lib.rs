use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use triage_engine::{
    clamp_queue_capacity, clamp_workers, worker_count_from_env, RunOptions, ScanOptions,
    DEFAULT_CLIENT_PREFIX, DEFAULT_QUEUE_CAPACITY, DEFAULT_TRANSCRIPT_MARKER,
};
use triage_triggers::TriggerSet;

mod materialize;
mod pipeline;
mod report;

pub use materialize::{MaterializationWriter, MaterializeReport, REPORTS_DIR, TRIGGER_INFO_FILE};
pub use pipeline::{run_pipeline, PipelineConfig, RunSummary, TypeSummary};
pub use report::{render_index, render_statistics, IndexOptions, INDEX_FILE};

/// Flag values win over `TRIAGE_WORKERS`; both are clamped to the engine limits.
fn run_options(workers: Option<usize>, queue_capacity: usize) -> RunOptions {
    RunOptions {
        workers: workers.map_or_else(worker_count_from_env, clamp_workers),
        queue_capacity: clamp_queue_capacity(queue_capacity),
    }
}

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "dialog-triage")]
#[command(
    about = "Sort support dialogs into problem types by the trigger phrases clients use",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Directory with one subdirectory per dialog
    #[arg(long, default_value = "./output/conversations")]
    input: PathBuf,

    /// Directory receiving per-type copies, reports and INDEX.md
    #[arg(long, default_value = "./problematicDialogs")]
    output: PathBuf,

    /// Trigger configuration (JSON or TOML); the bundled set is used when omitted
    #[arg(long)]
    triggers: Option<PathBuf>,

    /// Folders scanned concurrently (overrides TRIAGE_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Capacity of the result queue between scanners and the aggregator
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// File name fragment identifying transcripts
    #[arg(long, default_value = DEFAULT_TRANSCRIPT_MARKER)]
    transcript_marker: String,

    /// Author id prefix of client messages (repeatable)
    #[arg(long = "client-prefix", default_value = DEFAULT_CLIENT_PREFIX)]
    client_prefixes: Vec<String>,

    /// Skip per-dialog JSON evidence reports
    #[arg(long)]
    no_json_reports: bool,

    /// Print the run summary as JSON instead of text statistics
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let triggers = match &cli.triggers {
        Some(path) => TriggerSet::from_file(path)
            .with_context(|| format!("Failed to load trigger config {}", path.display()))?,
        None => TriggerSet::builtin().context("Bundled trigger config is invalid")?,
    };
    log::debug!("Loaded {} problem types", triggers.len());

    let config = PipelineConfig {
        input: cli.input,
        output: cli.output,
        triggers: Arc::new(triggers),
        scan: ScanOptions {
            transcript_marker: cli.transcript_marker,
            client_prefixes: cli.client_prefixes,
        },
        run: run_options(cli.workers, cli.queue_capacity),
        json_reports: !cli.no_json_reports,
    };

    let (state, summary) = pipeline::run_pipeline(&config).await?;
    if cli.json {
        print_stdout(&serde_json::to_string_pretty(&summary)?)?;
    } else {
        print_stdout(&report::render_statistics(&state, &config.triggers))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use triage_engine::{MAX_QUEUE_CAPACITY, MAX_WORKERS};

    #[test]
    fn run_options_clamp_flag_values() {
        assert_eq!(
            run_options(Some(usize::MAX), usize::MAX),
            RunOptions {
                workers: MAX_WORKERS,
                queue_capacity: MAX_QUEUE_CAPACITY,
            }
        );
        assert_eq!(
            run_options(Some(0), 0),
            RunOptions {
                workers: 1,
                queue_capacity: 1,
            }
        );
        assert_eq!(run_options(Some(4), 10).workers, 4);
    }

    #[test]
    fn cli_accepts_repeated_client_prefixes() {
        let cli = Cli::try_parse_from([
            "dialog-triage",
            "--client-prefix",
            "user_",
            "--client-prefix",
            "client_",
            "--workers",
            "100000",
        ])
        .unwrap();
        assert_eq!(cli.client_prefixes, vec!["user_", "client_"]);
        assert_eq!(run_options(cli.workers, cli.queue_capacity).workers, MAX_WORKERS);
    }
}
