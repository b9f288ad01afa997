//! ctrlreport - profile/control reports from streamed test results
//!
//! Reads an arrival-ordered stream of test-execution events, groups them by
//! profile and control, prints an incremental console report and writes a
//! JSON document.
//!
//! Exit codes:
//!   0 - Success (no control above threshold, or no --fail-on set)
//!   1 - Runtime error (unreadable input, unwritable output, bad config)
//!   2 - A declared control reached the --fail-on severity

mod analysis;
mod cli;
mod collector;
mod config;
mod driver;
mod input;
mod models;
mod report;

use analysis::ControlAggregator;
use anyhow::{Context, Result};
use cli::{Args, FailOnLevel};
use collector::CollectorConfig;
use config::Config;
use driver::{Driver, Formatter};
use input::{load_profiles, EventReader};
use models::{ExecutionRecord, Profile};
use report::{DocumentFormatter, StaticTarget, StreamingRenderer, Style, TargetBackend};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is loaded before logging so `[general] verbose` can raise the level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose))?;

    info!("ctrlreport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run_report(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .ctrlreport.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    Ok(())
}

/// Initialize logging on stderr so stdout carries only the console report.
fn init_logging(level: tracing::Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the complete report workflow. Returns exit code (0 or 2).
fn run_report(args: Args, config: Config) -> Result<i32> {
    let profiles = match args.profiles {
        Some(ref path) => load_profiles(path)
            .with_context(|| format!("Failed to load profiles from {}", path.display()))?,
        None => {
            warn!("No profiles given; every record will be reported as ungrouped");
            Vec::new()
        }
    };
    info!("Loaded {} profiles", profiles.len());

    let events_path = args.events.clone().unwrap_or_else(|| PathBuf::from("-"));
    let events = EventReader::open(&events_path)
        .with_context(|| format!("Failed to open event stream {}", events_path.display()))?;

    let mut document = DocumentFormatter::new(
        config.document.style,
        PathBuf::from(&config.general.output),
    );
    let target = args
        .target
        .clone()
        .map(|uri| Box::new(StaticTarget(uri)) as Box<dyn TargetBackend>);
    let mut console = StreamingRenderer::new(
        std::io::stdout().lock(),
        Style::new(config.console.color),
        target,
    );

    let mut formatters: Vec<&mut dyn Formatter> = Vec::new();
    formatters.push(&mut document);
    if config.console.enabled {
        formatters.push(&mut console);
    }

    let driver = Driver::new(&profiles, CollectorConfig::from(&config.collector));
    let outcome = driver.run(events, &mut formatters)?;

    if outcome.skipped_events > 0 {
        warn!("{} malformed events were skipped", outcome.skipped_events);
    }
    info!(
        "Processed {} records in {:.2}s",
        outcome.records.len(),
        outcome.statistics.duration
    );

    // Check --fail-on threshold
    if let Some(level) = args.fail_on {
        if threshold_reached(&profiles, &outcome.records, level) {
            eprintln!(
                "\n⛔ Controls found at or above {:?} severity. Failing (exit code 2).",
                level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Whether any declared control's severity ranks at or above `level`.
fn threshold_reached(
    profiles: &[Profile],
    records: &[ExecutionRecord],
    level: FailOnLevel,
) -> bool {
    let mut aggregator = ControlAggregator::from_profiles(profiles);
    for record in records {
        aggregator.add(record);
    }

    let threshold = level.status_type().rank();
    aggregator
        .controls()
        .iter()
        .filter(|c| !c.is_anonymous() && c.is_declared())
        .any(|c| c.status_type().rank() >= threshold)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems are reported on stderr directly.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", config::CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
