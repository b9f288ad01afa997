//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::DocumentStyle;
use crate::models::StatusType;
use clap::Parser;
use std::path::PathBuf;

/// ctrlreport - profile/control reports from streamed test results
///
/// Reads newline-delimited JSON test events in arrival order, groups them by
/// profile and control, prints an incremental console report and writes a
/// JSON document.
///
/// Examples:
///   ctrlreport --events run.ndjson --profiles profiles/
///   engine --json | ctrlreport --events - --profiles baseline.json --target ssh://web-1
///   ctrlreport --events run.ndjson --style minimal -o report.json
///   ctrlreport --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Event stream to read (one JSON event per line, "-" for stdin)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub events: Option<PathBuf>,

    /// Profile definitions: a JSON file or a directory of JSON files
    #[arg(short, long, value_name = "PATH", env = "CTRLREPORT_PROFILES")]
    pub profiles: Option<PathBuf>,

    /// Output file path for the JSON document
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Layout of the JSON document
    #[arg(long, value_name = "STYLE")]
    pub style: Option<DocumentStyle>,

    /// Target URI shown under each profile header
    #[arg(short, long, value_name = "URI", env = "CTRLREPORT_TARGET")]
    pub target: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ctrlreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable ANSI colors in the console report
    #[arg(long)]
    pub no_color: bool,

    /// Do not print the console report
    #[arg(long)]
    pub no_console: bool,

    /// Fail if any declared control reaches this severity
    ///
    /// Exit code 2 when the threshold is reached.
    /// Values: minor, major, failed, critical
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .ctrlreport.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Severity level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailOnLevel {
    Minor,
    Major,
    Failed,
    Critical,
}

impl FailOnLevel {
    /// Status type whose rank is the threshold.
    pub fn status_type(self) -> StatusType {
        match self {
            FailOnLevel::Minor => StatusType::Minor,
            FailOnLevel::Major => StatusType::Major,
            FailOnLevel::Failed => StatusType::Failed,
            FailOnLevel::Critical => StatusType::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref events) = self.events {
            if events.as_os_str() != "-" && !events.is_file() {
                return Err(format!("Event file does not exist: {}", events.display()));
            }
        }

        if let Some(ref profiles) = self.profiles {
            if !profiles.exists() {
                return Err(format!(
                    "Profile path does not exist: {}",
                    profiles.display()
                ));
            }
        }

        if let Some(ref target) = self.target {
            if target.trim().is_empty() {
                return Err("Target URI must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` overrides it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
