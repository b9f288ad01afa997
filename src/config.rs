//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ctrlreport.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".ctrlreport.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Console report settings.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// JSON document settings.
    #[serde(default)]
    pub document: DocumentConfig,

    /// Event normalization settings.
    #[serde(default)]
    pub collector: CollectorSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Path of the JSON document.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "ctrlreport.json".to_string()
}

/// Console report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Print the incremental console report.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Emit ANSI colors.
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            color: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Layout of the JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStyle {
    /// Results nested under their profile's control definitions
    #[default]
    Grouped,
    /// Flat list of every record
    Minimal,
}

/// JSON document settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default)]
    pub style: DocumentStyle,
}

/// Event normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// Exception classes treated as plain assertion failures.
    #[serde(default = "default_assertion_classes")]
    pub assertion_classes: Vec<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            assertion_classes: default_assertion_classes(),
        }
    }
}

fn default_assertion_classes() -> Vec<String> {
    crate::collector::CollectorConfig::default().assertion_classes
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(style) = args.style {
            self.document.style = style;
        }

        if args.no_color {
            self.console.color = false;
        }
        if args.no_console {
            self.console.enabled = false;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
