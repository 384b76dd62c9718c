use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{MerError, Result};
use crate::month::MonthKey;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Convert and analyse MER killmail dumps by security class
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mer-stats",
    about = "Convert and analyse MER killmail dumps by security class",
    version
)]
pub struct Settings {
    /// Raw dump file to convert
    #[arg(long)]
    pub convert: Option<PathBuf>,

    /// Directory of raw dumps to convert (recursive)
    #[arg(long)]
    pub convert_dir: Option<PathBuf>,

    /// Declared raw dump format (detected from the file name or header when omitted)
    #[arg(long, value_parser = ["killmail", "regional", "summary"])]
    pub format: Option<String>,

    /// Directory for normalized output (defaults to --data-dir)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Normalized file to analyse for monthly statistics
    #[arg(long)]
    pub analyze: Option<PathBuf>,

    /// Analyse every month and plot the series
    #[arg(long)]
    pub plot: bool,

    /// Directory holding normalized <YYYYMM>_kill_dump.csv files
    #[arg(long, default_value = "./assets/killdump")]
    pub data_dir: PathBuf,

    /// First month of the series (YYYYMM)
    #[arg(long, default_value = "201606", value_parser = parse_month)]
    pub start: MonthKey,

    /// Last month of the series, inclusive (YYYYMM)
    #[arg(long, value_parser = parse_month)]
    pub until: Option<MonthKey>,

    /// Skip months that fail analysis instead of aborting the series
    #[arg(long)]
    pub skip_failed: bool,

    /// Analyse months concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Write the monthly series as JSON
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Print the report as plain text instead of the terminal UI
    #[arg(long)]
    pub plain: bool,

    /// Report configuration file
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Classification ruleset file
    #[arg(long, default_value = "ruleset.json")]
    pub ruleset: PathBuf,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "auto"])]
    pub theme: String,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

fn parse_month(s: &str) -> std::result::Result<MonthKey, String> {
    s.parse().map_err(|e: MerError| e.to_string())
}

impl Settings {
    /// Parse the process arguments.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let settings = Settings::parse_from(args);
        Self::resolve(settings)
    }

    /// Apply the `--debug` override.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Where normalized files are written: `--output-dir`, else `--data-dir`.
    pub fn effective_output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.data_dir)
    }
}

// ── ReportConfig ───────────────────────────────────────────────────────────────

/// Share of monthly active characters living in each class of space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distribution {
    pub highsec: f64,
    pub lowsec: f64,
    pub nullsec: f64,
    pub wormhole: f64,
}

/// Number of star systems in each class of space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemCounts {
    pub highsec: u32,
    pub lowsec: u32,
    pub nullsec: u32,
    pub jove: u32,
    pub wormhole: u32,
    pub abyssal: u32,
}

/// Report configuration read from `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Monthly active users.
    pub mau: u64,
    pub distribution: Distribution,
    pub systems: SystemCounts,
}

impl ReportConfig {
    /// Load the report configuration from `path`.
    ///
    /// A missing file yields the default (all-zero) configuration with a
    /// warning; unreadable or malformed content is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Report config {} not found; per-system ratios will be empty",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(MerError::SourceUnreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(serde_json::from_str(&content)?)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
