use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::data_processors::TimestampProcessor;
use crate::error::{MetricsError, Result};
use crate::revenue_model::RevenueModelConfig;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Engagement tagging and revenue estimates for creator dashboards
#[derive(Parser, Debug, Clone)]
#[command(
    name = "creator-metrics",
    about = "Engagement tagging and revenue estimates for creator dashboards",
    version
)]
pub struct Settings {
    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Revenue model JSON file (defaults to ~/.creator-metrics/revenue_model.json)
    #[arg(long, global = true, env = "CREATOR_METRICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Reference time for age calculations (defaults to now)
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Emit JSON instead of a text report
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Tag sent messages from a JSONL event export (file or directory)
    Engagement {
        /// JSONL file or directory of JSONL files
        input: PathBuf,
    },

    /// Estimate impressions and revenue
    Estimate {
        /// JSONL file or directory of episodes; omit to estimate a single episode
        #[arg(long, conflicts_with = "age_days")]
        episodes: Option<PathBuf>,

        /// Episode age in days
        #[arg(long, allow_hyphen_values = true)]
        age_days: Option<i64>,

        /// Number of ad reads in the episode
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        ad_reads: i64,

        /// Episode is read by a certified voice
        #[arg(long)]
        certified: bool,
    },

    /// Parse a featured-content CSV
    Featured {
        /// CSV file with a header row
        input: PathBuf,

        /// Maximum number of data lines to read after the header
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Manage dismissed notices and consent
    Notice {
        #[command(subcommand)]
        action: NoticeAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum NoticeAction {
    /// Hide a notice
    Dismiss { name: String },
    /// Show a previously dismissed notice again
    Restore { name: String },
    /// Record the consent answer
    Consent {
        #[arg(value_parser = ["accept", "decline"])]
        answer: String,
    },
    /// Print consent and, if given, one notice's state
    Status { name: Option<String> },
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and apply `--debug`.
    pub fn load() -> Self {
        Self::resolve(Self::parse())
    }

    /// Same as [`load`](Self::load) for an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map(Self::resolve)
    }

    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Path of the revenue model file in effect.
    pub fn revenue_model_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(RevenueModelConfig::config_path)
    }

    /// Load the revenue model. An explicit `--config` must exist and parse;
    /// the default location falls back to built-in values.
    pub fn revenue_model(&self) -> Result<RevenueModelConfig> {
        match &self.config {
            Some(path) => {
                if !path.exists() {
                    return Err(MetricsError::DataPathNotFound(path.clone()));
                }
                RevenueModelConfig::try_load_from(path)
            }
            None => Ok(RevenueModelConfig::load_from(&self.revenue_model_path())),
        }
    }

    /// Reference time: `--now` when given, otherwise the current time.
    pub fn reference_time(&self) -> Result<DateTime<Utc>> {
        match &self.now {
            Some(raw) => TimestampProcessor::parse_str(raw)
                .ok_or_else(|| MetricsError::Config(format!("invalid --now value: {raw}"))),
            None => Ok(Utc::now()),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
