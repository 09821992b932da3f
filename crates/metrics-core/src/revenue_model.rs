use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Immutable monetisation parameters shared by every estimate in a process.
///
/// Each field falls back to its default independently, so a config file may
/// override just the CPM and leave everything else alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueModelConfig {
    /// Dollars earned per 1000 impressions.
    pub default_cpm: f64,
    /// Revenue scaling applied per ad read. At `1.0` ad reads leave revenue
    /// unchanged.
    pub ad_read_multiplier: f64,
    /// Impressions an episode earns before any bonus.
    pub base_impressions_per_episode: f64,
    /// Impression multiplier for episodes younger than
    /// `new_episode_threshold_days`.
    pub new_episode_bonus: f64,
    pub new_episode_threshold_days: f64,
    /// Fractional impression boost per ad read.
    pub ad_read_impression_bonus: f64,
    /// CPM multiplier for episodes read by a certified voice.
    pub certified_voice_cpm_multiplier: f64,
    /// Platform's cut of revenue. Expected to sum to 1.0 with
    /// `creator_revenue_share`; not enforced.
    pub platform_revenue_share: f64,
    pub creator_revenue_share: f64,
}

impl Default for RevenueModelConfig {
    fn default() -> Self {
        Self {
            default_cpm: 25.0,
            ad_read_multiplier: 1.0,
            base_impressions_per_episode: 1000.0,
            new_episode_bonus: 1.5,
            new_episode_threshold_days: 30.0,
            ad_read_impression_bonus: 0.1,
            certified_voice_cpm_multiplier: 1.25,
            platform_revenue_share: 0.30,
            creator_revenue_share: 0.70,
        }
    }
}

impl RevenueModelConfig {
    /// Default location: `~/.creator-metrics/revenue_model.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".creator-metrics").join("revenue_model.json")
    }

    /// Load from `path`, falling back to defaults when the file is absent or
    /// unreadable.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no revenue model file; using defaults");
            return Self::default();
        }
        match Self::try_load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "failed to load revenue model; using defaults"
                );
                Self::default()
            }
        }
    }

    /// Load from `path`, surfacing I/O and parse errors.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MetricsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        if (config.platform_revenue_share + config.creator_revenue_share - 1.0).abs() > 1e-9 {
            tracing::debug!(
                platform = config.platform_revenue_share,
                creator = config.creator_revenue_share,
                "revenue shares do not sum to 1.0"
            );
        }
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
