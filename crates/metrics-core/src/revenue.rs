use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data_processors::round_half_up;
use crate::engagement::days_since_sent;
use crate::models::Episode;
use crate::revenue_model::RevenueModelConfig;

/// Revenue divided between the platform and the creator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevenueSplit {
    pub platform: f64,
    pub creator: f64,
}

/// Full estimate for a single episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeEstimate {
    pub episode_id: String,
    pub title: String,
    pub age_days: i64,
    pub ad_read_count: i64,
    pub certified_voice: bool,
    pub impressions: i64,
    pub revenue: f64,
    pub split: RevenueSplit,
}

/// Applies a [`RevenueModelConfig`] to episode metadata.
///
/// Every method is a pure function of its arguments and the config; none of
/// them validate input, so a negative ad-read count simply scales the
/// estimates down.
#[derive(Debug, Clone, Default)]
pub struct RevenueEstimator {
    config: RevenueModelConfig,
}

impl RevenueEstimator {
    pub fn new(config: RevenueModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RevenueModelConfig {
        &self.config
    }

    /// Estimated impressions for an episode `episode_age_days` old with
    /// `ad_read_count` ad reads.
    ///
    /// Applied in a fixed order, each factor once: base, recency bonus,
    /// ad-read bonus, then a single rounding step.
    pub fn calculate_impressions(&self, episode_age_days: i64, ad_read_count: i64) -> i64 {
        let c = &self.config;
        let mut impressions = c.base_impressions_per_episode;
        if (episode_age_days as f64) < c.new_episode_threshold_days {
            impressions *= c.new_episode_bonus;
        }
        impressions *= 1.0 + ad_read_count as f64 * c.ad_read_impression_bonus;
        round_half_up(impressions) as i64
    }

    /// Estimated revenue in dollars for `impressions`.
    ///
    /// The ad-read factor is `1 + ad_reads * (ad_read_multiplier - 1)`, which
    /// is exactly 1 when the multiplier is 1.0: with the default model ad
    /// reads raise impressions but not revenue per impression.
    pub fn calculate_revenue(&self, impressions: i64, ad_read_count: i64) -> f64 {
        let c = &self.config;
        let base = (impressions as f64 / 1000.0) * c.default_cpm;
        base * (1.0 + ad_read_count as f64 * (c.ad_read_multiplier - 1.0))
    }

    /// Revenue with the certified-voice CPM premium applied when `certified`.
    pub fn calculate_certified_revenue(
        &self,
        impressions: i64,
        ad_read_count: i64,
        certified: bool,
    ) -> f64 {
        let revenue = self.calculate_revenue(impressions, ad_read_count);
        if certified {
            revenue * self.config.certified_voice_cpm_multiplier
        } else {
            revenue
        }
    }

    /// Divide `revenue` by the configured platform and creator shares.
    pub fn split_revenue(&self, revenue: f64) -> RevenueSplit {
        RevenueSplit {
            platform: revenue * self.config.platform_revenue_share,
            creator: revenue * self.config.creator_revenue_share,
        }
    }

    /// Impressions, revenue and split for `episode` as of `now`.
    pub fn estimate_episode(&self, episode: &Episode, now: DateTime<Utc>) -> EpisodeEstimate {
        let age_days = days_since_sent(episode.published_at, now);
        let impressions = self.calculate_impressions(age_days, episode.ad_read_count);
        let revenue = self.calculate_certified_revenue(
            impressions,
            episode.ad_read_count,
            episode.certified_voice,
        );
        EpisodeEstimate {
            episode_id: episode.id.clone(),
            title: episode.title.clone(),
            age_days,
            ad_read_count: episode.ad_read_count,
            certified_voice: episode.certified_voice,
            impressions,
            revenue,
            split: self.split_revenue(revenue),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
