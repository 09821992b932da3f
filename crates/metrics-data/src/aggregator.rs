//! Revenue estimates across an episode catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use metrics_core::models::Episode;
use metrics_core::revenue::{EpisodeEstimate, RevenueEstimator};
use serde::Serialize;

// ── CatalogTotals ─────────────────────────────────────────────────────────────

/// Sums over a set of episode estimates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogTotals {
    pub episodes: usize,
    pub impressions: i64,
    pub revenue: f64,
    pub platform_revenue: f64,
    pub creator_revenue: f64,
}

impl CatalogTotals {
    /// Add one estimate to the running totals.
    pub fn add_estimate(&mut self, estimate: &EpisodeEstimate) {
        self.episodes += 1;
        self.impressions += estimate.impressions;
        self.revenue += estimate.revenue;
        self.platform_revenue += estimate.split.platform;
        self.creator_revenue += estimate.split.creator;
    }
}

// ── CatalogReport ─────────────────────────────────────────────────────────────

/// Per-episode estimates plus totals, overall and by publication month.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
    pub estimates: Vec<EpisodeEstimate>,
    /// Keyed by `"%Y-%m"` of the publish date, ascending.
    pub monthly: BTreeMap<String, CatalogTotals>,
    pub totals: CatalogTotals,
}

// ── CatalogAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that runs the estimator over many episodes.
pub struct CatalogAggregator;

impl CatalogAggregator {
    /// Estimate every episode as of `now`, preserving input order.
    pub fn estimate_catalog(
        episodes: &[Episode],
        estimator: &RevenueEstimator,
        now: DateTime<Utc>,
    ) -> CatalogReport {
        let mut monthly: BTreeMap<String, CatalogTotals> = BTreeMap::new();
        let mut estimates = Vec::with_capacity(episodes.len());

        for episode in episodes {
            let estimate = estimator.estimate_episode(episode, now);
            let month = episode.published_at.format("%Y-%m").to_string();
            monthly.entry(month).or_default().add_estimate(&estimate);
            estimates.push(estimate);
        }

        let totals = Self::calculate_totals(&estimates);

        tracing::debug!(
            episodes = totals.episodes,
            impressions = totals.impressions,
            revenue = totals.revenue,
            "catalog estimate complete"
        );

        CatalogReport {
            estimates,
            monthly,
            totals,
        }
    }

    /// Sum a set of already-computed estimates.
    pub fn calculate_totals(estimates: &[EpisodeEstimate]) -> CatalogTotals {
        let mut totals = CatalogTotals::default();
        for estimate in estimates {
            totals.add_estimate(estimate);
        }
        totals
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use metrics_core::revenue_model::RevenueModelConfig;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
    }

    fn episode(id: &str, days_ago: i64, ad_reads: i64, certified: bool) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("Episode {id}"),
            published_at: now() - Duration::days(days_ago),
            ad_read_count: ad_reads,
            certified_voice: certified,
        }
    }

    #[test]
    fn test_empty_catalog() {
        let report = CatalogAggregator::estimate_catalog(&[], &RevenueEstimator::default(), now());
        assert!(report.estimates.is_empty());
        assert!(report.monthly.is_empty());
        assert_eq!(report.totals, CatalogTotals::default());
    }

    #[test]
    fn test_totals_sum_estimates() {
        let episodes = vec![
            episode("new", 10, 2, false),  // 1800 impressions, $45
            episode("old", 100, 0, false), // 1000 impressions, $25
        ];
        let report =
            CatalogAggregator::estimate_catalog(&episodes, &RevenueEstimator::default(), now());

        assert_eq!(report.totals.episodes, 2);
        assert_eq!(report.totals.impressions, 2800);
        assert!((report.totals.revenue - 70.0).abs() < 1e-9);
        assert!((report.totals.platform_revenue - 21.0).abs() < 1e-9);
        assert!((report.totals.creator_revenue - 49.0).abs() < 1e-9);
        assert_eq!(report.estimates[0].episode_id, "new");
    }

    #[test]
    fn test_monthly_buckets_sorted() {
        let episodes = vec![
            episode("june", 5, 0, false),
            episode("march", 100, 0, false),
            episode("june-2", 1, 0, true),
        ];
        let report =
            CatalogAggregator::estimate_catalog(&episodes, &RevenueEstimator::default(), now());

        let keys: Vec<&str> = report.monthly.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2024-03", "2024-06"]);
        assert_eq!(report.monthly["2024-06"].episodes, 2);
    }

    #[test]
    fn test_custom_model_applies() {
        let estimator = RevenueEstimator::new(RevenueModelConfig {
            default_cpm: 10.0,
            ..Default::default()
        });
        let report = CatalogAggregator::estimate_catalog(&[episode("e", 100, 0, false)], &estimator, now());
        assert!((report.totals.revenue - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_totals_matches_report() {
        let episodes = vec![episode("a", 3, 1, true), episode("b", 40, 3, false)];
        let report =
            CatalogAggregator::estimate_catalog(&episodes, &RevenueEstimator::default(), now());
        assert_eq!(CatalogAggregator::calculate_totals(&report.estimates), report.totals);
    }
}
