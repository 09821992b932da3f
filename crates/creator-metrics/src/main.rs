mod bootstrap;
mod report;

use anyhow::{bail, Result};
use chrono::{DateTime, TimeDelta, Utc};
use metrics_core::models::{Episode, FeaturedItem};
use metrics_core::preferences::{DismissalFlags, JsonFileStore};
use metrics_core::revenue::RevenueEstimator;
use metrics_core::settings::{Command, NoticeAction, Settings};
use metrics_core::telemetry::{Telemetry, TelemetryEvent};
use metrics_data::aggregator::CatalogAggregator;
use metrics_data::analysis::analyze_engagement;
use metrics_data::csv::load_featured_file;
use metrics_data::reader::{load_episodes, load_sent_messages};
use serde::Serialize;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("creator-metrics v{} starting", env!("CARGO_PKG_VERSION"));

    let telemetry = Telemetry::tracing();
    telemetry.init();

    let now = settings.reference_time()?;

    match &settings.command {
        Command::Engagement { input } => {
            let messages = load_sent_messages(input)?;
            let analysis = analyze_engagement(&messages, now);
            telemetry.track(
                TelemetryEvent::new("engagement_report")
                    .with_property("messages", analysis.metadata.messages_analyzed.to_string())
                    .with_property("untagged", analysis.metadata.untagged.to_string()),
            );
            emit(&settings, &analysis, report::render_engagement)?;
        }

        Command::Estimate {
            episodes,
            age_days,
            ad_reads,
            certified,
        } => {
            let config = settings.revenue_model()?;
            tracing::debug!(path = %settings.revenue_model_path().display(), ?config, "revenue model");
            let estimator = RevenueEstimator::new(config);

            match (episodes, age_days) {
                (Some(path), _) => {
                    let episodes = load_episodes(path)?;
                    let catalog = CatalogAggregator::estimate_catalog(&episodes, &estimator, now);
                    telemetry.track(
                        TelemetryEvent::new("catalog_estimate")
                            .with_property("episodes", catalog.totals.episodes.to_string()),
                    );
                    emit(&settings, &catalog, report::render_catalog)?;
                }
                (None, Some(age)) => {
                    let episode = single_episode(*age, *ad_reads, *certified, now)?;
                    let estimate = estimator.estimate_episode(&episode, now);
                    telemetry.track(TelemetryEvent::new("episode_estimate"));
                    emit(&settings, &estimate, report::render_estimate)?;
                }
                (None, None) => bail!("estimate needs either --episodes or --age-days"),
            }
        }

        Command::Featured { input, limit } => {
            let items = load_featured_file(input, *limit)?;
            telemetry.track(
                TelemetryEvent::new("featured_loaded")
                    .with_property("items", items.len().to_string()),
            );
            emit(&settings, &items, |items: &Vec<FeaturedItem>| report::render_featured(items))?;
        }

        Command::Notice { action } => {
            let Some(store) = JsonFileStore::with_default_path() else {
                bail!("cannot locate the home directory for preferences");
            };
            let mut flags = DismissalFlags::new(store);
            match action {
                NoticeAction::Dismiss { name } => {
                    flags.dismiss(name)?;
                    telemetry.track(TelemetryEvent::new("notice_dismissed").with_property("notice", name));
                    println!("Dismissed {name}");
                }
                NoticeAction::Restore { name } => {
                    flags.restore(name)?;
                    println!("Restored {name}");
                }
                NoticeAction::Consent { answer } => {
                    flags.set_consent(answer == "accept")?;
                    telemetry.track(TelemetryEvent::new("consent").with_property("answer", answer));
                    println!("Consent recorded: {answer}");
                }
                NoticeAction::Status { name } => {
                    let consent = match flags.has_consented() {
                        Some(true) => "accepted",
                        Some(false) => "declined",
                        None => "unanswered",
                    };
                    println!("Consent: {consent}");
                    if let Some(name) = name {
                        let state = if flags.is_dismissed(name) { "dismissed" } else { "visible" };
                        println!("{name}: {state}");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Print `value` as pretty JSON under `--json`, otherwise via `render`.
fn emit<T: Serialize>(settings: &Settings, value: &T, render: impl Fn(&T) -> String) -> Result<()> {
    if settings.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", render(value));
    }
    Ok(())
}

/// Ad-hoc episode for a one-off estimate from CLI flags.
///
/// Fails when `age_days` puts the publish date outside chrono's range.
fn single_episode(
    age_days: i64,
    ad_reads: i64,
    certified: bool,
    now: DateTime<Utc>,
) -> Result<Episode> {
    let Some(published_at) = TimeDelta::try_days(age_days).and_then(|age| now.checked_sub_signed(age))
    else {
        bail!("--age-days {age_days} is out of range");
    };
    Ok(Episode {
        id: "cli".to_string(),
        title: String::new(),
        published_at,
        ad_read_count: ad_reads,
        certified_voice: certified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_single_episode_age_round_trips() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let episode = single_episode(10, 2, false, now).unwrap();
        let estimate = RevenueEstimator::default().estimate_episode(&episode, now);
        assert_eq!(estimate.age_days, 10);
        assert_eq!(estimate.impressions, 1800);
    }

    #[test]
    fn test_single_episode_rejects_huge_age() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(single_episode(100_000_000, 0, false, now).is_err());
        assert!(single_episode(i64::MAX, 0, false, now).is_err());
        assert!(single_episode(-100_000_000, 0, false, now).is_err());
    }
}
