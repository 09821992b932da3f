//! Batch engagement analysis.
//!
//! Runs the aggregator and classifier over every loaded message and tallies
//! the tags for the dashboard summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use metrics_core::engagement::{days_since_sent, EngagementAggregator, EngagementClassifier};
use metrics_core::models::{EngagementStats, EngagementTag, SentMessage};
use serde::Serialize;
use tracing::debug;

/// Key used in the tag histogram for messages with no tag.
pub const UNTAGGED_KEY: &str = "none";

// ── Public types ──────────────────────────────────────────────────────────────

/// Per-message outcome.
#[derive(Debug, Clone, Serialize)]
pub struct MessageEngagement {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub days_since_sent: i64,
    pub stats: EngagementStats,
    pub tag: Option<EngagementTag>,
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub reference_time: String,
    pub messages_analyzed: usize,
    pub events_processed: usize,
    pub untagged: usize,
}

/// Output of [`analyze_engagement`].
#[derive(Debug, Clone, Serialize)]
pub struct EngagementReport {
    pub messages: Vec<MessageEngagement>,
    /// Count per tag key, plus [`UNTAGGED_KEY`] for messages without a tag.
    pub tag_counts: BTreeMap<String, usize>,
    pub metadata: ReportMetadata,
}

impl EngagementReport {
    /// Messages carrying `tag`, in input order.
    pub fn with_tag(&self, tag: EngagementTag) -> impl Iterator<Item = &MessageEngagement> {
        self.messages.iter().filter(move |m| m.tag == Some(tag))
    }

    pub fn count(&self, tag: Option<EngagementTag>) -> usize {
        let key = tag.map(|t| t.as_str()).unwrap_or(UNTAGGED_KEY);
        self.tag_counts.get(key).copied().unwrap_or(0)
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Aggregate and classify every message as of `now`.
///
/// Input order is preserved; each message's events are taken in the order
/// they were loaded.
pub fn analyze_engagement(messages: &[SentMessage], now: DateTime<Utc>) -> EngagementReport {
    let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut events_processed = 0usize;

    let results: Vec<MessageEngagement> = messages
        .iter()
        .map(|message| {
            events_processed += message.events.len();
            let stats = EngagementAggregator::aggregate(&message.events, message.sent_at);
            let days = days_since_sent(message.sent_at, now);
            let tag = EngagementClassifier::classify(&stats, days);

            let key = tag.map(|t| t.as_str()).unwrap_or(UNTAGGED_KEY);
            *tag_counts.entry(key.to_string()).or_default() += 1;

            MessageEngagement {
                id: message.id.clone(),
                recipient: message.recipient.clone(),
                days_since_sent: days,
                stats,
                tag,
            }
        })
        .collect();

    let untagged = tag_counts.get(UNTAGGED_KEY).copied().unwrap_or(0);
    debug!(
        messages = results.len(),
        events = events_processed,
        untagged,
        "engagement analysis complete"
    );

    EngagementReport {
        messages: results,
        tag_counts,
        metadata: ReportMetadata {
            generated_at: Utc::now().to_rfc3339(),
            reference_time: now.to_rfc3339(),
            messages_analyzed: messages.len(),
            events_processed,
            untagged,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use metrics_core::models::{Event, EventType};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn message(id: &str, days_ago: i64, events: Vec<(EventType, i64)>) -> SentMessage {
        let sent_at = now() - Duration::days(days_ago);
        SentMessage {
            id: id.to_string(),
            recipient: None,
            sent_at,
            events: events
                .into_iter()
                .map(|(t, mins)| Event::new(t, sent_at + Duration::minutes(mins)))
                .collect(),
        }
    }

    #[test]
    fn test_empty_input() {
        let report = analyze_engagement(&[], now());
        assert!(report.messages.is_empty());
        assert!(report.tag_counts.is_empty());
        assert_eq!(report.metadata.messages_analyzed, 0);
    }

    #[test]
    fn test_mixed_batch_histogram() {
        let messages = vec![
            message(
                "hot",
                2,
                vec![
                    (EventType::Opened, 5),
                    (EventType::Opened, 10),
                    (EventType::Clicked, 12),
                ],
            ),
            message("spam", 90, vec![]),
            message("cold", 5, vec![(EventType::Delivered, 0)]),
            message("once", 1, vec![(EventType::Opened, 1)]),
            message("bounced", 3, vec![(EventType::Bounced, 0), (EventType::Opened, 2)]),
            message(
                "interested",
                4,
                vec![(EventType::Opened, 300), (EventType::Opened, 400)],
            ),
        ];

        let report = analyze_engagement(&messages, now());

        assert_eq!(report.count(Some(EngagementTag::HotLead)), 1);
        assert_eq!(report.count(Some(EngagementTag::PossibleSpamFolder)), 1);
        assert_eq!(report.count(Some(EngagementTag::Cold)), 1);
        assert_eq!(report.count(Some(EngagementTag::Interested)), 1);
        assert_eq!(report.count(Some(EngagementTag::Forwarded)), 0);
        assert_eq!(report.count(None), 2);
        assert_eq!(report.metadata.untagged, 2);
        assert_eq!(report.metadata.events_processed, 9);
    }

    #[test]
    fn test_preserves_input_order_and_days() {
        let messages = vec![message("b", 10, vec![]), message("a", 70, vec![])];
        let report = analyze_engagement(&messages, now());
        let ids: Vec<&str> = report.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(report.messages[0].days_since_sent, 10);
        assert_eq!(report.messages[1].tag, Some(EngagementTag::PossibleSpamFolder));
    }

    #[test]
    fn test_with_tag_filter() {
        let messages = vec![
            message("c1", 1, vec![]),
            message("c2", 2, vec![]),
            message("i1", 2, vec![(EventType::Opened, 60), (EventType::Opened, 61)]),
        ];
        let report = analyze_engagement(&messages, now());
        let cold: Vec<&str> = report
            .with_tag(EngagementTag::Cold)
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(cold, vec!["c1", "c2"]);
    }

    #[test]
    fn test_report_serializes_tags_snake_case() {
        let report = analyze_engagement(&[message("s", 61, vec![])], now());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["messages"][0]["tag"], "possible_spam_folder");
        assert_eq!(json["tag_counts"]["possible_spam_folder"], 1);
    }
}
