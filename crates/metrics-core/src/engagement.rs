use chrono::{DateTime, Utc};
use tracing::trace;

use crate::data_processors::round_half_up;
use crate::models::{EngagementStats, EngagementTag, Event, EventType};

/// Opens faster than this many minutes after send count towards a hot lead.
pub const HOT_LEAD_WINDOW_MINUTES: f64 = 30.0;
/// Unopened messages older than this are suspected to have hit spam.
pub const SPAM_FOLDER_AFTER_DAYS: i64 = 60;
/// More distinct IPs than this means the message was forwarded on.
pub const FORWARDED_MIN_IPS: usize = 2;

const MS_PER_MINUTE: f64 = 60_000.0;

// ── EngagementAggregator ──────────────────────────────────────────────────────

/// Reduces a raw event log into an [`EngagementStats`] snapshot.
pub struct EngagementAggregator;

impl EngagementAggregator {
    /// Aggregate `events` (assumed to be in arrival order) against the time
    /// the message was sent.
    ///
    /// Repeated opens and clicks are all counted. The first `opened` event in
    /// list order, not the earliest by timestamp, sets `first_open_minutes`;
    /// the value is not clamped, so an open recorded before `sent_at` yields a
    /// negative figure.
    pub fn aggregate(events: &[Event], sent_at: DateTime<Utc>) -> EngagementStats {
        let mut stats = EngagementStats::default();

        for event in events {
            match event.event_type {
                EventType::Opened => {
                    stats.opens += 1;
                    if stats.first_open_minutes.is_none() {
                        stats.first_open_minutes = Some(minutes_between(sent_at, event.occurred_at));
                    }
                }
                EventType::Clicked => stats.clicks += 1,
                EventType::Bounced => stats.bounces += 1,
                EventType::Delivered | EventType::Other => {}
            }

            if let Some(device) = &event.device_type {
                stats.devices.insert(device.clone());
            }
            if let Some(ip) = &event.ip_address {
                stats.ips.insert(ip.clone());
            }
        }

        trace!(
            opens = stats.opens,
            clicks = stats.clicks,
            bounces = stats.bounces,
            events = events.len(),
            "aggregated engagement stats"
        );
        stats
    }
}

/// Whole minutes from `sent_at` to `opened_at`, `NaN` when the open time is
/// unknown.
fn minutes_between(sent_at: DateTime<Utc>, opened_at: Option<DateTime<Utc>>) -> f64 {
    match opened_at {
        Some(at) => {
            let delta_ms = (at - sent_at).num_milliseconds() as f64;
            round_half_up(delta_ms / MS_PER_MINUTE)
        }
        None => f64::NAN,
    }
}

/// Whole days elapsed between `sent_at` and `now`, floored.
pub fn days_since_sent(sent_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - sent_at).num_milliseconds().div_euclid(86_400_000)
}

// ── EngagementClassifier ──────────────────────────────────────────────────────

/// One step in the classification chain.
struct Rule {
    name: &'static str,
    matches: fn(&EngagementStats, i64) -> bool,
    outcome: Option<EngagementTag>,
}

/// Evaluated top to bottom; the first rule whose predicate holds decides the
/// tag. Delivery-layer signals (bounce, forwarding) come before engagement
/// quality, and the hot-lead check precedes the weaker interested bucket.
static RULES: &[Rule] = &[
    Rule {
        name: "bounced",
        matches: |s, _| s.bounces > 0,
        outcome: None,
    },
    Rule {
        name: "forwarded",
        matches: |s, _| s.ip_count() > FORWARDED_MIN_IPS,
        outcome: Some(EngagementTag::Forwarded),
    },
    Rule {
        name: "hot_lead",
        // NaN compares false, so a malformed first-open time never qualifies.
        matches: |s, _| {
            s.first_open_minutes
                .is_some_and(|m| m < HOT_LEAD_WINDOW_MINUTES)
                && (s.opens > 2 || s.clicks > 0)
        },
        outcome: Some(EngagementTag::HotLead),
    },
    Rule {
        name: "interested",
        matches: |s, _| s.opens >= 2,
        outcome: Some(EngagementTag::Interested),
    },
    Rule {
        name: "possible_spam_folder",
        matches: |s, days| s.opens == 0 && days > SPAM_FOLDER_AFTER_DAYS,
        outcome: Some(EngagementTag::PossibleSpamFolder),
    },
    Rule {
        name: "cold",
        matches: |s, _| s.opens == 0,
        outcome: Some(EngagementTag::Cold),
    },
    Rule {
        name: "fallthrough",
        matches: |_, _| true,
        outcome: None,
    },
];

/// Assigns at most one [`EngagementTag`] to a stats snapshot.
pub struct EngagementClassifier;

impl EngagementClassifier {
    /// Classify `stats` for a message sent `days_since_sent` days ago.
    ///
    /// Returns `None` for bounced messages and for messages opened exactly
    /// once without any stronger signal.
    pub fn classify(stats: &EngagementStats, days_since_sent: i64) -> Option<EngagementTag> {
        Self::first_match(stats, days_since_sent).outcome
    }

    /// Name of the rule that decides the tag for `stats`.
    pub fn matched_rule(stats: &EngagementStats, days_since_sent: i64) -> &'static str {
        Self::first_match(stats, days_since_sent).name
    }

    /// Aggregate and classify in one step.
    pub fn classify_events(
        events: &[Event],
        sent_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<EngagementTag> {
        let stats = EngagementAggregator::aggregate(events, sent_at);
        Self::classify(&stats, days_since_sent(sent_at, now))
    }

    fn first_match(stats: &EngagementStats, days_since_sent: i64) -> &'static Rule {
        // The trailing fallthrough rule always matches.
        let last = &RULES[RULES.len() - 1];
        let rule = RULES
            .iter()
            .find(|rule| (rule.matches)(stats, days_since_sent))
            .unwrap_or(last);
        trace!(rule = rule.name, days_since_sent, "engagement rule matched");
        rule
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sent() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        sent() + Duration::minutes(minutes)
    }

    fn stats(opens: u32, clicks: u32, bounces: u32, first_open: Option<f64>) -> EngagementStats {
        EngagementStats {
            opens,
            clicks,
            bounces,
            first_open_minutes: first_open,
            ..Default::default()
        }
    }

    // ── aggregate ────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_empty_log() {
        let s = EngagementAggregator::aggregate(&[], sent());
        assert_eq!(s.opens, 0);
        assert_eq!(s.clicks, 0);
        assert_eq!(s.bounces, 0);
        assert!(s.first_open_minutes.is_none());
        assert_eq!(s.device_count(), 0);
        assert_eq!(s.ip_count(), 0);
    }

    #[test]
    fn test_aggregate_counts_without_dedup() {
        let events = vec![
            Event::new(EventType::Delivered, at(0)),
            Event::new(EventType::Opened, at(5)),
            Event::new(EventType::Opened, at(10)),
            Event::new(EventType::Opened, at(10)),
            Event::new(EventType::Clicked, at(12)),
            Event::new(EventType::Other, at(13)),
        ];
        let s = EngagementAggregator::aggregate(&events, sent());
        assert_eq!(s.opens, 3);
        assert_eq!(s.clicks, 1);
        assert_eq!(s.bounces, 0);
        assert!((s.opens + s.clicks + s.bounces) as usize <= events.len());
    }

    #[test]
    fn test_first_open_uses_list_order_not_earliest() {
        let events = vec![
            Event::new(EventType::Opened, at(40)),
            Event::new(EventType::Opened, at(3)),
        ];
        let s = EngagementAggregator::aggregate(&events, sent());
        assert_eq!(s.first_open_minutes, Some(40.0));
    }

    #[test]
    fn test_first_open_rounds_to_nearest_minute() {
        let events = vec![Event::new(
            EventType::Opened,
            sent() + Duration::seconds(150),
        )];
        let s = EngagementAggregator::aggregate(&events, sent());
        assert_eq!(s.first_open_minutes, Some(3.0));
    }

    #[test]
    fn test_first_open_before_send_is_negative() {
        let events = vec![Event::new(EventType::Opened, at(-7))];
        let s = EngagementAggregator::aggregate(&events, sent());
        assert_eq!(s.first_open_minutes, Some(-7.0));
    }

    #[test]
    fn test_first_open_with_malformed_timestamp_is_nan() {
        let events = vec![
            Event {
                event_type: EventType::Opened,
                occurred_at: None,
                device_type: None,
                ip_address: None,
            },
            Event::new(EventType::Opened, at(2)),
        ];
        let s = EngagementAggregator::aggregate(&events, sent());
        assert!(s.first_open_minutes.is_some_and(f64::is_nan));
        assert_eq!(s.opens, 2);
    }

    #[test]
    fn test_devices_and_ips_are_distinct_sets() {
        let events = vec![
            Event::new(EventType::Opened, at(1)).with_device("mobile").with_ip("1.1.1.1"),
            Event::new(EventType::Opened, at(2)).with_device("mobile").with_ip("1.1.1.1"),
            Event::new(EventType::Clicked, at(3)).with_device("desktop"),
            Event::new(EventType::Delivered, at(0)).with_ip("2.2.2.2"),
        ];
        let s = EngagementAggregator::aggregate(&events, sent());
        assert_eq!(s.device_count(), 2);
        assert_eq!(s.ip_count(), 2);
        assert!(s.ip_count() <= events.len());
    }

    // ── days_since_sent ──────────────────────────────────────────────────────

    #[test]
    fn test_days_since_sent_floors() {
        assert_eq!(days_since_sent(sent(), sent() + Duration::hours(47)), 1);
        assert_eq!(days_since_sent(sent(), sent() + Duration::days(90)), 90);
        assert_eq!(days_since_sent(sent(), sent() - Duration::hours(1)), -1);
    }

    // ── classify: rule order ─────────────────────────────────────────────────

    #[test]
    fn test_bounce_suppresses_everything() {
        let s = stats(5, 3, 1, Some(1.0));
        assert_eq!(EngagementClassifier::classify(&s, 2), None);
        assert_eq!(EngagementClassifier::matched_rule(&s, 2), "bounced");
    }

    #[test]
    fn test_forwarded_beats_hot_lead() {
        let mut s = stats(4, 1, 0, Some(2.0));
        s.ips.extend(["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(
            EngagementClassifier::classify(&s, 1),
            Some(EngagementTag::Forwarded)
        );
    }

    #[test]
    fn test_two_ips_is_not_forwarded() {
        let mut s = stats(2, 0, 0, Some(45.0));
        s.ips.extend(["a".to_string(), "b".to_string()]);
        assert_eq!(
            EngagementClassifier::classify(&s, 1),
            Some(EngagementTag::Interested)
        );
    }

    #[test]
    fn test_hot_lead_fast_open_with_click() {
        let s = stats(1, 1, 0, Some(29.0));
        assert_eq!(
            EngagementClassifier::classify(&s, 0),
            Some(EngagementTag::HotLead)
        );
    }

    #[test]
    fn test_hot_lead_fast_open_many_opens() {
        let s = stats(3, 0, 0, Some(10.0));
        assert_eq!(
            EngagementClassifier::classify(&s, 0),
            Some(EngagementTag::HotLead)
        );
    }

    #[test]
    fn test_slow_open_with_two_opens_is_interested() {
        let s = stats(2, 1, 0, Some(30.0));
        assert_eq!(
            EngagementClassifier::classify(&s, 0),
            Some(EngagementTag::Interested)
        );
    }

    #[test]
    fn test_nan_first_open_never_hot() {
        let s = stats(3, 2, 0, Some(f64::NAN));
        assert_eq!(
            EngagementClassifier::classify(&s, 0),
            Some(EngagementTag::Interested)
        );
    }

    #[test]
    fn test_unopened_old_is_spam_folder_boundary() {
        let s = stats(0, 0, 0, None);
        assert_eq!(
            EngagementClassifier::classify(&s, 61),
            Some(EngagementTag::PossibleSpamFolder)
        );
        assert_eq!(EngagementClassifier::classify(&s, 60), Some(EngagementTag::Cold));
    }

    #[test]
    fn test_single_slow_open_has_no_tag() {
        let s = stats(1, 0, 0, Some(120.0));
        assert_eq!(EngagementClassifier::classify(&s, 3), None);
        assert_eq!(EngagementClassifier::matched_rule(&s, 3), "fallthrough");
    }

    // ── classify: end-to-end scenarios ───────────────────────────────────────

    #[test]
    fn test_scenario_fast_open_and_click_is_hot_lead() {
        let events = vec![
            Event::new(EventType::Opened, at(5)),
            Event::new(EventType::Opened, at(10)),
            Event::new(EventType::Clicked, at(12)),
        ];
        let s = EngagementAggregator::aggregate(&events, sent());
        assert_eq!(s.opens, 2);
        assert_eq!(s.clicks, 1);
        assert_eq!(s.first_open_minutes, Some(5.0));
        assert_eq!(
            EngagementClassifier::classify(&s, 2),
            Some(EngagementTag::HotLead)
        );
    }

    #[test]
    fn test_scenario_no_events_after_ninety_days() {
        let tag = EngagementClassifier::classify_events(&[], sent(), sent() + Duration::days(90));
        assert_eq!(tag, Some(EngagementTag::PossibleSpamFolder));
    }

    #[test]
    fn test_scenario_single_quick_open_untagged() {
        let events = vec![Event::new(EventType::Opened, at(1))];
        let tag = EngagementClassifier::classify_events(&events, sent(), sent() + Duration::days(1));
        assert_eq!(tag, None);
    }

    #[test]
    fn test_fast_open_needs_third_open_or_click() {
        // A fast first open alone is not enough: two opens without a click
        // fall through to interested.
        let s = stats(2, 0, 0, Some(12.0));
        assert_eq!(
            EngagementClassifier::classify(&s, 5),
            Some(EngagementTag::Interested)
        );
        assert_eq!(EngagementClassifier::matched_rule(&s, 5), "interested");

        let s = stats(3, 0, 0, Some(12.0));
        assert_eq!(
            EngagementClassifier::classify(&s, 5),
            Some(EngagementTag::HotLead)
        );
    }
}
