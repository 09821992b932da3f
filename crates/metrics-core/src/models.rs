use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::data_processors::{flexible_timestamp, lenient_timestamp};

/// Kind of interaction recorded against a sent communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Opened,
    Clicked,
    Bounced,
    Delivered,
    /// Anything the webhook emits that is not one of the above.
    #[serde(other)]
    Other,
}

/// One observed interaction against a sent communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(alias = "eventType", alias = "type")]
    pub event_type: EventType,
    /// `None` when the source carried no timestamp or one that could not be
    /// parsed.
    #[serde(
        default,
        alias = "occurredAt",
        alias = "timestamp",
        with = "lenient_timestamp"
    )]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "deviceType", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, alias = "ipAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl Event {
    /// Build an event with no device or IP information.
    pub fn new(event_type: EventType, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_type,
            occurred_at: Some(occurred_at),
            device_type: None,
            ip_address: None,
        }
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device_type = Some(device.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// A sent email together with every event observed against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(alias = "sentAt", with = "flexible_timestamp")]
    pub sent_at: DateTime<Utc>,
    /// Events in arrival order.
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Aggregate counts derived from the events of a single sent message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementStats {
    pub opens: u32,
    pub clicks: u32,
    pub bounces: u32,
    /// Minutes between send and the first open. `None` when never opened,
    /// `Some(NaN)` when the first open carried a malformed timestamp.
    pub first_open_minutes: Option<f64>,
    pub devices: HashSet<String>,
    pub ips: HashSet<String>,
}

impl EngagementStats {
    /// Number of distinct devices seen.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Number of distinct IP addresses seen.
    pub fn ip_count(&self) -> usize {
        self.ips.len()
    }
}

/// Categorical label summarising how a recipient treated a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTag {
    HotLead,
    Interested,
    Cold,
    PossibleSpamFolder,
    Forwarded,
}

impl EngagementTag {
    /// Label shown on dashboard badges.
    pub fn label(&self) -> &'static str {
        match self {
            EngagementTag::HotLead => "Hot Lead",
            EngagementTag::Interested => "Interested",
            EngagementTag::Cold => "Cold",
            EngagementTag::PossibleSpamFolder => "Possible Spam Folder",
            EngagementTag::Forwarded => "Forwarded",
        }
    }

    /// Stable snake_case key, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementTag::HotLead => "hot_lead",
            EngagementTag::Interested => "interested",
            EngagementTag::Cold => "cold",
            EngagementTag::PossibleSpamFolder => "possible_spam_folder",
            EngagementTag::Forwarded => "forwarded",
        }
    }
}

impl fmt::Display for EngagementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the featured-content CSV, keyed by normalised header name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeaturedItem {
    pub fields: BTreeMap<String, String>,
}

impl FeaturedItem {
    /// Cell value for `key`, or `""` when the column is absent.
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.get("title")
    }

    pub fn image_url(&self) -> &str {
        self.get("image_url")
    }
}

/// Metadata for one published episode, as needed by the revenue estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "publishedAt", with = "flexible_timestamp")]
    pub published_at: DateTime<Utc>,
    #[serde(default, alias = "adReadCount")]
    pub ad_read_count: i64,
    #[serde(default, alias = "certifiedVoice")]
    pub certified_voice: bool,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
