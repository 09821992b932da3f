use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use tracing::warn;

/// Unix timestamps at or above this magnitude are read as milliseconds.
///
/// Webhook payloads from browser-side SDKs carry `Date.now()` values, while
/// backend exports carry seconds; the two ranges do not overlap until the
/// year 5138.
const MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses timestamps from the variety of formats found in event exports.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Attempt to parse a [`serde_json::Value`] into a UTC [`DateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON string  → ISO 8601 / RFC 3339 (including `Z`-suffix), RFC 2822
    ///   or common date-time patterns.
    /// * JSON number  → Unix timestamp in seconds, or milliseconds when the
    ///   value is large enough.
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.as_str()),
            Value::Number(n) => n.as_f64().and_then(Self::parse_unix),
            _ => None,
        }
    }

    fn parse_unix(raw: f64) -> Option<DateTime<Utc>> {
        if !raw.is_finite() {
            return None;
        }
        let secs_f = if raw.abs() >= MILLIS_THRESHOLD {
            raw / 1000.0
        } else {
            raw
        };
        let whole = secs_f.floor();
        let secs = whole as i64;
        let nanos = ((secs_f - whole) * 1_000_000_000.0).round() as u32;
        DateTime::from_timestamp(secs, nanos.min(999_999_999))
    }

    /// Parse a timestamp string, returning `None` for anything unrecognised.
    pub fn parse_str(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d",
        ];

        for fmt in FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
                let naive = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        warn!(
            "TimestampProcessor: could not parse timestamp string \"{}\"",
            s
        );
        None
    }
}

// ── Lenient serde adapters ────────────────────────────────────────────────────

/// Serde adapter for `Option<DateTime<Utc>>` fields that must tolerate
/// malformed input: anything [`TimestampProcessor`] cannot read becomes
/// `None` instead of failing the whole record.
pub mod lenient_timestamp {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(TimestampProcessor::parse(&value))
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

/// Serde adapter for required `DateTime<Utc>` fields that accept the same
/// formats as [`TimestampProcessor`] but reject unparseable values.
pub mod flexible_timestamp {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        TimestampProcessor::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", value)))
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }
}

// ── Rounding ──────────────────────────────────────────────────────────────────

/// Round to the nearest integer with ties going towards positive infinity,
/// so `-2.5` becomes `-2` and `2.5` becomes `3`. `NaN` stays `NaN`.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
