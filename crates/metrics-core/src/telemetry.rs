//! Analytics event sink.
//!
//! Dashboards push page views and interaction events through a
//! [`Telemetry`] handle instead of a process-global buffer, so tests can swap
//! in a [`CapturingSink`] and assert on exactly what was emitted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name of the event recorded once by [`Telemetry::init`].
pub const INIT_EVENT: &str = "init";

/// One analytics event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            at: Utc::now(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Append-only destination for analytics events.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Forwards events to the `tracing` subscriber at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: TelemetryEvent) {
        tracing::debug!(
            target: "telemetry",
            event = %event.name,
            properties = ?event.properties,
            "telemetry event"
        );
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CapturingSink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }
}

impl TelemetrySink for CapturingSink {
    fn record(&self, event: TelemetryEvent) {
        let mut guard = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(event);
    }
}

/// Cloneable handle that owns the sink and the one-shot init flag.
#[derive(Clone)]
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
    initialized: Arc<AtomicBool>,
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle backed by [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Record the init event. Safe to call any number of times from any
    /// clone; only the first call emits. Returns whether this call emitted.
    pub fn init(&self) -> bool {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.sink.record(TelemetryEvent::new(INIT_EVENT));
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn track(&self, event: TelemetryEvent) {
        self.sink.record(event);
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
