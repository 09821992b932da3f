//! Small persisted key-value flags: banner dismissals and cookie consent.
//!
//! Flags go through the [`KeyValueStore`] port so the CLI can keep them in
//! `~/.creator-metrics/preferences.json` while tests use [`MemoryStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Key prefix for dismissed banners and notices.
pub const DISMISSED_PREFIX: &str = "dismissed:";
/// Key under which the consent answer is stored.
pub const CONSENT_KEY: &str = "consent";

/// String key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// Non-persistent store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

// ── JsonFileStore ─────────────────────────────────────────────────────────────

/// Store backed by a single JSON object on disk, rewritten atomically on
/// every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing or corrupt file starts empty.
    pub fn open(path: &Path) -> Self {
        let values = Self::load_values(path);
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    /// Store under `~/.creator-metrics/preferences.json`.
    ///
    /// Returns `None` when the home directory cannot be determined.
    pub fn with_default_path() -> Option<Self> {
        let path = dirs::home_dir()?
            .join(".creator-metrics")
            .join("preferences.json");
        Some(Self::open(&path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_values(path: &Path) -> BTreeMap<String, String> {
        if !path.exists() {
            return BTreeMap::new();
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "failed to read preferences file; starting empty"
                );
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "failed to deserialise preferences; starting empty"
            );
            BTreeMap::new()
        })
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

// ── DismissalFlags ────────────────────────────────────────────────────────────

/// Typed view over a [`KeyValueStore`] for dismissal and consent flags.
pub struct DismissalFlags<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> DismissalFlags<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn is_dismissed(&self, notice: &str) -> bool {
        self.store
            .get(&format!("{DISMISSED_PREFIX}{notice}"))
            .is_some_and(|v| v == "true")
    }

    pub fn dismiss(&mut self, notice: &str) -> Result<()> {
        self.store.set(&format!("{DISMISSED_PREFIX}{notice}"), "true")
    }

    pub fn restore(&mut self, notice: &str) -> Result<()> {
        self.store.remove(&format!("{DISMISSED_PREFIX}{notice}"))
    }

    /// `None` until the user has answered the consent prompt.
    pub fn has_consented(&self) -> Option<bool> {
        match self.store.get(CONSENT_KEY)?.as_str() {
            "accepted" => Some(true),
            "declined" => Some(false),
            _ => None,
        }
    }

    pub fn set_consent(&mut self, accepted: bool) -> Result<()> {
        let value = if accepted { "accepted" } else { "declined" };
        self.store.set(CONSENT_KEY, value)
    }
}
