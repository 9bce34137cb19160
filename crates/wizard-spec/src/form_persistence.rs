use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::debounce::Debouncer;
use crate::persistence::KeyValueStore;
use crate::spec::form::FormPersistenceConfig;

/// Saved form drafts older than this many days are discarded on load.
pub const MAX_DRAFT_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDraft {
    data: Map<String, Value>,
    timestamp: DateTime<Utc>,
}

/// Existence and age of a saved draft.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftInfo {
    pub timestamp: DateTime<Utc>,
    pub age: chrono::Duration,
}

/// Direct access to a form's saved draft.
#[derive(Clone)]
pub struct FormStorage {
    key: String,
    store: Arc<dyn KeyValueStore>,
}

impl FormStorage {
    pub fn new(key: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            key: key.into(),
            store,
        }
    }

    pub fn save(&self, data: &Map<String, Value>) {
        self.save_at(data, Utc::now());
    }

    fn save_at(&self, data: &Map<String, Value>, timestamp: DateTime<Utc>) {
        let draft = StoredDraft {
            data: data.clone(),
            timestamp,
        };
        let result = serde_json::to_string(&draft)
            .map_err(|err| err.to_string())
            .and_then(|encoded| {
                self.store
                    .set(&self.key, &encoded)
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = result {
            log::error!("failed to save form draft '{}': {}", self.key, err);
        }
    }

    /// Returns the saved values unless missing, unreadable or stale. Stale
    /// drafts are removed.
    pub fn load(&self) -> Option<Map<String, Value>> {
        let draft = self.read()?;
        if Utc::now() - draft.timestamp > chrono::Duration::days(MAX_DRAFT_AGE_DAYS) {
            log::debug!("discarding stale form draft '{}'", self.key);
            self.clear();
            return None;
        }
        Some(draft.data)
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(&self.key) {
            log::error!("failed to clear form draft '{}': {}", self.key, err);
        }
    }

    pub fn info(&self) -> Option<DraftInfo> {
        let draft = self.read()?;
        Some(DraftInfo {
            timestamp: draft.timestamp,
            age: Utc::now() - draft.timestamp,
        })
    }

    fn read(&self) -> Option<StoredDraft> {
        let raw = match self.store.get(&self.key) {
            Ok(raw) => raw?,
            Err(err) => {
                log::warn!("failed to read form draft '{}': {}", self.key, err);
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|err| log::warn!("ignoring corrupt form draft '{}': {}", self.key, err))
            .ok()
    }
}

/// Debounced autosave of form values, driven by [`FormPersistenceConfig`].
pub struct FormAutosave {
    storage: FormStorage,
    debouncer: Debouncer<Map<String, Value>>,
    clear_on_submit: bool,
}

impl FormAutosave {
    /// Returns `None` when persistence is disabled. Must be called inside a
    /// tokio runtime.
    pub fn start(config: &FormPersistenceConfig, store: Arc<dyn KeyValueStore>) -> Option<Self> {
        if !config.enabled || config.storage_key.is_empty() {
            return None;
        }
        let storage = FormStorage::new(config.storage_key.clone(), store);
        let sink_storage = storage.clone();
        let debouncer = Debouncer::spawn(Duration::from_millis(config.debounce_ms), move |values: Map<String, Value>| {
            sink_storage.save(&values)
        });
        Some(Self {
            storage,
            debouncer,
            clear_on_submit: config.clear_on_submit,
        })
    }

    pub fn storage(&self) -> &FormStorage {
        &self.storage
    }

    /// Records a change; only the latest values within the debounce window
    /// are written.
    pub fn changed(&self, values: Map<String, Value>) {
        self.debouncer.push(values);
    }

    pub async fn flush(&self) {
        self.debouncer.flush().await;
    }

    /// Called after a successful submit: drops pending writes and, when
    /// configured, the saved draft.
    pub fn submitted(&self) {
        self.debouncer.cancel();
        if self.clear_on_submit {
            self.storage.clear();
        }
    }

    pub async fn shutdown(self) {
        self.debouncer.shutdown().await;
    }
}
