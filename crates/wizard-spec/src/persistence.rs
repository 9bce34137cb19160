use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::spec::wizard::{PersistenceConfig, StorageType};
use crate::state::WizardSnapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode or decode '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage backend is unavailable")]
    Unavailable,
}

/// Keyed string storage (a browser-like `getItem`/`setItem`/`removeItem`).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Unavailable)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Unavailable)?;
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry inside `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are reduced to `[A-Za-z0-9._-]` so they cannot escape `root`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                    ch
                } else {
                    '_'
                }
            })
            .collect::<String>();
        let safe = safe.trim_start_matches('.');
        let name = if safe.is_empty() { "_" } else { safe };
        self.root.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_err)?;
        fs::write(self.path_for(key), value).map_err(io_err)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// The two storage scopes a wizard may persist into.
#[derive(Clone)]
pub struct StorageBackends {
    pub durable: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
}

impl StorageBackends {
    /// Both scopes in memory; suitable for tests and embedded hosts.
    pub fn in_memory() -> Self {
        Self {
            durable: Arc::new(MemoryStore::new()),
            session: Arc::new(MemoryStore::new()),
        }
    }

    /// Durable scope on disk, session scope in memory.
    pub fn with_directory(root: impl Into<PathBuf>) -> Self {
        Self {
            durable: Arc::new(FileStore::new(root)),
            session: Arc::new(MemoryStore::new()),
        }
    }

    pub fn select(&self, storage_type: StorageType) -> Arc<dyn KeyValueStore> {
        match storage_type {
            StorageType::Local => Arc::clone(&self.durable),
            StorageType::Session => Arc::clone(&self.session),
        }
    }
}

impl Default for StorageBackends {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Saves and restores wizard snapshots. Never fails to the caller: every
/// backend or decoding problem is logged and treated as "nothing stored".
#[derive(Clone)]
pub struct WizardPersistence {
    config: PersistenceConfig,
    store: Arc<dyn KeyValueStore>,
}

impl WizardPersistence {
    pub fn new(config: PersistenceConfig, backends: &StorageBackends) -> Self {
        let store = backends.select(config.storage_type);
        Self { config, store }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn save(&self, snapshot: &WizardSnapshot) {
        let key = &self.config.storage_key;
        let result = serde_json::to_string(snapshot)
            .map_err(|source| StoreError::Json {
                key: key.clone(),
                source,
            })
            .and_then(|encoded| self.store.set(key, &encoded));
        if let Err(err) = result {
            log::error!("failed to persist wizard state: {}", err);
        }
    }

    pub fn load(&self) -> Option<WizardSnapshot> {
        let key = &self.config.storage_key;
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("failed to read persisted wizard state: {}", err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!("ignoring corrupt wizard state under '{}': {}", key, err);
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(&self.config.storage_key) {
            log::error!("failed to clear wizard state: {}", err);
        }
    }
}
