//! Named instrument presets.
//!
//! Presets are kept as one JSON object, name to [`InstrumentConfig`], under
//! the key [`PRESETS_KEY`] of a [`KeyValueStore`].

use crate::error::PlayerError;
use crate::instrument::InstrumentConfig;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const PRESETS_KEY: &str = "savedInstruments";

/// String storage keyed by name, the way a browser's local storage is.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, PlayerError>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), PlayerError>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, PlayerError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), PlayerError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON file holding a flat object of string values. A missing file reads
/// as empty.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PlayerError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, PlayerError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), PlayerError> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        fs::write(&self.path, serde_json::to_string_pretty(&items)?)?;
        Ok(())
    }
}

/// Saved instrument configurations.
///
/// # Example
/// ```rust
/// use jianpu::presets::{MemoryStore, PresetStore};
/// use jianpu::InstrumentConfig;
///
/// let mut store = MemoryStore::new();
/// let mut presets = PresetStore::load(&store).unwrap();
/// presets.save("  warm pad ", InstrumentConfig::builtin("violin").unwrap()).unwrap();
/// presets.persist(&mut store).unwrap();
///
/// let reloaded = PresetStore::load(&store).unwrap();
/// assert_eq!(reloaded.names(), vec!["warm pad"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetStore {
    presets: BTreeMap<String, InstrumentConfig>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read presets from `store`. A missing key yields an empty set.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, PlayerError> {
        let presets = match store.get_item(PRESETS_KEY)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| PlayerError::Preset(format!("stored presets are unreadable: {}", e)))?,
            None => BTreeMap::new(),
        };
        Ok(Self { presets })
    }

    /// Write every preset back to `store`.
    pub fn persist(&self, store: &mut dyn KeyValueStore) -> Result<(), PlayerError> {
        let json = serde_json::to_string(&self.presets)?;
        store.set_item(PRESETS_KEY, &json)?;
        log::debug!("persisted {} preset(s)", self.presets.len());
        Ok(())
    }

    /// Save under the trimmed `name`, replacing any preset of that name.
    pub fn save(&mut self, name: &str, config: InstrumentConfig) -> Result<(), PlayerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlayerError::Preset("preset name is empty".to_string()));
        }
        self.presets.insert(name.to_string(), config);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&InstrumentConfig> {
        self.presets.get(name.trim())
    }

    pub fn remove(&mut self, name: &str) -> Option<InstrumentConfig> {
        self.presets.remove(name.trim())
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}
