//! Persisted hue rotation and bar count.
//!
//! Settings live apart from `config.toml`: the config is user-authored,
//! the settings file is rewritten by gestures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use toml_edit::DocumentMut;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::params::{VisualParameters, DEFAULT_BARS, DEFAULT_HUE_ROTATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    HueRotation,
    BarCount,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::HueRotation => "hue_rotation",
            SettingKey::BarCount => "bar_count",
        }
    }
}

/// Durable key-value store for the two visual settings.
pub trait SettingsStore {
    fn get(&self, key: SettingKey) -> Result<Option<f64>, StoreError>;
    fn set(&mut self, key: SettingKey, value: f64) -> Result<(), StoreError>;
}

/// Read the parameters, falling back to defaults per key on absence or failure.
pub fn load_parameters<S: SettingsStore + ?Sized>(store: &S) -> VisualParameters {
    let hue = read_or(store, SettingKey::HueRotation, DEFAULT_HUE_ROTATION as f64);
    let bars = read_or(store, SettingKey::BarCount, DEFAULT_BARS as f64);
    let bars = if bars.is_finite() && bars >= 0.0 {
        bars.round() as u32
    } else {
        DEFAULT_BARS
    };
    let params = VisualParameters::new(hue as f32, bars);
    info!(
        "Loaded visual settings: hue {:.1}, bars {}",
        params.hue_rotation(),
        params.bar_count()
    );
    params
}

fn read_or<S: SettingsStore + ?Sized>(store: &S, key: SettingKey, default: f64) -> f64 {
    match store.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            warn!("Failed to read setting {}: {}, using default", key.as_str(), e);
            default
        }
    }
}

/// Write both parameters, one write per key.
///
/// Both writes are attempted even if the first fails.
pub fn save_parameters<S: SettingsStore + ?Sized>(
    store: &mut S,
    params: &VisualParameters,
) -> Result<(), StoreError> {
    let hue = store.set(SettingKey::HueRotation, params.hue_rotation() as f64);
    let bars = store.set(SettingKey::BarCount, params.bar_count() as f64);
    hue.and(bars)
}

/// Settings kept in a small TOML file, edited in place so hand-written
/// comments survive.
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
    doc: DocumentMut,
}

impl TomlSettingsStore {
    /// Get the default settings path (~/.config/wavestrip/settings.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wavestrip").join("settings.toml"))
    }

    /// Open the store. A missing file is an empty store; an unreadable or
    /// malformed one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = if path.exists() {
            std::fs::read_to_string(&path)?.parse::<DocumentMut>()?
        } else {
            debug!("No settings file at {}, starting empty", path.display());
            DocumentMut::new()
        };
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    fn get(&self, key: SettingKey) -> Result<Option<f64>, StoreError> {
        let Some(item) = self.doc.get(key.as_str()) else {
            return Ok(None);
        };
        if let Some(v) = item.as_float() {
            Ok(Some(v))
        } else if let Some(v) = item.as_integer() {
            Ok(Some(v as f64))
        } else {
            Err(StoreError::InvalidValue { key: key.as_str() })
        }
    }

    fn set(&mut self, key: SettingKey, value: f64) -> Result<(), StoreError> {
        if !value.is_finite() {
            return Err(StoreError::InvalidValue { key: key.as_str() });
        }
        self.doc[key.as_str()] = match key {
            SettingKey::HueRotation => toml_edit::value(value),
            SettingKey::BarCount => toml_edit::value(value.round() as i64),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, self.doc.to_string())?;
        debug!("Saved {} = {} to {}", key.as_str(), value, self.path.display());
        Ok(())
    }
}

/// In-memory store, used when no config directory exists.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<SettingKey, f64>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `set` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: SettingKey) -> Result<Option<f64>, StoreError> {
        Ok(self.values.get(&key).copied())
    }

    fn set(&mut self, key: SettingKey, value: f64) -> Result<(), StoreError> {
        self.writes += 1;
        self.values.insert(key, value);
        Ok(())
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for Box<S> {
    fn get(&self, key: SettingKey) -> Result<Option<f64>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: SettingKey, value: f64) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlSettingsStore::open(dir.path().join("settings.toml")).unwrap();
        assert_eq!(load_parameters(&store), VisualParameters::default());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut store = TomlSettingsStore::open(&path).unwrap();
        save_parameters(&mut store, &VisualParameters::new(123.5, 57)).unwrap();

        let reopened = TomlSettingsStore::open(&path).unwrap();
        let params = load_parameters(&reopened);
        assert_eq!(params.bar_count(), 57);
        assert!((params.hue_rotation() - 123.5).abs() < 1e-4);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("bar_count = 57"));
    }

    #[test]
    fn comments_are_preserved_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "# tuned by hand\nbar_count = 20\n").unwrap();

        let mut store = TomlSettingsStore::open(&path).unwrap();
        store.set(SettingKey::HueRotation, 45.0).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("# tuned by hand"));
        assert!(text.contains("hue_rotation = 45"));
    }

    #[test]
    fn out_of_range_stored_values_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "hue_rotation = -30.0\nbar_count = 400\n").unwrap();

        let store = TomlSettingsStore::open(&path).unwrap();
        let params = load_parameters(&store);
        assert!((params.hue_rotation() - 330.0).abs() < 1e-4);
        assert_eq!(params.bar_count(), 80);
    }

    #[test]
    fn wrong_type_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "hue_rotation = \"blue\"\nbar_count = 12\n").unwrap();

        let store = TomlSettingsStore::open(&path).unwrap();
        assert!(store.get(SettingKey::HueRotation).is_err());
        let params = load_parameters(&store);
        assert_eq!(params.hue_rotation(), 0.0);
        assert_eq!(params.bar_count(), 12);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "hue_rotation = = 1").unwrap();
        assert!(matches!(
            TomlSettingsStore::open(&path),
            Err(StoreError::Parse(_))
        ));
    }

    #[test]
    fn failing_store_loads_defaults() {
        let store = FailingStore::default();
        assert_eq!(load_parameters(&store), VisualParameters::default());
    }

    #[test]
    fn save_attempts_both_keys_even_when_failing() {
        let mut store = FailingStore::default();
        assert!(save_parameters(&mut store, &VisualParameters::default()).is_err());
        assert_eq!(store.attempts, 2);
    }
}
