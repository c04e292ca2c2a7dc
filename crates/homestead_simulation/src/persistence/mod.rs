//! Persistent key/value store (custom ints/floats/strings)
//!
//! Ключи составные: `{unique_id}_{tag}`. Timers и счётчики growth/production
//! живут здесь, поэтому переживают save/load.

use std::collections::BTreeMap;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Failed to access save file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize save data: {0}")]
    Serialize(#[from] ron::Error),
    #[error("Failed to parse save file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
}

pub fn custom_key(unique_id: &str, tag: &str) -> String {
    format!("{}_{}", unique_id, tag)
}

/// BTreeMap: стабильный порядок при сериализации (diff-friendly saves)
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveStore {
    ints: BTreeMap<String, i32>,
    floats: BTreeMap<String, f32>,
    strings: BTreeMap<String, String>,
}

impl SaveStore {
    pub fn has_custom_int(&self, key: &str) -> bool {
        self.ints.contains_key(key)
    }

    pub fn get_custom_int(&self, key: &str) -> i32 {
        self.ints.get(key).copied().unwrap_or(0)
    }

    pub fn set_custom_int(&mut self, key: impl Into<String>, value: i32) {
        self.ints.insert(key.into(), value);
    }

    pub fn has_custom_float(&self, key: &str) -> bool {
        self.floats.contains_key(key)
    }

    pub fn get_custom_float(&self, key: &str) -> f32 {
        self.floats.get(key).copied().unwrap_or(0.0)
    }

    pub fn set_custom_float(&mut self, key: impl Into<String>, value: f32) {
        self.floats.insert(key.into(), value);
    }

    pub fn has_custom_string(&self, key: &str) -> bool {
        self.strings.contains_key(key)
    }

    pub fn get_custom_string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn set_custom_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn remove_custom_string(&mut self, key: &str) -> Option<String> {
        self.strings.remove(key)
    }

    /// Удаляет ключ из всех трёх таблиц
    pub fn remove(&mut self, key: &str) {
        self.ints.remove(key);
        self.floats.remove(key);
        self.strings.remove(key);
    }

    /// Удаляет все значения entity (например после grow/despawn)
    pub fn remove_all_for(&mut self, unique_id: &str) {
        let prefix = format!("{}_", unique_id);
        self.ints.retain(|k, _| !k.starts_with(&prefix));
        self.floats.retain(|k, _| !k.starts_with(&prefix));
        self.strings.retain(|k, _| !k.starts_with(&prefix));
    }

    pub fn to_ron(&self) -> Result<String, SaveError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn from_ron(text: &str, path: &str) -> Result<Self, SaveError> {
        ron::from_str(text).map_err(|source| SaveError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn save_ron(&self, path: &Path) -> Result<(), SaveError> {
        let text = self.to_ron()?;
        std::fs::write(path, text).map_err(|source| SaveError::Io {
            path: path.display().to_string(),
            source,
        })?;
        crate::log_info(&format!("💾 Save store written: {}", path.display()));
        Ok(())
    }

    pub fn load_ron(path: &Path) -> Result<Self, SaveError> {
        let text = std::fs::read_to_string(path).map_err(|source| SaveError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron(&text, &path.display().to_string())
    }
}
