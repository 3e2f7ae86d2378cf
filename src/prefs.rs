//! Persisted animation preferences.
//!
//! Two boolean keys are read through on every call so that changes made by
//! another process (or the `--set-*` flags) are picked up by the next gate
//! decision. A key that has never been written is persisted with its default
//! on first access. Store failures never surface to callers: the default is
//! used for that call and a warning is logged.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

pub const ENABLE_ANIMATION_KEY: &str = "enable_animation";
pub const FORCE_ENABLE_ANIMATION_KEY: &str = "force_enable_animation";

pub const ENABLE_ANIMATION_DEFAULT: bool = true;
pub const FORCE_ENABLE_ANIMATION_DEFAULT: bool = false;

/// Key/value backend for boolean preferences.
pub trait PreferenceStore: Send {
    /// `Ok(None)` when the key has never been written.
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;
    fn set_bool(&mut self, key: &str, value: bool) -> Result<()>;
}

/// Preferences stored as a flat JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/phonetic/preferences.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("phonetic").join("preferences.json"))
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parse {}", self.path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow::anyhow!(
                "{} is not a JSON object",
                self.path.display()
            )),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let out = serde_json::to_string_pretty(map)?;
        std::fs::write(&tmp, out).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.read_map()?.get(key).and_then(Value::as_bool))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        // A corrupt file is replaced rather than blocking every future write.
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "discarding unreadable preferences");
                Map::new()
            }
        };
        map.insert(key.to_string(), Value::Bool(value));
        self.write_map(&map)
    }
}

/// Volatile store used when no config directory is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, bool>,
    #[cfg(test)]
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with(mut self, key: &str, value: bool) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    #[cfg(test)]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PreferenceStore for MemoryStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.values.get(key).copied())
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        #[cfg(test)]
        {
            self.writes += 1;
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Snapshot of both preference keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreferenceFlags {
    pub animation_enabled: bool,
    pub force_animation: bool,
}

/// Reads preferences, persisting defaults the first time a key is seen.
pub struct PreferenceResolver {
    store: Box<dyn PreferenceStore>,
}

impl PreferenceResolver {
    pub fn new(store: Box<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn is_animation_enabled(&mut self) -> bool {
        self.resolve(ENABLE_ANIMATION_KEY, ENABLE_ANIMATION_DEFAULT)
    }

    pub fn is_force_animation_enabled(&mut self) -> bool {
        self.resolve(FORCE_ENABLE_ANIMATION_KEY, FORCE_ENABLE_ANIMATION_DEFAULT)
    }

    pub fn flags(&mut self) -> PreferenceFlags {
        PreferenceFlags {
            animation_enabled: self.is_animation_enabled(),
            force_animation: self.is_force_animation_enabled(),
        }
    }

    /// Explicit settings change. Unlike reads, a failed write is reported.
    pub fn set_animation_enabled(&mut self, enabled: bool) -> Result<()> {
        self.store
            .set_bool(ENABLE_ANIMATION_KEY, enabled)
            .context("save animation preference")
    }

    pub fn set_force_animation_enabled(&mut self, enabled: bool) -> Result<()> {
        self.store
            .set_bool(FORCE_ENABLE_ANIMATION_KEY, enabled)
            .context("save force-animation preference")
    }

    fn resolve(&mut self, key: &str, default: bool) -> bool {
        match self.store.get_bool(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::debug!(key, default, "preference missing, persisting default");
                if let Err(e) = self.store.set_bool(key, default) {
                    tracing::warn!(key, error = %format!("{e:#}"), "failed to persist preference default");
                }
                default
            }
            Err(e) => {
                tracing::warn!(key, default, error = %format!("{e:#}"), "preference unreadable, using default");
                default
            }
        }
    }
}
