//! Preference persistence.
//!
//! Configuration lives in a flat key-value document, persisted as JSON under
//! the user config directory. The controller only sees the [`PrefStore`]
//! trait; tests use the in-memory store.

use crate::host::PrefStore;
use crate::model::{
    AutoSaveConfig, DEFAULT_ENABLED, DEFAULT_INTERVAL_SECS, DEFAULT_NOTIFY, DEFAULT_SAVE_COPY,
};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;

const PREF_KEY_ENABLED: &str = "enabled";
const PREF_KEY_INTERVAL: &str = "interval_seconds";
const PREF_KEY_SAVE_COPY: &str = "save_copy";
const PREF_KEY_NOTIFY: &str = "notify";

/// Load the configuration from a store, applying defaults for missing keys
/// and re-clamping the interval (the file may have been edited by hand).
pub(crate) fn load_config(store: &impl PrefStore) -> AutoSaveConfig {
    AutoSaveConfig {
        enabled: store.get_bool(PREF_KEY_ENABLED, DEFAULT_ENABLED),
        interval_seconds: store.get_f64(PREF_KEY_INTERVAL, DEFAULT_INTERVAL_SECS),
        save_copy: store.get_bool(PREF_KEY_SAVE_COPY, DEFAULT_SAVE_COPY),
        notify: store.get_bool(PREF_KEY_NOTIFY, DEFAULT_NOTIFY),
    }
    .clamped()
}

/// Write the configuration back to a store and flush it.
pub(crate) fn persist_config(store: &mut impl PrefStore, config: &AutoSaveConfig) -> Result<()> {
    store.set_bool(PREF_KEY_ENABLED, config.enabled);
    store.set_f64(PREF_KEY_INTERVAL, config.interval_seconds);
    store.set_bool(PREF_KEY_SAVE_COPY, config.save_copy);
    store.set_bool(PREF_KEY_NOTIFY, config.notify);
    store.flush()
}

/// JSON-file-backed preference store.
pub(crate) struct JsonPrefStore {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl JsonPrefStore {
    /// Open the store at `path`, or at the default location under the user
    /// config directory. A missing or unreadable file yields an empty store;
    /// preferences are not worth refusing to start over.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => default_prefs_path()?,
        };
        let doc = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        Ok(Self { path, doc })
    }
}

fn default_prefs_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no user config directory")?;
    Ok(base.join("scene-autosave").join("prefs.json"))
}

impl PrefStore for JsonPrefStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.doc.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.doc.insert(key.to_string(), Value::Bool(value));
    }

    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.doc.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn set_f64(&mut self, key: &str, value: f64) {
        let num = serde_json::Number::from_f64(value).unwrap_or_else(|| 0.into());
        self.doc.insert(key.to_string(), Value::Number(num));
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let out = serde_json::to_string_pretty(&Value::Object(self.doc.clone()))?;
        // Write-then-rename so a crash mid-write cannot truncate the file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, out).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename into {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemPrefStore {
    doc: Map<String, Value>,
}

#[cfg(test)]
impl PrefStore for MemPrefStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.doc.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.doc.insert(key.to_string(), Value::Bool(value));
    }

    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.doc.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn set_f64(&mut self, key: &str, value: f64) {
        let num = serde_json::Number::from_f64(value).unwrap_or_else(|| 0.into());
        self.doc.insert(key.to_string(), Value::Number(num));
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_yields_defaults() {
        let store = MemPrefStore::default();
        let cfg = load_config(&store);
        assert_eq!(cfg, AutoSaveConfig::default());
    }

    #[test]
    fn config_round_trips_through_store() {
        let mut store = MemPrefStore::default();
        let cfg = AutoSaveConfig {
            enabled: false,
            interval_seconds: 120.0,
            save_copy: true,
            notify: false,
        };
        persist_config(&mut store, &cfg).unwrap();
        assert_eq!(load_config(&store), cfg);
    }

    #[test]
    fn load_clamps_hand_edited_interval() {
        let mut store = MemPrefStore::default();
        store.set_f64("interval_seconds", 5.0);
        assert_eq!(load_config(&store).interval_seconds, 60.0);
    }

    #[test]
    fn json_store_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!(
            "scene-autosave-prefs-test-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let mut store = JsonPrefStore::open(Some(path.clone())).unwrap();
        store.set_bool("save_copy", true);
        store.set_f64("interval_seconds", 300.0);
        store.flush().unwrap();

        let reopened = JsonPrefStore::open(Some(path.clone())).unwrap();
        assert!(reopened.get_bool("save_copy", false));
        assert_eq!(reopened.get_f64("interval_seconds", 600.0), 300.0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_prefs_file_falls_back_to_empty() {
        let path = std::env::temp_dir().join(format!(
            "scene-autosave-prefs-corrupt-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "not json {{{").unwrap();
        let store = JsonPrefStore::open(Some(path.clone())).unwrap();
        assert_eq!(load_config(&store), AutoSaveConfig::default());
        let _ = std::fs::remove_file(&path);
    }
}
