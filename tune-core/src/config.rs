//! # Configuration
//!
//! A flat string key/value store. Keys are dotted (`http.port`,
//! `stream.chunk_size`); values are parsed on read through a
//! [`TuneConfigSnapshot`].
//!
//! ```rust
//! use tune_core::TuneConfig;
//! let mut config = TuneConfig::new();
//!
//! config.set("stream.chunk_size", "65536");
//! assert_eq!(config.snapshot().get_usize("stream.chunk_size"), Some(65536));
//! ```
//!
//! ## Environment overrides
//! [`TuneConfig::load_env`] maps prefixed variables onto keys, lowercasing
//! them and turning `__` into `.`:
//!
//! ```bash
//! export TUNE__STREAM__CHUNK_SIZE=65536   # stream.chunk_size
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct TuneConfig {
    values: HashMap<String, String>,
}

impl TuneConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when it is not already present.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Overlay every environment variable starting with `prefix`.
    ///
    /// `TUNE__HTTP__PORT=9000` with prefix `TUNE__` sets `http.port`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> TuneConfigSnapshot {
        TuneConfigSnapshot::new(self.values.clone())
    }
}

/// Read-only view with typed getters.
#[derive(Debug, Clone, Default)]
pub struct TuneConfigSnapshot {
    map: HashMap<String, String>,
}

impl TuneConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_u16(&self, key: &str) -> Option<u16> {
        self.get(key).and_then(|v| v.trim().parse::<u16>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_are_normalized_into_dotted_keys() {
        let mut config = TuneConfig::new();
        config.load_vars(
            "TUNE__",
            vec![
                ("TUNE__STREAM__CHUNK_SIZE".to_string(), "1024".to_string()),
                ("TUNE__HTTP__PORT".to_string(), "9000".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ],
        );

        let snap = config.snapshot();
        assert_eq!(snap.get_usize("stream.chunk_size"), Some(1024));
        assert_eq!(snap.get_u16("http.port"), Some(9000));
        assert!(!config.has("path"));
    }

    #[test]
    fn set_default_does_not_override() {
        let mut config = TuneConfig::new();
        config.set("http.port", "9000");
        config.set_default("http.port", "8080");
        config.set_default("http.host", "127.0.0.1");

        assert_eq!(config.get("http.port"), Some("9000"));
        assert_eq!(config.get("http.host"), Some("127.0.0.1"));
    }

    #[test]
    fn typed_getters_reject_garbage() {
        let mut config = TuneConfig::new();
        config.set("stream.chunk_size", "lots");
        config.set("stream.partial", "true");

        let snap = config.snapshot();
        assert_eq!(snap.get_usize("stream.chunk_size"), None);
        assert_eq!(snap.get_bool("stream.partial"), Some(true));
    }
}
