//! Engine configuration.
//!
//! Tunable knobs for the annotation engine, serializable so deployments can
//! ship their own values alongside a custom field type table.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Tunable engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the configuration format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Debounce delay before an autosave write fires, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub autosave_debounce_ms: u64,

    /// How long a cached session stays recoverable, in hours
    #[serde(default = "default_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Maximum number of undo snapshots kept
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Minimum width/height (document units) a drag must exceed to commit
    #[serde(default = "default_min_commit_size")]
    pub min_commit_size: f32,

    /// Completed field types required before training may be submitted
    #[serde(default = "default_min_completed")]
    pub min_completed_for_training: usize,

    /// Key under which the session is cached
    #[serde(default = "default_cache_key")]
    pub session_cache_key: String,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_debounce_ms() -> u64 {
    constants::AUTOSAVE_DEBOUNCE_MS
}

fn default_ttl_hours() -> i64 {
    constants::SESSION_TTL_HOURS
}

fn default_history_depth() -> usize {
    constants::HISTORY_DEPTH
}

fn default_min_commit_size() -> f32 {
    constants::MIN_COMMIT_SIZE
}

fn default_min_completed() -> usize {
    constants::MIN_COMPLETED_FOR_TRAINING
}

fn default_cache_key() -> String {
    constants::SESSION_CACHE_KEY.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            autosave_debounce_ms: default_debounce_ms(),
            session_ttl_hours: default_ttl_hours(),
            history_depth: default_history_depth(),
            min_commit_size: default_min_commit_size(),
            min_completed_for_training: default_min_completed(),
            session_cache_key: default_cache_key(),
        }
    }
}

impl EngineConfig {
    /// The debounce delay as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// The session TTL as a [`chrono::Duration`].
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.autosave_debounce_ms, 2_000);
        assert_eq!(config.history_depth, 50);
        assert_eq!(config.min_completed_for_training, 3);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "autosave_debounce_ms": 500 }"#).expect("parse");
        assert_eq!(config.autosave_debounce_ms, 500);
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.history_depth, 50);
    }
}
