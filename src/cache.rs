//! Durable session cache.
//!
//! The autosave channel serializes the session into a [`CachedSession`]
//! record and hands it to a [`SessionCache`] implementation keyed by a fixed
//! session key. Records carry their own expiry; anything past it, or written
//! by a different format version, is ignored on load as if absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::constants::CACHE_FORMAT_VERSION;
use crate::store::AnnotationStore;

/// Errors raised by cache implementations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No usable storage location on this platform
    #[error("No writable cache directory available")]
    NoCacheDir,
}

/// The persisted session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSession {
    /// Format version; mismatches are ignored on load.
    pub version: u32,
    /// Full annotation store, including the id counter.
    pub annotations: AnnotationStore,
    /// Carrier the document belongs to, if one was selected.
    pub carrier_ref: Option<String>,
    /// Display name of the document being annotated.
    pub document_name: Option<String>,
    /// Step pointer into the field type registry.
    pub active_step_index: usize,
    /// When the record was written.
    pub saved_at: DateTime<Utc>,
    /// When the record stops being recoverable.
    pub expires_at: DateTime<Utc>,
}

impl CachedSession {
    /// Whether the record is still recoverable at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.version == CACHE_FORMAT_VERSION && now < self.expires_at
    }
}

/// Keyed durable storage for session records.
pub trait SessionCache {
    /// Write a record under a key, replacing any existing one.
    fn put(&mut self, key: &str, record: &CachedSession) -> Result<(), CacheError>;

    /// Read the record under a key, if present. Expiry filtering is the
    /// caller's job ([`CachedSession::is_live`]); implementations return
    /// whatever is stored.
    fn get(&self, key: &str) -> Result<Option<CachedSession>, CacheError>;

    /// Delete the record under a key. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> Result<(), CacheError>;
}

/// In-memory cache for tests and hosts with their own persistence.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionCache {
    records: HashMap<String, CachedSession>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionCache for MemorySessionCache {
    fn put(&mut self, key: &str, record: &CachedSession) -> Result<(), CacheError> {
        self.records.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<CachedSession>, CacheError> {
        Ok(self.records.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        self.records.remove(key);
        Ok(())
    }
}

/// Filesystem-backed cache storing one JSON file per key.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FsSessionCache {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FsSessionCache {
    /// Cache rooted in the platform's local data directory.
    pub fn new() -> Result<Self, CacheError> {
        let base = dirs::data_local_dir().ok_or(CacheError::NoCacheDir)?;
        Self::at(base.join("invat"))
    }

    /// Cache rooted at an explicit directory (created if missing).
    pub fn at(dir: impl Into<std::path::PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> std::path::PathBuf {
        // Keys are fixed identifiers, not user input, but keep the filename
        // safe anyway.
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SessionCache for FsSessionCache {
    fn put(&mut self, key: &str, record: &CachedSession) -> Result<(), CacheError> {
        let json = serde_json::to_string(record)?;
        std::fs::write(self.path_for(key), json)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<CachedSession>, CacheError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_in: Duration) -> CachedSession {
        let now = Utc::now();
        CachedSession {
            version: CACHE_FORMAT_VERSION,
            annotations: AnnotationStore::new(),
            carrier_ref: Some("carrier-1".into()),
            document_name: Some("invoice.pdf".into()),
            active_step_index: 2,
            saved_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_memory_cache_round_trip() {
        let mut cache = MemorySessionCache::new();
        let rec = record(Duration::hours(24));
        cache.put("session", &rec).unwrap();
        assert_eq!(cache.get("session").unwrap(), Some(rec));

        cache.remove("session").unwrap();
        assert_eq!(cache.get("session").unwrap(), None);
    }

    #[test]
    fn test_expired_record_is_not_live() {
        let rec = record(Duration::hours(-1));
        assert!(!rec.is_live(Utc::now()));
        let fresh = record(Duration::hours(24));
        assert!(fresh.is_live(Utc::now()));
    }

    #[test]
    fn test_version_mismatch_is_not_live() {
        let mut rec = record(Duration::hours(24));
        rec.version = CACHE_FORMAT_VERSION + 1;
        assert!(!rec.is_live(Utc::now()));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_fs_cache_round_trip() {
        let dir = std::env::temp_dir().join("invat-cache-test");
        let mut cache = FsSessionCache::at(&dir).unwrap();
        let rec = record(Duration::hours(24));

        cache.put("session", &rec).unwrap();
        assert_eq!(cache.get("session").unwrap(), Some(rec));
        cache.remove("session").unwrap();
        assert_eq!(cache.get("session").unwrap(), None);

        let _ = std::fs::remove_dir_all(dir);
    }
}
