//! Debounced session autosave.
//!
//! Every store mutation re-arms a debounce timer; when it expires the
//! *current* session state is serialized to the durable cache. The record is
//! built by a closure at fire time, never captured when the timer was armed,
//! so an undo/redo that lands between arming and firing is what gets
//! persisted. A manual save command flushes immediately.
//!
//! Persistence failure is non-fatal: the status flag flips to `Error`, the
//! channel stays armed, and the next debounce cycle retries.

use std::time::Duration;
use web_time::Instant;

use crate::cache::{CachedSession, SessionCache};

/// Autosave state for UI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutosaveStatus {
    /// Nothing to save.
    #[default]
    Idle,
    /// Changes waiting for the debounce to expire.
    Pending,
    /// A write is in progress.
    Saving,
    /// The last write succeeded.
    Saved,
    /// The last write failed; a retry is scheduled.
    Error,
}

/// Debounced writer of [`CachedSession`] records.
pub struct AutosaveChannel {
    cache: Box<dyn SessionCache>,
    key: String,
    debounce: Duration,
    /// Time of the last change that needs saving.
    armed_at: Option<Instant>,
    status: AutosaveStatus,
}

impl AutosaveChannel {
    /// Create a channel writing under the given key.
    pub fn new(cache: Box<dyn SessionCache>, key: impl Into<String>, debounce: Duration) -> Self {
        Self {
            cache,
            key: key.into(),
            debounce,
            armed_at: None,
            status: AutosaveStatus::Idle,
        }
    }

    /// Mark that the session changed; (re)arms the debounce timer.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    /// Timer-injectable form of [`Self::mark_dirty`].
    pub fn mark_dirty_at(&mut self, now: Instant) {
        self.armed_at = Some(now);
        self.status = AutosaveStatus::Pending;
        log::trace!("Autosave: armed");
    }

    /// Drive the channel from the host's event-loop tick. Writes at most
    /// once per call, and only when the debounce has expired. Returns true
    /// if a write was attempted.
    ///
    /// `build` is invoked at fire time so the record reflects the session
    /// as it is *now*.
    pub fn poll(&mut self, build: impl FnOnce() -> CachedSession) -> bool {
        self.poll_at(Instant::now(), build)
    }

    /// Timer-injectable form of [`Self::poll`].
    pub fn poll_at(&mut self, now: Instant, build: impl FnOnce() -> CachedSession) -> bool {
        let Some(armed_at) = self.armed_at else {
            return false;
        };
        if now.duration_since(armed_at) < self.debounce {
            return false;
        }
        self.write(now, build());
        true
    }

    /// Save immediately, bypassing the debounce. No-op when nothing is
    /// pending.
    pub fn flush(&mut self, build: impl FnOnce() -> CachedSession) -> bool {
        if self.armed_at.is_none() {
            return false;
        }
        self.write(Instant::now(), build());
        true
    }

    fn write(&mut self, now: Instant, record: CachedSession) {
        self.status = AutosaveStatus::Saving;
        match self.cache.put(&self.key, &record) {
            Ok(()) => {
                self.armed_at = None;
                self.status = AutosaveStatus::Saved;
                log::debug!("Autosave: session saved ({} annotations)", record.annotations.len());
            }
            Err(err) => {
                // Keep the channel armed so the next debounce cycle retries.
                self.armed_at = Some(now);
                self.status = AutosaveStatus::Error;
                log::warn!("Autosave failed: {err}");
            }
        }
    }

    /// Read back the cached session, if one exists and is still live.
    pub fn load(&self) -> Option<CachedSession> {
        match self.cache.get(&self.key) {
            Ok(Some(record)) if record.is_live(chrono::Utc::now()) => Some(record),
            Ok(Some(_)) => {
                log::debug!("Autosave: cached session expired or from another version, ignoring");
                None
            }
            Ok(None) => None,
            Err(err) => {
                log::warn!("Autosave: failed to read cached session: {err}");
                None
            }
        }
    }

    /// Delete the cached session (after submit or reset).
    pub fn clear(&mut self) {
        if let Err(err) = self.cache.remove(&self.key) {
            log::warn!("Autosave: failed to clear cached session: {err}");
        }
        self.armed_at = None;
        self.status = AutosaveStatus::Idle;
    }

    /// Current status for UI feedback.
    pub fn status(&self) -> AutosaveStatus {
        self.status
    }

    /// Whether changes are waiting to be written.
    pub fn is_pending(&self) -> bool {
        self.armed_at.is_some()
    }
}

impl std::fmt::Debug for AutosaveChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveChannel")
            .field("key", &self.key)
            .field("debounce", &self.debounce)
            .field("status", &self.status)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySessionCache;
    use crate::constants::CACHE_FORMAT_VERSION;
    use crate::store::AnnotationStore;
    use chrono::Utc;

    fn record(step: usize) -> CachedSession {
        let now = Utc::now();
        CachedSession {
            version: CACHE_FORMAT_VERSION,
            annotations: AnnotationStore::new(),
            carrier_ref: None,
            document_name: None,
            active_step_index: step,
            saved_at: now,
            expires_at: now + chrono::Duration::hours(24),
        }
    }

    fn channel(debounce_ms: u64) -> AutosaveChannel {
        AutosaveChannel::new(
            Box::new(MemorySessionCache::new()),
            "test-session",
            Duration::from_millis(debounce_ms),
        )
    }

    #[test]
    fn test_idle_channel_never_writes() {
        let mut channel = channel(0);
        assert!(!channel.poll(|| record(0)));
        assert_eq!(channel.status(), AutosaveStatus::Idle);
    }

    #[test]
    fn test_debounce_holds_back_write() {
        let mut channel = channel(2_000);
        let start = Instant::now();
        channel.mark_dirty_at(start);

        assert!(!channel.poll_at(start + Duration::from_millis(500), || record(0)));
        assert_eq!(channel.status(), AutosaveStatus::Pending);

        assert!(channel.poll_at(start + Duration::from_millis(2_500), || record(0)));
        assert_eq!(channel.status(), AutosaveStatus::Saved);
        assert!(!channel.is_pending());
    }

    #[test]
    fn test_rapid_edits_collapse_into_one_write() {
        let mut channel = channel(2_000);
        let start = Instant::now();

        // Five edits inside the debounce window, each re-arming the timer.
        for i in 0..5 {
            channel.mark_dirty_at(start + Duration::from_millis(i * 300));
            assert!(!channel.poll_at(start + Duration::from_millis(i * 300 + 1), || record(i as usize)));
        }

        let mut writes = 0;
        let fire = start + Duration::from_millis(1_200 + 2_000);
        if channel.poll_at(fire, || {
            writes += 1;
            record(4)
        }) {
            // One write, carrying the final state.
        }
        assert_eq!(writes, 1);
        assert_eq!(channel.load().unwrap().active_step_index, 4);
        // Nothing further pending.
        assert!(!channel.poll_at(fire + Duration::from_secs(10), || record(99)));
    }

    #[test]
    fn test_flush_bypasses_debounce() {
        let mut channel = channel(60_000);
        channel.mark_dirty();
        assert!(channel.flush(|| record(7)));
        assert_eq!(channel.status(), AutosaveStatus::Saved);
        assert_eq!(channel.load().unwrap().active_step_index, 7);
    }

    #[test]
    fn test_record_built_at_fire_time() {
        let mut channel = channel(0);
        let start = Instant::now();
        channel.mark_dirty_at(start);

        // The step pointer changes after arming; the write must observe the
        // later value.
        let current_step = 9;
        channel.poll_at(start, || record(current_step));
        assert_eq!(channel.load().unwrap().active_step_index, 9);
    }

    #[test]
    fn test_clear_resets_status() {
        let mut channel = channel(0);
        channel.mark_dirty();
        channel.poll(|| record(0));
        assert!(channel.load().is_some());

        channel.clear();
        assert!(channel.load().is_none());
        assert_eq!(channel.status(), AutosaveStatus::Idle);
    }

    struct FailingCache;

    impl SessionCache for FailingCache {
        fn put(&mut self, _: &str, _: &CachedSession) -> Result<(), crate::cache::CacheError> {
            Err(crate::cache::CacheError::NoCacheDir)
        }
        fn get(&self, _: &str) -> Result<Option<CachedSession>, crate::cache::CacheError> {
            Ok(None)
        }
        fn remove(&mut self, _: &str) -> Result<(), crate::cache::CacheError> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_stays_armed_for_retry() {
        let mut channel = AutosaveChannel::new(Box::new(FailingCache), "k", Duration::ZERO);
        let start = Instant::now();
        channel.mark_dirty_at(start);
        assert!(channel.poll_at(start, || record(0)));
        assert_eq!(channel.status(), AutosaveStatus::Error);
        assert!(channel.is_pending());
    }
}
