//! Engine-wide constants.

/// Minimum width/height (document units) a drag must exceed to be committed.
pub const MIN_COMMIT_SIZE: f32 = 10.0;

/// Maximum number of snapshots kept in the undo history.
pub const HISTORY_DEPTH: usize = 50;

/// Debounce delay before an autosave write fires, in milliseconds.
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 2_000;

/// How long a cached session stays recoverable, in hours.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Minimum number of completed field types required to submit for training.
pub const MIN_COMPLETED_FOR_TRAINING: usize = 3;

/// Key under which the current session is cached.
pub const SESSION_CACHE_KEY: &str = "invat-session";

/// Version of the cached session record format.
pub const CACHE_FORMAT_VERSION: u32 = 1;
