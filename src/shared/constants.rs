/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// FILE STORAGE
// =============================================================================

/// Read buffer used when streaming downloads
pub const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on `_N` suffixes tried before an upload is rejected
pub const MAX_NAME_COLLISIONS: u32 = 10_000;

/// Longest client-chosen upload session id accepted
pub const MAX_SESSION_ID_LENGTH: usize = 100;

/// Search stops collecting hits past this count
pub const MAX_SEARCH_RESULTS: usize = 1_000;

/// Number of activities shown on the dashboard
pub const RECENT_ACTIVITY_LIMIT: i64 = 10;
