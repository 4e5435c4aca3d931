// =============================================================================
// Matchings Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Header carrying the caller id, set by the upstream auth gateway
pub const CALLER_ID_HEADER: &str = "x-user-id";

// =============================================================================
// MATCHING LIFECYCLE
// =============================================================================

/// Length in seconds of one unit of a QUICK matching's `duration` (minutes)
pub const QUICK_DURATION_UNIT_SECS: i64 = 60;

/// How often the sweep worker closes expired matchings
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

// =============================================================================
// LISTING & FILTERS
// =============================================================================

/// Page size used when a list request does not give `limit`
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound for `limit`; larger requests are clamped
pub const MAX_PAGE_SIZE: i64 = 100;

/// Timezone used to interpret date-only filter values such as `2025-04-01`
pub const DEFAULT_FILTER_TIMEZONE: &str = "Asia/Tokyo";

// =============================================================================
// DATABASE
// =============================================================================

/// Default connection pool size
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Seconds to wait for a pooled connection before failing the request
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Per-statement timeout applied to every pooled connection
pub const DEFAULT_DB_STATEMENT_TIMEOUT_MS: u64 = 5000;
