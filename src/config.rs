//! Caller-supplied configuration.
//!
//! Plain data, no file/env loader: this crate persists nothing between
//! runs, and the source hardcodes every one of these values at `100`
//! (ms/ms/ms) rather than reading them from anywhere.

use std::time::Duration;

/// Options for [`crate::connect`]. Defaults match the source's hardcoded
/// `100` ms timeouts (`plc_tag_read(..., 100)` and friends).
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Per-operation timeout for opening a tag connection.
    pub connect_timeout_ms: u32,
    /// Per-operation timeout for a `read`/`get_raw_bytes` round trip.
    pub request_timeout_ms: u32,
    /// Whether `@`-prefixed pseudo-tags that survive tag-listing validation
    /// (e.g. `@tags` itself, were a controller ever to echo it back) are
    /// kept in [`crate::TagData`]'s public tag list. Default `false`, the
    /// conservative choice.
    pub include_system_tags: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 100,
            request_timeout_ms: 100,
            include_system_tags: false,
        }
    }
}

/// Options for [`crate::scan`]. `target_period` matches the source's
/// `constexpr int target_scan_ms = 100`.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub target_period: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target_period: Duration::from_millis(100),
        }
    }
}
