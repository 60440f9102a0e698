//! Wall-clock time helpers.
//!
//! Registry timestamps and rate-limit bookkeeping are expressed in
//! milliseconds since the Unix epoch.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Milliseconds elapsed from `earlier` to `later`, saturating at zero when
/// the clock stepped backwards.
#[inline]
pub fn elapsed_ms(earlier: u64, later: u64) -> u64 {
    later.saturating_sub(earlier)
}
