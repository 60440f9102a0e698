//! Bounded per-vessel memory of the last accepted registry write.
//!
//! The change gate consults this state to throttle writes for vessels that
//! report every few seconds. The state lives only in process memory, so after
//! a restart every vessel's first update is treated as significant.
//!
//! Size is capped: once more than `capacity` vessels are remembered, the map
//! is cut down to the `retain` most recently written entries. This is an
//! approximate LRU by write timestamp, paid for once every
//! `capacity - retain` new vessels rather than on every write.

use ahash::AHashMap;
use tracing::debug;

/// Last-accepted-write timestamps keyed by MMSI.
///
/// # Thread safety
///
/// Not thread-safe. The change gate owns its instance.
pub struct RateLimitState {
    last_write_ms: AHashMap<String, u64>,
    capacity: usize,
    retain: usize,
}

impl RateLimitState {
    /// Create an empty state. `retain` is clamped to `capacity`.
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self { last_write_ms: AHashMap::new(), capacity, retain: retain.min(capacity) }
    }

    /// Last accepted write for `mmsi`, in milliseconds since the epoch.
    #[inline]
    pub fn last_write(&self, mmsi: &str) -> Option<u64> {
        self.last_write_ms.get(mmsi).copied()
    }

    /// Record an accepted write, evicting old entries if the ceiling is exceeded.
    pub fn record(&mut self, mmsi: &str, now_ms: u64) {
        match self.last_write_ms.get_mut(mmsi) {
            Some(ts) => *ts = now_ms,
            None => {
                self.last_write_ms.insert(mmsi.to_string(), now_ms);
            }
        }
        if self.last_write_ms.len() > self.capacity {
            self.evict();
        }
    }

    fn evict(&mut self) {
        let before = self.last_write_ms.len();
        let mut entries: Vec<(String, u64)> = self.last_write_ms.drain().collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(self.retain);
        self.last_write_ms.extend(entries);
        debug!("[rate-limit] evicted {} entries, {} retained", before - self.last_write_ms.len(), self.retain);
    }

    /// Vessels currently remembered.
    pub fn len(&self) -> usize {
        self.last_write_ms.len()
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new(10_000, 5_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_lookup() {
        let mut s = RateLimitState::default();
        assert_eq!(s.last_write("403456789"), None);
        s.record("403456789", 1_000);
        s.record("403456789", 2_000);
        assert_eq!(s.last_write("403456789"), Some(2_000));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn eviction_keeps_most_recent() {
        let mut s = RateLimitState::new(10_000, 5_000);
        for i in 0..10_001u64 {
            s.record(&i.to_string(), i);
            assert!(s.len() <= 10_000);
        }
        assert_eq!(s.len(), 5_000);
        // Keys 5001..=10000 were written last.
        assert_eq!(s.last_write("10000"), Some(10_000));
        assert_eq!(s.last_write("5001"), Some(5_001));
        assert_eq!(s.last_write("5000"), None);
        assert_eq!(s.last_write("0"), None);
    }

    #[test]
    fn refreshing_existing_key_never_evicts() {
        let mut s = RateLimitState::new(3, 1);
        s.record("a", 1);
        s.record("b", 2);
        s.record("c", 3);
        s.record("a", 4);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn retain_clamped_to_capacity() {
        let mut s = RateLimitState::new(2, 10);
        s.record("a", 1);
        s.record("b", 2);
        s.record("c", 3);
        assert_eq!(s.len(), 2);
        assert_eq!(s.last_write("a"), None);
    }
}
