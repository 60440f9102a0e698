//! Per-vessel coalescing of canonical updates over a flush window.
//!
//! Updates for the same MMSI merge field by field: a later value replaces an
//! earlier one, an absent field never erases a value already pending. The
//! whole pending set leaves in one piece when a flush is due, either because
//! the window elapsed or because enough distinct vessels are pending.

use std::time::{Duration, Instant};

use ahash::AHashMap;
use ais_core::config::BatchConfig;
use ais_core::types::CanonicalUpdate;

/// Pending merged updates keyed by MMSI.
///
/// # Thread safety
///
/// Not thread-safe. The pipeline wraps it in a mutex so that `flush_if_due`
/// swaps out the pending map atomically with respect to `enqueue`.
pub struct BatchAggregator {
    pending: AHashMap<String, CanonicalUpdate>,
    last_flush: Instant,
    flush_interval: Duration,
    max_pending: usize,
}

impl BatchAggregator {
    pub fn new(flush_interval: Duration, max_pending: usize) -> Self {
        Self {
            pending: AHashMap::new(),
            last_flush: Instant::now(),
            flush_interval,
            max_pending: max_pending.max(1),
        }
    }

    pub fn from_config(cfg: &BatchConfig) -> Self {
        Self::new(cfg.flush_interval(), cfg.max_pending_vessels)
    }

    /// Merge an update into the pending record for its vessel.
    pub fn enqueue(&mut self, update: CanonicalUpdate) {
        match self.pending.get_mut(&update.mmsi) {
            Some(existing) => existing.merge_newer(update),
            None => {
                self.pending.insert(update.mmsi.clone(), update);
            }
        }
    }

    /// Put a drained batch back, under any data that arrived since.
    ///
    /// Used when the batch could not be handed off. Pending values win over
    /// requeued ones because they are newer.
    pub fn requeue(&mut self, batch: Vec<CanonicalUpdate>) {
        for older in batch {
            match self.pending.get_mut(&older.mmsi) {
                Some(newer) => newer.merge_older(older),
                None => {
                    self.pending.insert(older.mmsi.clone(), older);
                }
            }
        }
    }

    /// Whether a flush is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.len() >= self.max_pending
            || now.saturating_duration_since(self.last_flush) > self.flush_interval
    }

    /// Drain everything pending if a flush is due at `now`.
    ///
    /// Returns an empty vec when no flush is due. A due flush with nothing
    /// pending still restarts the window.
    pub fn flush_if_due(&mut self, now: Instant) -> Vec<CanonicalUpdate> {
        if !self.is_due(now) {
            return Vec::new();
        }
        self.drain_at(now)
    }

    /// Drain everything pending unconditionally (shutdown path).
    pub fn drain(&mut self) -> Vec<CanonicalUpdate> {
        self.drain_at(Instant::now())
    }

    fn drain_at(&mut self, now: Instant) -> Vec<CanonicalUpdate> {
        self.last_flush = now;
        std::mem::take(&mut self.pending).into_values().collect()
    }

    /// Distinct vessels pending.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
