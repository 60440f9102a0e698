//! Live notification sink.
//!
//! Every frame that normalizes successfully is republished verbatim for
//! real-time consumers. Publishing is fire-and-forget: it never blocks
//! ingestion and is independent of the change gate.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Sender half handed to the ingest path.
pub type FrameSender = broadcast::Sender<Arc<str>>;

/// Receiver half for live consumers. Slow receivers see `Lagged` and skip ahead.
pub type FrameReceiver = broadcast::Receiver<Arc<str>>;

/// Default number of frames buffered per receiver.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct FrameBroadcaster {
    tx: FrameSender,
}

impl FrameBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a raw frame. Returns the number of receivers reached.
    pub fn publish(&self, raw: &str) -> usize {
        // No receivers is the normal idle case.
        self.tx.send(Arc::from(raw)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> FrameReceiver {
        self.tx.subscribe()
    }
}

impl Default for FrameBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}
