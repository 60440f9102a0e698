//! WebSocket feed client with fixed-backoff reconnect.

pub mod client;

pub use client::{FrameHandler, StreamClient, StreamClientConfig, Subscription, run_stream};
