//! # ais-core
//!
//! Core crate for the AIS ingestion system, providing:
//!
//! - **Types** (`types`): canonical vessel updates, registry records, identity types
//! - **Configuration** (`config`): JSON config deserialization and validation
//! - **Error types** (`error`): `AisError` and `RegistryError` via thiserror
//! - **Rate limiting** (`rate_limit`): bounded per-vessel last-write memory
//! - **WebSocket** (`ws`): feed client with fixed-backoff reconnect
//! - **Time utilities** (`time_util`): wall-clock timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
