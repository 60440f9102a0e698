//! Typed error definitions for the AIS ingestion system.
//!
//! [`AisError`] covers the failure classes of the ingest path: configuration,
//! feed connection, individual frame parsing, and registry access. Registry
//! failures carry a [`RegistryError`] so callers can tell an identity conflict
//! (one record skipped) apart from a backend failure (group rolled back).

use thiserror::Error;

/// Domain-specific errors for the AIS ingestion system.
#[derive(Debug, Error)]
pub enum AisError {
    /// Missing credential or invalid configuration. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// WebSocket connect, handshake, or mid-stream failure. Always retried.
    #[error("connection error: {0}")]
    Connection(String),

    /// A single malformed frame. The frame is dropped.
    #[error("frame parse error: {0}")]
    FrameParse(String),

    /// Registry access failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors returned by a registry store.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A uniqueness constraint rejected the write (e.g. an IMO already taken).
    #[error("identity conflict: duplicate {field} '{value}'")]
    Duplicate { field: &'static str, value: String },

    /// The record addressed by an update no longer exists.
    #[error("vessel record not found: {0}")]
    NotFound(String),

    /// Any other storage failure.
    #[error("registry backend error: {0}")]
    Backend(String),
}

impl RegistryError {
    /// Whether this error is an insert/update-time uniqueness race rather than
    /// a storage failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}
