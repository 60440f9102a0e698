//! # ais-ingest
//!
//! AIS ingestion and registry reconciliation.
//!
//! ## Architecture
//!
//! Feed frames are normalized into canonical updates, coalesced per vessel by
//! the [`aggregator`], and flushed in batches to a registry worker. The worker
//! runs each batch through the [`change_gate`], the [`resolver`], and finally
//! the [`executor`], which writes to a [`registry::RegistryStore`].
//!
//! ## Modules
//!
//! - [`normalizer`]: feed frame → `CanonicalUpdate`
//! - [`aggregator`]: per-vessel merge over a flush window
//! - [`change_gate`]: per-vessel write throttle
//! - [`resolver`]: insert / update / identity-merge decisions
//! - [`executor`]: grouped transactional apply
//! - [`reconcile`]: one batch through gate, resolver and executor
//! - [`pipeline`]: receive path, idle tick, registry worker, shutdown flush
//! - [`broadcast`]: live raw-frame notifications
//! - [`registry`]: store interface plus memory and SQLite adapters
//! - [`json_util`]: JSON field helpers

pub mod aggregator;
pub mod broadcast;
pub mod change_gate;
pub mod executor;
pub mod json_util;
pub mod normalizer;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod resolver;

pub use pipeline::{IngestPipeline, StatsSnapshot};
pub use registry::{MemoryRegistry, RegistryStore, SqliteRegistry};
