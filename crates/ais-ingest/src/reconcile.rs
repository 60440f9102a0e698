//! Reconciliation of one flushed batch against the registry.
//!
//! For each merged update: look up the vessel by MMSI, ask the change gate
//! whether a write is warranted, resolve the identity, then hand every
//! resulting operation to the executor in one call. The gate remembers a
//! write only after its operation has been resolved.

use ais_core::config::GateConfig;
use ais_core::types::CanonicalUpdate;
use tracing::{debug, info, warn};

use crate::change_gate::ChangeGate;
use crate::executor::{ApplyReport, BatchExecutor};
use crate::registry::RegistryStore;
use crate::resolver::{IdentityResolver, Operation};

/// Per-batch counters.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub received: usize,
    pub gated: usize,
    /// Updates whose lookup or resolution failed.
    pub lookup_errors: usize,
    pub report: ApplyReport,
}

/// Owns the registry and the stateful reconciliation components.
pub struct Reconciler<S> {
    store: S,
    gate: ChangeGate,
    resolver: IdentityResolver,
    executor: BatchExecutor,
}

impl<S: RegistryStore> Reconciler<S> {
    pub fn new(store: S, gate: &GateConfig) -> Self {
        Self { store, gate: ChangeGate::new(gate), resolver: IdentityResolver::new(), executor: BatchExecutor::new() }
    }

    /// Reconcile one flushed batch at wall-clock `now_ms`.
    pub fn process_batch(&mut self, batch: Vec<CanonicalUpdate>, now_ms: u64) -> BatchOutcome {
        let mut outcome = BatchOutcome { received: batch.len(), ..Default::default() };
        self.resolver.begin_batch();

        let mut operations: Vec<Operation> = Vec::with_capacity(batch.len());
        for update in &batch {
            let existing = match self.store.find_by_mmsi(&update.mmsi) {
                Ok(existing) => existing,
                Err(e) => {
                    warn!("[reconcile] lookup failed for {}: {e}", update.mmsi);
                    outcome.lookup_errors += 1;
                    continue;
                }
            };
            if !self.gate.decide(update, existing.as_ref(), now_ms).is_accepted() {
                outcome.gated += 1;
                continue;
            }
            // Only a resolved operation counts as a write for throttling.
            match self.resolver.resolve_known(&self.store, update, existing.as_ref(), now_ms) {
                Ok(op) => {
                    self.gate.record(&update.mmsi, now_ms);
                    operations.push(op);
                }
                Err(e) => {
                    warn!("[reconcile] resolve failed for {}: {e}", update.mmsi);
                    outcome.lookup_errors += 1;
                }
            }
        }

        if !operations.is_empty() {
            outcome.report = self.executor.apply(&mut self.store, operations);
        }

        if outcome.report.applied > 0 || !outcome.report.is_clean() {
            info!(
                "[reconcile] batch: received={} gated={} applied={} skipped={} failed_groups={} tracked={}",
                outcome.received,
                outcome.gated,
                outcome.report.applied,
                outcome.report.skipped.len(),
                outcome.report.failed_groups.len(),
                self.gate.state().len(),
            );
        } else {
            debug!("[reconcile] batch: received={} gated={} nothing to write", outcome.received, outcome.gated);
        }
        outcome
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gate(&self) -> &ChangeGate {
        &self.gate
    }
}
