//! In-process registry used when no database is configured, and by tests.

use ahash::AHashMap;
use ais_core::error::RegistryError;
use ais_core::types::{ImoId, NewVessel, VesselId, VesselPatch, VesselRecord};

use super::{RegistryStore, new_vessel_id};

/// Registry kept in a hash map. Transactions snapshot the map on `begin`
/// and restore it on `rollback`.
#[derive(Default)]
pub struct MemoryRegistry {
    records: AHashMap<VesselId, VesselRecord>,
    snapshot: Option<AHashMap<VesselId, VesselRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing uniqueness checks.
    pub fn with_record(mut self, record: VesselRecord) -> Self {
        self.records.insert(record.id.clone(), record);
        self
    }

    pub fn get(&self, id: &VesselId) -> Option<&VesselRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, ordered by id.
    pub fn records(&self) -> Vec<&VesselRecord> {
        let mut out: Vec<&VesselRecord> = self.records.values().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    fn imo_holder(&self, imo: &ImoId) -> Option<&VesselRecord> {
        self.records.values().find(|r| &r.imo_number == imo)
    }
}

impl RegistryStore for MemoryRegistry {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn find_by_mmsi(&self, mmsi: &str) -> Result<Option<VesselRecord>, RegistryError> {
        // Most recently updated wins if a stale duplicate MMSI lingers.
        Ok(self
            .records
            .values()
            .filter(|r| r.mmsi == mmsi)
            .max_by_key(|r| r.last_update_ms)
            .cloned())
    }

    fn find_by_imo(&self, imo: &ImoId) -> Result<Option<VesselRecord>, RegistryError> {
        Ok(self.imo_holder(imo).cloned())
    }

    fn exists_imo(&self, imo: &ImoId) -> Result<bool, RegistryError> {
        Ok(self.imo_holder(imo).is_some())
    }

    fn begin(&mut self) -> Result<(), RegistryError> {
        if self.snapshot.is_some() {
            return Err(RegistryError::Backend("transaction already open".into()));
        }
        self.snapshot = Some(self.records.clone());
        Ok(())
    }

    fn insert(&mut self, vessel: &NewVessel) -> Result<VesselId, RegistryError> {
        if self.imo_holder(&vessel.imo_number).is_some() {
            return Err(RegistryError::Duplicate { field: "imo_number", value: vessel.imo_number.to_string() });
        }
        let id = new_vessel_id();
        self.records.insert(id.clone(), VesselRecord::from_new(id.clone(), vessel.clone()));
        Ok(id)
    }

    fn update(&mut self, id: &VesselId, patch: &VesselPatch) -> Result<(), RegistryError> {
        if let Some(imo) = &patch.imo_number {
            if self.imo_holder(imo).is_some_and(|holder| &holder.id != id) {
                return Err(RegistryError::Duplicate { field: "imo_number", value: imo.to_string() });
            }
        }
        let record = self.records.get_mut(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        record.apply_patch(patch);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), RegistryError> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), RegistryError> {
        if let Some(snapshot) = self.snapshot.take() {
            self.records = snapshot;
        }
        Ok(())
    }
}
