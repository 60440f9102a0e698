//! Vessel registry access.
//!
//! The reconciler talks to storage only through [`RegistryStore`]. The store
//! owns encoding and constraint enforcement: in particular it must reject a
//! second record with an IMO already present, reporting
//! [`RegistryError::Duplicate`].
//!
//! Writes are grouped by the caller between [`RegistryStore::begin`] and
//! [`RegistryStore::commit`] / [`RegistryStore::rollback`]. A write that fails
//! inside a group does not by itself undo earlier writes of the group; the
//! caller decides whether to commit or roll back.

pub mod memory;
pub mod sqlite;

use ais_core::error::RegistryError;
use ais_core::types::{ImoId, NewVessel, VesselId, VesselPatch, VesselRecord};

pub use memory::MemoryRegistry;
pub use sqlite::SqliteRegistry;

/// Transactional vessel record store.
pub trait RegistryStore: Send {
    /// Human-readable backend name.
    fn backend(&self) -> &'static str;

    fn find_by_mmsi(&self, mmsi: &str) -> Result<Option<VesselRecord>, RegistryError>;

    fn find_by_imo(&self, imo: &ImoId) -> Result<Option<VesselRecord>, RegistryError>;

    fn exists_imo(&self, imo: &ImoId) -> Result<bool, RegistryError>;

    /// Open a transaction scope.
    fn begin(&mut self) -> Result<(), RegistryError>;

    /// Insert a new record, returning its assigned id.
    fn insert(&mut self, vessel: &NewVessel) -> Result<VesselId, RegistryError>;

    /// Apply a partial update to an existing record.
    fn update(&mut self, id: &VesselId, patch: &VesselPatch) -> Result<(), RegistryError>;

    fn commit(&mut self) -> Result<(), RegistryError>;

    fn rollback(&mut self) -> Result<(), RegistryError>;
}

impl RegistryStore for Box<dyn RegistryStore> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn find_by_mmsi(&self, mmsi: &str) -> Result<Option<VesselRecord>, RegistryError> {
        (**self).find_by_mmsi(mmsi)
    }

    fn find_by_imo(&self, imo: &ImoId) -> Result<Option<VesselRecord>, RegistryError> {
        (**self).find_by_imo(imo)
    }

    fn exists_imo(&self, imo: &ImoId) -> Result<bool, RegistryError> {
        (**self).exists_imo(imo)
    }

    fn begin(&mut self) -> Result<(), RegistryError> {
        (**self).begin()
    }

    fn insert(&mut self, vessel: &NewVessel) -> Result<VesselId, RegistryError> {
        (**self).insert(vessel)
    }

    fn update(&mut self, id: &VesselId, patch: &VesselPatch) -> Result<(), RegistryError> {
        (**self).update(id, patch)
    }

    fn commit(&mut self) -> Result<(), RegistryError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), RegistryError> {
        (**self).rollback()
    }
}

/// Generate a fresh record id.
pub(crate) fn new_vessel_id() -> VesselId {
    VesselId(uuid::Uuid::new_v4().simple().to_string())
}
