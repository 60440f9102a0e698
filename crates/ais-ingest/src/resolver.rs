//! Identity resolution: decides how a canonical update lands in the registry.
//!
//! Matching order:
//!
//! 1. A record with the same MMSI → [`Operation::Update`].
//! 2. Else, a record holding the update's genuine IMO → [`Operation::IdentityMerge`]
//!    (the vessel changed transponder; its MMSI is rewritten, its id kept).
//! 3. Else → [`Operation::Insert`] with an IMO chosen by [`IdentityResolver::assign_imo`].
//!
//! The resolver remembers IMOs it handed out since [`IdentityResolver::begin_batch`]
//! so two inserts of one batch never receive the same identifier.

use std::fmt;

use ahash::AHashSet;
use ais_core::error::RegistryError;
use ais_core::types::{
    CanonicalUpdate, ImoId, NewVessel, VesselId, VesselPatch, VesselRecord, placeholder_name,
};

use crate::registry::RegistryStore;

/// A registry write produced by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert(NewVessel),
    Update { id: VesselId, patch: VesselPatch },
    IdentityMerge { id: VesselId, patch: VesselPatch },
}

/// Operation discriminant, used for grouping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Update,
    IdentityMerge,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::IdentityMerge => "identity_merge",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Insert(_) => OperationKind::Insert,
            Self::Update { .. } => OperationKind::Update,
            Self::IdentityMerge { .. } => OperationKind::IdentityMerge,
        }
    }
}

#[derive(Default)]
pub struct IdentityResolver {
    claimed: AHashSet<ImoId>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget IMOs claimed by the previous batch.
    pub fn begin_batch(&mut self) {
        self.claimed.clear();
    }

    /// Resolve `update`, looking up its MMSI first.
    pub fn resolve<S: RegistryStore + ?Sized>(
        &mut self,
        store: &S,
        update: &CanonicalUpdate,
        now_ms: u64,
    ) -> Result<Operation, RegistryError> {
        let existing = store.find_by_mmsi(&update.mmsi)?;
        self.resolve_known(store, update, existing.as_ref(), now_ms)
    }

    /// Resolve `update` when the MMSI lookup has already been done.
    pub fn resolve_known<S: RegistryStore + ?Sized>(
        &mut self,
        store: &S,
        update: &CanonicalUpdate,
        by_mmsi: Option<&VesselRecord>,
        now_ms: u64,
    ) -> Result<Operation, RegistryError> {
        if let Some(existing) = by_mmsi {
            let patch = self.update_patch(store, update, existing, now_ms)?;
            return Ok(Operation::Update { id: existing.id.clone(), patch });
        }

        if let Some(imo) = update.imo_number {
            if let Some(holder) = store.find_by_imo(&ImoId::genuine(imo))? {
                return Ok(Operation::IdentityMerge { id: holder.id.clone(), patch: merge_patch(update, &holder, now_ms) });
            }
        }

        let imo_number = self.assign_imo(store, &update.mmsi, update.imo_number)?;
        Ok(Operation::Insert(NewVessel {
            mmsi: update.mmsi.clone(),
            imo_number,
            vessel_name: update.vessel_name.clone().unwrap_or_else(|| placeholder_name(&update.mmsi)),
            call_sign: update.call_sign.clone(),
            vessel_category: update.vessel_category,
            latitude: update.latitude,
            longitude: update.longitude,
            speed_knots: update.speed_knots,
            course_degrees: update.course_degrees,
            nav_status: update.nav_status,
            destination: update.destination.clone(),
            last_update_ms: now_ms,
        }))
    }

    /// Pick the IMO for a new record and claim it for this batch.
    ///
    /// A free genuine IMO is used as is. A taken or missing one falls back to
    /// `AIS-<mmsi>`, then `AIS-<mmsi>-1`, `-2`, … until a free id is found.
    pub fn assign_imo<S: RegistryStore + ?Sized>(
        &mut self,
        store: &S,
        mmsi: &str,
        genuine: Option<u32>,
    ) -> Result<ImoId, RegistryError> {
        if let Some(imo) = genuine.map(ImoId::genuine) {
            if !self.is_taken(store, &imo)? {
                self.claimed.insert(imo.clone());
                return Ok(imo);
            }
        }

        let mut candidate = ImoId::synthetic(mmsi);
        let mut n = 0;
        while self.is_taken(store, &candidate)? {
            n += 1;
            candidate = ImoId::synthetic_with_suffix(mmsi, n);
        }
        self.claimed.insert(candidate.clone());
        Ok(candidate)
    }

    fn is_taken<S: RegistryStore + ?Sized>(&self, store: &S, imo: &ImoId) -> Result<bool, RegistryError> {
        Ok(self.claimed.contains(imo) || store.exists_imo(imo)?)
    }

    fn update_patch<S: RegistryStore + ?Sized>(
        &mut self,
        store: &S,
        update: &CanonicalUpdate,
        existing: &VesselRecord,
        now_ms: u64,
    ) -> Result<VesselPatch, RegistryError> {
        let vessel_name = update.vessel_name.clone().filter(|_| existing.has_placeholder_name());

        // A genuine IMO replaces the stored one unless another record holds it.
        let mut imo_number = None;
        if let Some(imo) = update.imo_number.map(ImoId::genuine) {
            if imo != existing.imo_number {
                let held_elsewhere = self.claimed.contains(&imo)
                    || store.find_by_imo(&imo)?.is_some_and(|holder| holder.id != existing.id);
                if !held_elsewhere {
                    self.claimed.insert(imo.clone());
                    imo_number = Some(imo);
                }
            }
        }

        Ok(VesselPatch { imo_number, vessel_name, ..field_patch(update, now_ms) })
    }
}

/// Patch for a record found by IMO under a different MMSI.
fn merge_patch(update: &CanonicalUpdate, holder: &VesselRecord, now_ms: u64) -> VesselPatch {
    VesselPatch {
        mmsi: Some(update.mmsi.clone()),
        vessel_name: update.vessel_name.clone().filter(|name| name != &holder.vessel_name),
        ..field_patch(update, now_ms)
    }
}

/// Position, motion and voyage fields carried over as supplied.
fn field_patch(update: &CanonicalUpdate, now_ms: u64) -> VesselPatch {
    VesselPatch {
        call_sign: update.call_sign.clone(),
        vessel_category: update.vessel_category,
        latitude: update.latitude,
        longitude: update.longitude,
        speed_knots: update.speed_knots,
        course_degrees: update.course_degrees,
        nav_status: update.nav_status,
        destination: update.destination.clone(),
        last_update_ms: now_ms,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use ais_core::types::{NavStatus, VesselCategory};

    use super::*;
    use crate::registry::MemoryRegistry;

    const NOW: u64 = 1_700_000_000_000;

    fn seed(mmsi: &str, imo: ImoId, name: &str) -> VesselRecord {
        VesselRecord::from_new(
            VesselId(format!("id-{mmsi}")),
            NewVessel {
                mmsi: mmsi.into(),
                imo_number: imo,
                vessel_name: name.into(),
                call_sign: None,
                vessel_category: None,
                latitude: Some(26.0),
                longitude: Some(50.0),
                speed_knots: None,
                course_degrees: None,
                nav_status: None,
                destination: Some("DAMMAM".into()),
                last_update_ms: NOW - 60_000,
            },
        )
    }

    fn update(mmsi: &str, imo: Option<u32>) -> CanonicalUpdate {
        CanonicalUpdate { imo_number: imo, latitude: Some(21.5), longitude: Some(39.2), ..CanonicalUpdate::new(mmsi) }
    }

    #[test]
    fn empty_registry_inserts_with_synthetic_imo() {
        let store = MemoryRegistry::new();
        let op = IdentityResolver::new().resolve(&store, &update("403456789", None), NOW).unwrap();
        let Operation::Insert(v) = op else { panic!("expected insert, got {op:?}") };
        assert_eq!(v.imo_number.as_str(), "AIS-403456789");
        assert_eq!(v.vessel_name, "Unknown Vessel 403456789");
        assert_eq!(v.last_update_ms, NOW);
    }

    #[test]
    fn free_genuine_imo_is_used() {
        let store = MemoryRegistry::new();
        let u = CanonicalUpdate { vessel_name: Some("GULF STAR".into()), ..update("403456790", Some(9123456)) };
        let Operation::Insert(v) = IdentityResolver::new().resolve(&store, &u, NOW).unwrap() else { panic!() };
        assert_eq!(v.imo_number.as_str(), "9123456");
        assert_eq!(v.vessel_name, "GULF STAR");
    }

    #[test]
    fn taken_genuine_imo_falls_back_to_synthetic() {
        let store = MemoryRegistry::new().with_record(seed("111", ImoId::genuine(9123456), "GULF STAR"));
        let imo = IdentityResolver::new().assign_imo(&store, "999", Some(9123456)).unwrap();
        assert_eq!(imo.as_str(), "AIS-999");
    }

    #[test]
    fn same_genuine_imo_twice_in_one_batch() {
        let store = MemoryRegistry::new();
        let mut resolver = IdentityResolver::new();
        resolver.begin_batch();

        let Operation::Insert(first) = resolver.resolve(&store, &update("111", Some(9123456)), NOW).unwrap() else {
            panic!()
        };
        let Operation::Insert(second) = resolver.resolve(&store, &update("999", Some(9123456)), NOW).unwrap() else {
            panic!()
        };
        assert_eq!(first.imo_number.as_str(), "9123456");
        assert_eq!(second.imo_number.as_str(), "AIS-999");

        // Claims are per batch.
        resolver.begin_batch();
        assert_eq!(resolver.assign_imo(&store, "999", Some(9123456)).unwrap().as_str(), "9123456");
    }

    #[test]
    fn synthetic_collision_gets_suffix() {
        let store = MemoryRegistry::new()
            .with_record(seed("555", ImoId::synthetic("777"), "A"))
            .with_record(seed("556", ImoId::synthetic_with_suffix("777", 1), "B"));
        let mut resolver = IdentityResolver::new();
        assert_eq!(resolver.assign_imo(&store, "777", None).unwrap().as_str(), "AIS-777-2");
        assert_eq!(resolver.assign_imo(&store, "777", None).unwrap().as_str(), "AIS-777-3");
    }

    #[test]
    fn imo_match_with_new_mmsi_is_identity_merge() {
        let store = MemoryRegistry::new().with_record(seed("111", ImoId::genuine(9123456), "GULF STAR"));
        let u = CanonicalUpdate { vessel_name: Some("GULF STAR II".into()), ..update("222", Some(9123456)) };

        let op = IdentityResolver::new().resolve(&store, &u, NOW).unwrap();
        let Operation::IdentityMerge { id, patch } = op else { panic!("expected merge, got {op:?}") };
        assert_eq!(id, VesselId("id-111".into()));
        assert_eq!(patch.mmsi.as_deref(), Some("222"));
        assert_eq!(patch.vessel_name.as_deref(), Some("GULF STAR II"));
        assert_eq!(patch.imo_number, None);
        assert_eq!(patch.latitude, Some(21.5));
    }

    #[test]
    fn merge_skips_unchanged_name() {
        let store = MemoryRegistry::new().with_record(seed("111", ImoId::genuine(9123456), "GULF STAR"));
        let u = CanonicalUpdate { vessel_name: Some("GULF STAR".into()), ..update("222", Some(9123456)) };
        let Operation::IdentityMerge { patch, .. } = IdentityResolver::new().resolve(&store, &u, NOW).unwrap() else {
            panic!()
        };
        assert_eq!(patch.vessel_name, None);
    }

    #[test]
    fn mmsi_match_takes_precedence() {
        let store = MemoryRegistry::new()
            .with_record(seed("111", ImoId::synthetic("111"), "Unknown Vessel 111"))
            .with_record(seed("333", ImoId::genuine(9123456), "OTHER"));
        let op = IdentityResolver::new().resolve(&store, &update("111", Some(9123456)), NOW).unwrap();
        let Operation::Update { id, patch } = op else { panic!("expected update, got {op:?}") };
        assert_eq!(id, VesselId("id-111".into()));
        // IMO held by another record stays put.
        assert_eq!(patch.imo_number, None);
        assert_eq!(patch.mmsi, None);
    }

    #[test]
    fn update_policy() {
        let store = MemoryRegistry::new()
            .with_record(seed("111", ImoId::synthetic("111"), "Unknown Vessel 111"))
            .with_record(seed("222", ImoId::synthetic("222"), "SAUDI TRADER"));
        let mut resolver = IdentityResolver::new();

        let named = CanonicalUpdate {
            vessel_name: Some("GULF STAR".into()),
            nav_status: Some(NavStatus::Moored),
            vessel_category: Some(VesselCategory::Tanker),
            ..update("111", Some(9123456))
        };
        let Operation::Update { patch, .. } = resolver.resolve(&store, &named, NOW).unwrap() else { panic!() };
        assert_eq!(patch.vessel_name.as_deref(), Some("GULF STAR"));
        assert_eq!(patch.imo_number, Some(ImoId::genuine(9123456)));
        assert_eq!(patch.nav_status, Some(NavStatus::Moored));
        assert_eq!(patch.vessel_category, Some(VesselCategory::Tanker));
        assert_eq!(patch.destination, None);
        assert_eq!(patch.last_update_ms, NOW);

        let renamed = CanonicalUpdate { vessel_name: Some("SOMETHING ELSE".into()), ..update("222", None) };
        let Operation::Update { patch, .. } = resolver.resolve(&store, &renamed, NOW).unwrap() else { panic!() };
        assert_eq!(patch.vessel_name, None);
        assert_eq!(patch.imo_number, None);
        assert_eq!((patch.latitude, patch.longitude), (Some(21.5), Some(39.2)));
    }
}
