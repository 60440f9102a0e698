//! Batch execution of resolved registry operations.
//!
//! Operations are grouped by kind and each group runs in its own transaction,
//! in the order updates → identity merges → inserts. Inside a group:
//!
//! - an identity conflict (or an update whose target vanished) skips that one
//!   operation and the group carries on;
//! - any other error rolls the whole group back and is reported; later groups
//!   are still attempted.
//!
//! Nothing is retried. A record that failed waits for its next stream update.

use ais_core::error::RegistryError;
use tracing::{debug, error, warn};

use crate::registry::RegistryStore;
use crate::resolver::{Operation, OperationKind};

/// Order groups are applied in.
const GROUP_ORDER: [OperationKind; 3] = [OperationKind::Update, OperationKind::IdentityMerge, OperationKind::Insert];

/// One operation skipped inside an otherwise committed group.
#[derive(Debug)]
pub struct SkippedOperation {
    pub kind: OperationKind,
    /// MMSI for inserts, record id otherwise.
    pub target: String,
    pub error: RegistryError,
}

/// A group whose transaction was rolled back.
#[derive(Debug)]
pub struct GroupFailure {
    pub kind: OperationKind,
    pub operations: usize,
    pub error: RegistryError,
}

/// Outcome of [`BatchExecutor::apply`].
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: Vec<SkippedOperation>,
    pub failed_groups: Vec<GroupFailure>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed_groups.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BatchExecutor;

impl BatchExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Apply `operations` group by group.
    pub fn apply<S: RegistryStore + ?Sized>(&self, store: &mut S, operations: Vec<Operation>) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut groups: [Vec<Operation>; 3] = Default::default();
        for op in operations {
            let slot = GROUP_ORDER.iter().position(|k| *k == op.kind()).unwrap_or(GROUP_ORDER.len() - 1);
            groups[slot].push(op);
        }

        for (kind, group) in GROUP_ORDER.into_iter().zip(groups) {
            if group.is_empty() {
                continue;
            }
            let operations = group.len();
            match apply_group(store, kind, group, &mut report.skipped) {
                Ok(applied) => {
                    debug!("[registry] {kind} group committed: {applied}/{operations} applied");
                    report.applied += applied;
                }
                Err(e) => {
                    error!("[registry] {kind} group rolled back ({operations} operations): {e}");
                    report.failed_groups.push(GroupFailure { kind, operations, error: e });
                }
            }
        }
        report
    }
}

fn apply_group<S: RegistryStore + ?Sized>(
    store: &mut S,
    kind: OperationKind,
    group: Vec<Operation>,
    skipped: &mut Vec<SkippedOperation>,
) -> Result<usize, RegistryError> {
    store.begin()?;
    let mut applied = 0;
    let mut group_skipped = Vec::new();

    for op in group {
        let target = target_of(&op);
        match apply_one(store, op) {
            Ok(()) => applied += 1,
            Err(e) if is_skippable(kind, &e) => {
                warn!("[registry] {kind} skipped for {target}: {e}");
                group_skipped.push(SkippedOperation { kind, target, error: e });
            }
            Err(e) => {
                rollback(store, kind);
                return Err(e);
            }
        }
    }

    if let Err(e) = store.commit() {
        rollback(store, kind);
        return Err(e);
    }
    skipped.extend(group_skipped);
    Ok(applied)
}

fn apply_one<S: RegistryStore + ?Sized>(store: &mut S, op: Operation) -> Result<(), RegistryError> {
    match op {
        Operation::Insert(vessel) => store.insert(&vessel).map(|_| ()),
        Operation::Update { id, patch } | Operation::IdentityMerge { id, patch } => store.update(&id, &patch),
    }
}

fn is_skippable(kind: OperationKind, e: &RegistryError) -> bool {
    e.is_conflict() || (kind != OperationKind::Insert && matches!(e, RegistryError::NotFound(_)))
}

fn rollback<S: RegistryStore + ?Sized>(store: &mut S, kind: OperationKind) {
    if let Err(e) = store.rollback() {
        error!("[registry] {kind} rollback failed: {e}");
    }
}

fn target_of(op: &Operation) -> String {
    match op {
        Operation::Insert(v) => v.mmsi.clone(),
        Operation::Update { id, .. } | Operation::IdentityMerge { id, .. } => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use ais_core::types::{ImoId, NewVessel, VesselId, VesselPatch, VesselRecord};

    use super::*;
    use crate::registry::MemoryRegistry;

    fn new_vessel(mmsi: &str, imo: ImoId) -> NewVessel {
        NewVessel {
            mmsi: mmsi.into(),
            imo_number: imo,
            vessel_name: format!("Unknown Vessel {mmsi}"),
            call_sign: None,
            vessel_category: None,
            latitude: Some(21.5),
            longitude: Some(39.2),
            speed_knots: None,
            course_degrees: None,
            nav_status: None,
            destination: None,
            last_update_ms: 1,
        }
    }

    fn seeded(mmsi: &str, imo: ImoId) -> (MemoryRegistry, VesselId) {
        let id = VesselId(format!("id-{mmsi}"));
        let reg = MemoryRegistry::new().with_record(VesselRecord::from_new(id.clone(), new_vessel(mmsi, imo)));
        (reg, id)
    }

    /// Memory registry that fails inserts for one MMSI with a backend error.
    struct FailingInserts {
        inner: MemoryRegistry,
        poison_mmsi: &'static str,
    }

    impl RegistryStore for FailingInserts {
        fn backend(&self) -> &'static str {
            "failing"
        }
        fn find_by_mmsi(&self, mmsi: &str) -> Result<Option<VesselRecord>, RegistryError> {
            self.inner.find_by_mmsi(mmsi)
        }
        fn find_by_imo(&self, imo: &ImoId) -> Result<Option<VesselRecord>, RegistryError> {
            self.inner.find_by_imo(imo)
        }
        fn exists_imo(&self, imo: &ImoId) -> Result<bool, RegistryError> {
            self.inner.exists_imo(imo)
        }
        fn begin(&mut self) -> Result<(), RegistryError> {
            self.inner.begin()
        }
        fn insert(&mut self, vessel: &NewVessel) -> Result<VesselId, RegistryError> {
            if vessel.mmsi == self.poison_mmsi {
                return Err(RegistryError::Backend("disk I/O error".into()));
            }
            self.inner.insert(vessel)
        }
        fn update(&mut self, id: &VesselId, patch: &VesselPatch) -> Result<(), RegistryError> {
            self.inner.update(id, patch)
        }
        fn commit(&mut self) -> Result<(), RegistryError> {
            self.inner.commit()
        }
        fn rollback(&mut self) -> Result<(), RegistryError> {
            self.inner.rollback()
        }
    }

    #[test]
    fn duplicate_insert_is_skipped_and_rest_proceeds() {
        let (mut reg, _) = seeded("111", ImoId::genuine(9123456));
        let ops = vec![
            Operation::Insert(new_vessel("222", ImoId::synthetic("222"))),
            Operation::Insert(new_vessel("333", ImoId::genuine(9123456))),
            Operation::Insert(new_vessel("444", ImoId::synthetic("444"))),
        ];

        let report = BatchExecutor::new().apply(&mut reg, ops);
        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].target, "333");
        assert!(report.failed_groups.is_empty());
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn backend_error_rolls_back_only_its_group() {
        let (inner, id) = seeded("111", ImoId::synthetic("111"));
        let mut store = FailingInserts { inner, poison_mmsi: "666" };
        let ops = vec![
            Operation::Insert(new_vessel("555", ImoId::synthetic("555"))),
            Operation::Update {
                id: id.clone(),
                patch: VesselPatch { latitude: Some(22.0), last_update_ms: 2, ..Default::default() },
            },
            Operation::Insert(new_vessel("666", ImoId::synthetic("666"))),
        ];

        let report = BatchExecutor::new().apply(&mut store, ops);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failed_groups.len(), 1);
        assert_eq!(report.failed_groups[0].kind, OperationKind::Insert);
        assert_eq!(report.failed_groups[0].operations, 2);

        // The update group committed; the insert of 555 went with the rollback.
        assert_eq!(store.inner.get(&id).unwrap().latitude, Some(22.0));
        assert!(store.inner.find_by_mmsi("555").unwrap().is_none());
        assert_eq!(store.inner.len(), 1);
    }

    #[test]
    fn identity_merge_rewrites_mmsi() {
        let (mut reg, id) = seeded("111", ImoId::genuine(9123456));
        let ops = vec![Operation::IdentityMerge {
            id: id.clone(),
            patch: VesselPatch { mmsi: Some("222".into()), last_update_ms: 5, ..Default::default() },
        }];

        let report = BatchExecutor::new().apply(&mut reg, ops);
        assert!(report.is_clean());
        assert_eq!(report.applied, 1);
        let rec = reg.get(&id).unwrap();
        assert_eq!(rec.mmsi, "222");
        assert_eq!(rec.imo_number.as_str(), "9123456");
    }

    #[test]
    fn update_of_vanished_record_is_skipped() {
        let (mut reg, id) = seeded("111", ImoId::synthetic("111"));
        let ops = vec![
            Operation::Update { id: VesselId("gone".into()), patch: VesselPatch::default() },
            Operation::Update { id: id.clone(), patch: VesselPatch { speed_knots: Some(3.0), ..Default::default() } },
        ];

        let report = BatchExecutor::new().apply(&mut reg, ops);
        assert_eq!(report.applied, 1);
        assert!(matches!(report.skipped[0].error, RegistryError::NotFound(_)));
        assert_eq!(reg.get(&id).unwrap().speed_knots, Some(3.0));
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let mut reg = MemoryRegistry::new();
        let report = BatchExecutor::new().apply(&mut reg, Vec::new());
        assert_eq!(report.applied, 0);
        assert!(report.is_clean());
    }
}
