//! Registry-side vessel types.
//!
//! The registry holds one [`VesselRecord`] per ship. A record is addressed by
//! its stable [`VesselId`]; its MMSI may change over time (transponder swaps),
//! while its [`ImoId`] is unique across the registry.

use std::fmt;

use super::enums::{NavStatus, VesselCategory};

/// Prefix marking an IMO identifier generated from an MMSI.
pub const SYNTHETIC_IMO_PREFIX: &str = "AIS-";

/// Prefix of the placeholder name given to vessels inserted without a name.
pub const UNKNOWN_VESSEL_PREFIX: &str = "Unknown Vessel";

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable registry identifier of a vessel record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VesselId(pub String);

impl VesselId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VesselId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The registry's IMO column: either a genuine IMO number or a synthetic
/// placeholder (`AIS-<mmsi>` or `AIS-<mmsi>-<n>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImoId(String);

impl ImoId {
    pub fn genuine(imo: u32) -> Self {
        Self(imo.to_string())
    }

    pub fn synthetic(mmsi: &str) -> Self {
        Self(format!("{SYNTHETIC_IMO_PREFIX}{mmsi}"))
    }

    /// `AIS-<mmsi>-<n>`, used when the plain synthetic id is already taken.
    pub fn synthetic_with_suffix(mmsi: &str, n: u32) -> Self {
        Self(format!("{SYNTHETIC_IMO_PREFIX}{mmsi}-{n}"))
    }

    /// Wrap a value read back from storage.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_IMO_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placeholder name for a vessel first seen without a name.
pub fn placeholder_name(mmsi: &str) -> String {
    format!("{UNKNOWN_VESSEL_PREFIX} {mmsi}")
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A vessel as stored in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct VesselRecord {
    pub id: VesselId,
    pub mmsi: String,
    pub imo_number: ImoId,
    pub vessel_name: String,
    pub call_sign: Option<String>,
    pub vessel_category: Option<VesselCategory>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub course_degrees: Option<f64>,
    pub nav_status: Option<NavStatus>,
    pub destination: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub last_update_ms: u64,
}

impl VesselRecord {
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Whether the stored name may be replaced by a broadcast name.
    pub fn has_placeholder_name(&self) -> bool {
        let name = self.vessel_name.trim();
        name.is_empty() || name.starts_with(UNKNOWN_VESSEL_PREFIX)
    }

    /// Build a record from an insert payload and the id the store assigned.
    pub fn from_new(id: VesselId, new: NewVessel) -> Self {
        Self {
            id,
            mmsi: new.mmsi,
            imo_number: new.imo_number,
            vessel_name: new.vessel_name,
            call_sign: new.call_sign,
            vessel_category: new.vessel_category,
            latitude: new.latitude,
            longitude: new.longitude,
            speed_knots: new.speed_knots,
            course_degrees: new.course_degrees,
            nav_status: new.nav_status,
            destination: new.destination,
            last_update_ms: new.last_update_ms,
        }
    }

    /// Apply a partial update in place. Absent patch fields are left untouched.
    pub fn apply_patch(&mut self, patch: &VesselPatch) {
        if let Some(mmsi) = &patch.mmsi {
            self.mmsi = mmsi.clone();
        }
        if let Some(imo) = &patch.imo_number {
            self.imo_number = imo.clone();
        }
        if let Some(name) = &patch.vessel_name {
            self.vessel_name = name.clone();
        }
        if patch.call_sign.is_some() {
            self.call_sign = patch.call_sign.clone();
        }
        if patch.vessel_category.is_some() {
            self.vessel_category = patch.vessel_category;
        }
        if patch.latitude.is_some() {
            self.latitude = patch.latitude;
        }
        if patch.longitude.is_some() {
            self.longitude = patch.longitude;
        }
        if patch.speed_knots.is_some() {
            self.speed_knots = patch.speed_knots;
        }
        if patch.course_degrees.is_some() {
            self.course_degrees = patch.course_degrees;
        }
        if patch.nav_status.is_some() {
            self.nav_status = patch.nav_status;
        }
        if patch.destination.is_some() {
            self.destination = patch.destination.clone();
        }
        self.last_update_ms = patch.last_update_ms;
    }
}

/// Insert payload: a full record minus the store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVessel {
    pub mmsi: String,
    pub imo_number: ImoId,
    pub vessel_name: String,
    pub call_sign: Option<String>,
    pub vessel_category: Option<VesselCategory>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub course_degrees: Option<f64>,
    pub nav_status: Option<NavStatus>,
    pub destination: Option<String>,
    pub last_update_ms: u64,
}

/// Typed partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VesselPatch {
    pub mmsi: Option<String>,
    pub imo_number: Option<ImoId>,
    pub vessel_name: Option<String>,
    pub call_sign: Option<String>,
    pub vessel_category: Option<VesselCategory>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub course_degrees: Option<f64>,
    pub nav_status: Option<NavStatus>,
    pub destination: Option<String>,
    /// Always refreshed.
    pub last_update_ms: u64,
}
