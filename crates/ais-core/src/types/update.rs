//! The canonical partial vessel update passed through the ingest pipeline.

use super::enums::{NavStatus, VesselCategory};

/// Maximum stored length of a vessel name, in characters.
pub const MAX_NAME_LEN: usize = 140;

/// Maximum stored length of a destination, in characters.
pub const MAX_DESTINATION_LEN: usize = 250;

/// A partial vessel report keyed by MMSI.
///
/// Every field except `mmsi` is optional: position reports and static-data
/// reports each fill a different subset, and the aggregator merges them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalUpdate {
    pub mmsi: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub course_degrees: Option<f64>,
    pub nav_status: Option<NavStatus>,
    pub vessel_name: Option<String>,
    pub destination: Option<String>,
    pub call_sign: Option<String>,
    /// Genuine IMO number as broadcast by the vessel.
    pub imo_number: Option<u32>,
    pub vessel_type_code: Option<i64>,
    pub vessel_category: Option<VesselCategory>,
}

impl CanonicalUpdate {
    pub fn new(mmsi: impl Into<String>) -> Self {
        Self { mmsi: mmsi.into(), ..Default::default() }
    }

    /// Both coordinates, when both are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Whether the update carries anything worth reconciling.
    ///
    /// Records holding only an MMSI (or only speed/course/status without a
    /// position) are dropped by the normalizer.
    pub fn is_meaningful(&self) -> bool {
        self.position().is_some()
            || self.vessel_name.is_some()
            || self.destination.is_some()
            || self.imo_number.is_some()
    }

    /// Merge a later update for the same vessel into `self`.
    ///
    /// Fields present in `newer` overwrite; fields absent in `newer` never
    /// erase a value already held.
    pub fn merge_newer(&mut self, newer: CanonicalUpdate) {
        overlay(&mut self.latitude, newer.latitude);
        overlay(&mut self.longitude, newer.longitude);
        overlay(&mut self.speed_knots, newer.speed_knots);
        overlay(&mut self.course_degrees, newer.course_degrees);
        overlay(&mut self.nav_status, newer.nav_status);
        overlay(&mut self.vessel_name, newer.vessel_name);
        overlay(&mut self.destination, newer.destination);
        overlay(&mut self.call_sign, newer.call_sign);
        overlay(&mut self.imo_number, newer.imo_number);
        overlay(&mut self.vessel_type_code, newer.vessel_type_code);
        overlay(&mut self.vessel_category, newer.vessel_category);
    }

    /// Merge an earlier update for the same vessel into `self`, only filling
    /// fields `self` does not already hold.
    pub fn merge_older(&mut self, older: CanonicalUpdate) {
        fill(&mut self.latitude, older.latitude);
        fill(&mut self.longitude, older.longitude);
        fill(&mut self.speed_knots, older.speed_knots);
        fill(&mut self.course_degrees, older.course_degrees);
        fill(&mut self.nav_status, older.nav_status);
        fill(&mut self.vessel_name, older.vessel_name);
        fill(&mut self.destination, older.destination);
        fill(&mut self.call_sign, older.call_sign);
        fill(&mut self.imo_number, older.imo_number);
        fill(&mut self.vessel_type_code, older.vessel_type_code);
        fill(&mut self.vessel_category, older.vessel_category);
    }
}

#[inline]
fn overlay<T>(slot: &mut Option<T>, newer: Option<T>) {
    if newer.is_some() {
        *slot = newer;
    }
}

#[inline]
fn fill<T>(slot: &mut Option<T>, older: Option<T>) {
    if slot.is_none() {
        *slot = older;
    }
}

/// Trim AIS text padding (whitespace and `@`) and cap the length.
///
/// Returns `None` when nothing remains.
pub fn clean_text(raw: &str, max_len: usize) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '@');
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_len).collect())
}
