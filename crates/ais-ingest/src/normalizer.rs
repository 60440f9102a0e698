//! AIS frame normalizer.
//!
//! Converts feed frames into [`CanonicalUpdate`]s. Routes by the top-level
//! `MessageType` field:
//!
//! - `PositionReport` → position, speed, course, nav status (+ metadata name)
//! - `ShipStaticData` → name, destination, call sign, IMO, ship type
//!   (+ metadata position when both coordinates are present)
//!
//! Any other message type is ignored. Fields the frame does not carry, or
//! carries as an AIS "not available" sentinel, are left `None`.

use ais_core::error::AisError;
use ais_core::types::{
    CanonicalUpdate, MAX_DESTINATION_LEN, MAX_NAME_LEN, NavStatus, VesselCategory, clean_text,
};
use serde_json::Value;

use crate::json_util::{parse_f64_field, parse_i64_field, parse_id, str_field};

/// Longest call sign kept. AIS call signs are 7 characters.
const MAX_CALL_SIGN_LEN: usize = 20;

/// Speed over ground at or above this value means "not available".
const SOG_NOT_AVAILABLE: f64 = 102.3;

/// Course over ground at or above this value means "not available".
const COG_NOT_AVAILABLE: f64 = 360.0;

/// Message type discriminant of a feed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    PositionReport,
    ShipStaticData,
    Other,
}

impl FrameKind {
    pub fn of(frame: &Value) -> Self {
        match str_field(frame, "MessageType") {
            Some("PositionReport") => Self::PositionReport,
            Some("ShipStaticData") => Self::ShipStaticData,
            _ => Self::Other,
        }
    }
}

/// Parse raw frame text as JSON.
pub fn parse_frame(text: &str) -> Result<Value, AisError> {
    let frame: Value = serde_json::from_str(text).map_err(|e| AisError::FrameParse(e.to_string()))?;
    if !frame.is_object() {
        return Err(AisError::FrameParse("frame is not a JSON object".into()));
    }
    Ok(frame)
}

/// Normalize a parsed frame.
///
/// Returns `None` for ignored message types, frames without a derivable
/// MMSI, and frames that carry nothing beyond the MMSI.
pub fn normalize(frame: &Value) -> Option<CanonicalUpdate> {
    let update = match FrameKind::of(frame) {
        FrameKind::PositionReport => normalize_position_report(frame)?,
        FrameKind::ShipStaticData => normalize_static_data(frame)?,
        FrameKind::Other => return None,
    };
    update.is_meaningful().then_some(update)
}

/// Parse and normalize raw frame text.
pub fn normalize_text(text: &str) -> Result<Option<CanonicalUpdate>, AisError> {
    Ok(normalize(&parse_frame(text)?))
}

// ---------------------------------------------------------------------------
// Individual message types
// ---------------------------------------------------------------------------

fn normalize_position_report(frame: &Value) -> Option<CanonicalUpdate> {
    let report = payload(frame, "PositionReport");
    let meta = frame.get("MetaData").unwrap_or(&Value::Null);

    let mmsi = parse_id(report.get("UserID")).or_else(|| parse_id(meta.get("MMSI")))?;
    let (latitude, longitude) = coordinates(report, "Latitude", "Longitude")
        .or_else(|| coordinates(meta, "latitude", "longitude"))
        .unzip();

    Some(CanonicalUpdate {
        mmsi,
        latitude,
        longitude,
        speed_knots: parse_f64_field(report, "Sog").filter(|s| (0.0..SOG_NOT_AVAILABLE).contains(s)),
        course_degrees: parse_f64_field(report, "Cog").filter(|c| (0.0..COG_NOT_AVAILABLE).contains(c)),
        nav_status: parse_i64_field(report, "NavigationalStatus").map(NavStatus::from_code),
        vessel_name: str_field(meta, "ShipName").and_then(|n| clean_text(n, MAX_NAME_LEN)),
        ..Default::default()
    })
}

fn normalize_static_data(frame: &Value) -> Option<CanonicalUpdate> {
    let data = payload(frame, "ShipStaticData");
    let meta = frame.get("MetaData").unwrap_or(&Value::Null);

    let mmsi = parse_id(data.get("UserID")).or_else(|| parse_id(meta.get("MMSI")))?;
    let (latitude, longitude) = coordinates(meta, "latitude", "longitude").unzip();
    let vessel_type_code = parse_i64_field(data, "Type");

    Some(CanonicalUpdate {
        mmsi,
        latitude,
        longitude,
        vessel_name: str_field(data, "Name")
            .and_then(|n| clean_text(n, MAX_NAME_LEN))
            .or_else(|| str_field(meta, "ShipName").and_then(|n| clean_text(n, MAX_NAME_LEN))),
        destination: str_field(data, "Destination").and_then(|d| clean_text(d, MAX_DESTINATION_LEN)),
        call_sign: str_field(data, "CallSign").and_then(|c| clean_text(c, MAX_CALL_SIGN_LEN)),
        imo_number: parse_i64_field(data, "ImoNumber")
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok()),
        vessel_type_code,
        vessel_category: vessel_type_code.map(VesselCategory::from_type_code),
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `Message.<kind>` payload, or `null` when absent.
fn payload<'a>(frame: &'a Value, kind: &str) -> &'a Value {
    frame.get("Message").and_then(|m| m.get(kind)).unwrap_or(&Value::Null)
}

/// A valid coordinate pair. AIS uses 91 / 181 as "not available".
fn coordinates(v: &Value, lat_key: &str, lon_key: &str) -> Option<(f64, f64)> {
    let lat = parse_f64_field(v, lat_key)?;
    let lon = parse_f64_field(v, lon_key)?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}
