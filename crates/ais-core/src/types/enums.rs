//! Enumerations decoded from AIS numeric codes.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Navigational status
// ---------------------------------------------------------------------------

/// Navigational status broadcast in AIS position reports.
///
/// Codes 0–8 map 1:1 to the variants below. Every other code, including the
/// reserved range and 15 ("not defined"), decodes to [`NavStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavStatus {
    UnderWay,
    AtAnchor,
    NotUnderCommand,
    RestrictedManoeuvrability,
    ConstrainedByDraught,
    Moored,
    Aground,
    Fishing,
    SailingUnderWay,
    Unknown,
}

impl NavStatus {
    /// Decode an AIS navigational status code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::UnderWay,
            1 => Self::AtAnchor,
            2 => Self::NotUnderCommand,
            3 => Self::RestrictedManoeuvrability,
            4 => Self::ConstrainedByDraught,
            5 => Self::Moored,
            6 => Self::Aground,
            7 => Self::Fishing,
            8 => Self::SailingUnderWay,
            _ => Self::Unknown,
        }
    }

    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnderWay => "UnderWay",
            Self::AtAnchor => "AtAnchor",
            Self::NotUnderCommand => "NotUnderCommand",
            Self::RestrictedManoeuvrability => "RestrictedManoeuvrability",
            Self::ConstrainedByDraught => "ConstrainedByDraught",
            Self::Moored => "Moored",
            Self::Aground => "Aground",
            Self::Fishing => "Fishing",
            Self::SailingUnderWay => "SailingUnderWay",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NavStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "UnderWay" => Self::UnderWay,
            "AtAnchor" => Self::AtAnchor,
            "NotUnderCommand" => Self::NotUnderCommand,
            "RestrictedManoeuvrability" => Self::RestrictedManoeuvrability,
            "ConstrainedByDraught" => Self::ConstrainedByDraught,
            "Moored" => Self::Moored,
            "Aground" => Self::Aground,
            "Fishing" => Self::Fishing,
            "SailingUnderWay" => Self::SailingUnderWay,
            "Unknown" => Self::Unknown,
            other => return Err(format!("unknown nav status: {other}")),
        })
    }
}

// ---------------------------------------------------------------------------
// Vessel category
// ---------------------------------------------------------------------------

/// Coarse ship category derived from the AIS "type of ship and cargo" code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VesselCategory {
    Fishing,
    Passenger,
    Cargo,
    Tanker,
    Other,
}

impl VesselCategory {
    /// Map a numeric ship type code to its category.
    pub fn from_type_code(code: i64) -> Self {
        match code {
            30..=32 => Self::Fishing,
            60..=69 => Self::Passenger,
            70..=79 => Self::Cargo,
            80..=89 => Self::Tanker,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fishing => "Fishing",
            Self::Passenger => "Passenger",
            Self::Cargo => "Cargo",
            Self::Tanker => "Tanker",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for VesselCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VesselCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Fishing" => Self::Fishing,
            "Passenger" => Self::Passenger,
            "Cargo" => Self::Cargo,
            "Tanker" => Self::Tanker,
            "Other" => Self::Other,
            other => return Err(format!("unknown vessel category: {other}")),
        })
    }
}
