//! SQLite-backed vessel registry.
//!
//! One `vessels` table; `imo_number` carries the UNIQUE constraint that
//! arbitrates identity races. Enum columns are stored as their text names.

use std::path::Path;

use ais_core::error::RegistryError;
use ais_core::types::{ImoId, NavStatus, NewVessel, VesselCategory, VesselId, VesselPatch, VesselRecord};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::info;

use super::{RegistryStore, new_vessel_id};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vessels (
    id TEXT PRIMARY KEY,
    mmsi TEXT NOT NULL,
    imo_number TEXT NOT NULL UNIQUE,
    vessel_name TEXT NOT NULL,
    call_sign TEXT,
    vessel_type TEXT,
    latitude REAL,
    longitude REAL,
    speed_knots REAL,
    course_degrees REAL,
    nav_status TEXT,
    destination TEXT,
    last_update_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vessels_mmsi ON vessels(mmsi, last_update_ms DESC);
";

const SELECT_COLUMNS: &str = "SELECT id, mmsi, imo_number, vessel_name, call_sign, vessel_type, latitude, \
     longitude, speed_knots, course_degrees, nav_status, destination, last_update_ms FROM vessels";

/// Registry stored in a SQLite database file.
pub struct SqliteRegistry {
    conn: Connection,
}

impl SqliteRegistry {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RegistryError::Backend(format!("failed to create database directory {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(db_path).map_err(backend)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(backend)?;
        let registry = Self::with_connection(conn)?;
        info!("[registry] sqlite registry at {}", db_path.display());
        Ok(registry)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self, RegistryError> {
        Self::with_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RegistryError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self { conn })
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &VesselId) -> Result<Option<VesselRecord>, RegistryError> {
        self.query_one(&format!("{SELECT_COLUMNS} WHERE id = ?1"), id.as_str())
    }

    pub fn count(&self) -> Result<usize, RegistryError> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM vessels", [], |row| row.get(0)).map_err(backend)?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    fn query_one(&self, sql: &str, key: &str) -> Result<Option<VesselRecord>, RegistryError> {
        self.conn.query_row(sql, params![key], record_from_row).optional().map_err(backend)
    }
}

impl RegistryStore for SqliteRegistry {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn find_by_mmsi(&self, mmsi: &str) -> Result<Option<VesselRecord>, RegistryError> {
        self.query_one(&format!("{SELECT_COLUMNS} WHERE mmsi = ?1 ORDER BY last_update_ms DESC LIMIT 1"), mmsi)
    }

    fn find_by_imo(&self, imo: &ImoId) -> Result<Option<VesselRecord>, RegistryError> {
        self.query_one(&format!("{SELECT_COLUMNS} WHERE imo_number = ?1"), imo.as_str())
    }

    fn exists_imo(&self, imo: &ImoId) -> Result<bool, RegistryError> {
        self.conn
            .query_row("SELECT 1 FROM vessels WHERE imo_number = ?1", params![imo.as_str()], |_| Ok(()))
            .optional()
            .map(|hit| hit.is_some())
            .map_err(backend)
    }

    fn begin(&mut self) -> Result<(), RegistryError> {
        self.conn.execute_batch("BEGIN").map_err(backend)
    }

    fn insert(&mut self, vessel: &NewVessel) -> Result<VesselId, RegistryError> {
        let id = new_vessel_id();
        self.conn
            .execute(
                "INSERT INTO vessels
                 (id, mmsi, imo_number, vessel_name, call_sign, vessel_type, latitude, longitude,
                  speed_knots, course_degrees, nav_status, destination, last_update_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id.as_str(),
                    vessel.mmsi,
                    vessel.imo_number.as_str(),
                    vessel.vessel_name,
                    vessel.call_sign,
                    vessel.vessel_category.map(|c| c.as_str()),
                    vessel.latitude,
                    vessel.longitude,
                    vessel.speed_knots,
                    vessel.course_degrees,
                    vessel.nav_status.map(|s| s.as_str()),
                    vessel.destination,
                    to_sql_ms(vessel.last_update_ms),
                ],
            )
            .map_err(|e| write_error(e, &vessel.imo_number))?;
        Ok(id)
    }

    fn update(&mut self, id: &VesselId, patch: &VesselPatch) -> Result<(), RegistryError> {
        let changed = self
            .conn
            .execute(
                "UPDATE vessels SET
                    mmsi = COALESCE(?2, mmsi),
                    imo_number = COALESCE(?3, imo_number),
                    vessel_name = COALESCE(?4, vessel_name),
                    call_sign = COALESCE(?5, call_sign),
                    vessel_type = COALESCE(?6, vessel_type),
                    latitude = COALESCE(?7, latitude),
                    longitude = COALESCE(?8, longitude),
                    speed_knots = COALESCE(?9, speed_knots),
                    course_degrees = COALESCE(?10, course_degrees),
                    nav_status = COALESCE(?11, nav_status),
                    destination = COALESCE(?12, destination),
                    last_update_ms = ?13
                 WHERE id = ?1",
                params![
                    id.as_str(),
                    patch.mmsi,
                    patch.imo_number.as_ref().map(|i| i.as_str()),
                    patch.vessel_name,
                    patch.call_sign,
                    patch.vessel_category.map(|c| c.as_str()),
                    patch.latitude,
                    patch.longitude,
                    patch.speed_knots,
                    patch.course_degrees,
                    patch.nav_status.map(|s| s.as_str()),
                    patch.destination,
                    to_sql_ms(patch.last_update_ms),
                ],
            )
            .map_err(|e| match &patch.imo_number {
                Some(imo) => write_error(e, imo),
                None => backend(e),
            })?;
        if changed == 0 {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), RegistryError> {
        self.conn.execute_batch("COMMIT").map_err(backend)
    }

    fn rollback(&mut self) -> Result<(), RegistryError> {
        self.conn.execute_batch("ROLLBACK").map_err(backend)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<VesselRecord> {
    let vessel_type: Option<String> = row.get(5)?;
    let nav_status: Option<String> = row.get(10)?;
    let last_update_ms: i64 = row.get(12)?;
    Ok(VesselRecord {
        id: VesselId(row.get(0)?),
        mmsi: row.get(1)?,
        imo_number: ImoId::from_stored(row.get::<_, String>(2)?),
        vessel_name: row.get(3)?,
        call_sign: row.get(4)?,
        vessel_category: vessel_type.and_then(|t| t.parse::<VesselCategory>().ok()),
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        speed_knots: row.get(8)?,
        course_degrees: row.get(9)?,
        nav_status: nav_status.and_then(|s| s.parse::<NavStatus>().ok()),
        destination: row.get(11)?,
        last_update_ms: u64::try_from(last_update_ms).unwrap_or_default(),
    })
}

fn to_sql_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

fn backend(e: rusqlite::Error) -> RegistryError {
    RegistryError::Backend(e.to_string())
}

/// Map a write failure, turning a UNIQUE violation into an identity conflict.
fn write_error(e: rusqlite::Error, imo: &ImoId) -> RegistryError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => {
            RegistryError::Duplicate { field: "imo_number", value: imo.to_string() }
        }
        _ => backend(e),
    }
}
