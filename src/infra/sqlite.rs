//! SQLite-backed store.
//!
//! Every transaction opens its own connection and starts with
//! `BEGIN IMMEDIATE`, so writers are serialized by the database lock and a
//! conditional `UPDATE`'s change count is an exact witness of ownership.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::model::{
    format_folio, Bed, BedRef, BedStatus, Doctor, DoctorId, DoctorLoad, NewVisit,
    OpenVisitSummary, Visit, VisitStatus,
};
use crate::core::{AllocationError, AllocationStore, StoreTransaction};

const VISIT_COLUMNS: &str = "folio, patient_id, doctor_id, worker_id, room_id, bed_id, \
                             origin, priority, reason, opened_at, closed_at, status";

impl ToSql for VisitStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for VisitStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for BedStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BedStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "FREE" => Ok(Self::Free),
            "OCCUPIED" => Ok(Self::Occupied),
            other => Err(FromSqlError::Other(
                format!("unknown bed status `{other}`").into(),
            )),
        }
    }
}

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        folio: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        worker_id: row.get(3)?,
        room_id: row.get(4)?,
        bed_id: row.get(5)?,
        origin: row.get(6)?,
        priority: row.get(7)?,
        reason: row.get(8)?,
        opened_at: row.get(9)?,
        closed_at: row.get(10)?,
        status: row.get(11)?,
    })
}

/// `:memory:`, `file::memory:?cache=shared` and `?mode=memory` URIs.
fn is_in_memory(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.contains(":memory:") || name.contains("mode=memory")
}

/// SQLite store addressed by database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open a database file, creating the schema if needed.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] if the file cannot be
    /// opened or migrated, or if `path` names an in-memory database (each
    /// transaction uses its own connection, so the data would not be shared).
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, AllocationError> {
        let path = path.as_ref().to_path_buf();
        if is_in_memory(&path) {
            return Err(AllocationError::StoreUnavailable(
                "sqlite backend needs a database file".into(),
            ));
        }
        let store = Self { path, busy_timeout };
        store.migrate()?;
        tracing::debug!(path = %store.path.display(), "sqlite store ready");
        Ok(store)
    }

    /// Database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Migration statements for the allocation schema.
    #[must_use]
    pub const fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS doctors (
    id INTEGER PRIMARY KEY,
    active INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1)),
    available INTEGER NOT NULL DEFAULT 1 CHECK (available IN (0, 1))
);
CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS beds (
    room_id INTEGER NOT NULL REFERENCES rooms (id),
    bed_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'FREE' CHECK (status IN ('FREE', 'OCCUPIED')),
    PRIMARY KEY (room_id, bed_id)
);
",
            r"
CREATE TABLE IF NOT EXISTS visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folio TEXT UNIQUE,
    patient_id INTEGER NOT NULL,
    doctor_id INTEGER NOT NULL REFERENCES doctors (id),
    worker_id INTEGER NOT NULL,
    room_id INTEGER NOT NULL,
    bed_id INTEGER NOT NULL,
    origin TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 3,
    reason TEXT NOT NULL DEFAULT '',
    opened_at TEXT NOT NULL,
    closed_at TEXT,
    status TEXT NOT NULL CHECK (status IN ('OPEN', 'CLOSED')),
    FOREIGN KEY (room_id, bed_id) REFERENCES beds (room_id, bed_id)
);
CREATE INDEX IF NOT EXISTS idx_visits_status_opened ON visits (status, opened_at);
CREATE INDEX IF NOT EXISTS idx_visits_doctor_status ON visits (doctor_id, status);
",
        ]
    }

    /// Apply [`SqliteStore::migrations`] and switch the file to WAL journaling.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn migrate(&self) -> Result<(), AllocationError> {
        let conn = self.connect()?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
        for statement in Self::migrations() {
            conn.execute_batch(statement)?;
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection, AllocationError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Add or replace a doctor row.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn insert_doctor(&self, doctor: &Doctor) -> Result<(), AllocationError> {
        self.connect()?.execute(
            "INSERT OR REPLACE INTO doctors (id, active, available) VALUES (?1, ?2, ?3)",
            params![doctor.id, doctor.active, doctor.available],
        )?;
        Ok(())
    }

    /// Add an active, available doctor.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn add_doctor(&self, id: DoctorId) -> Result<(), AllocationError> {
        self.insert_doctor(&Doctor {
            id,
            active: true,
            available: true,
        })
    }

    /// Add or replace a bed row, creating its room if needed.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn insert_bed(&self, bed: &Bed) -> Result<(), AllocationError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO rooms (id) VALUES (?1)",
            params![bed.location.room_id],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO beds (room_id, bed_id, status) VALUES (?1, ?2, ?3)",
            params![bed.location.room_id, bed.location.bed_id, bed.status],
        )?;
        Ok(())
    }

    /// Add a free bed.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn add_bed(&self, location: BedRef) -> Result<(), AllocationError> {
        self.insert_bed(&Bed {
            location,
            status: BedStatus::Free,
        })
    }

    /// Doctor row by id.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn doctor(&self, id: DoctorId) -> Result<Option<Doctor>, AllocationError> {
        let doctor = self
            .connect()?
            .query_row(
                "SELECT id, active, available FROM doctors WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Doctor {
                        id: row.get(0)?,
                        active: row.get(1)?,
                        available: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(doctor)
    }

    /// Bed row by location.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn bed(&self, location: BedRef) -> Result<Option<Bed>, AllocationError> {
        let bed = self
            .connect()?
            .query_row(
                "SELECT status FROM beds WHERE room_id = ?1 AND bed_id = ?2",
                params![location.room_id, location.bed_id],
                |row| {
                    Ok(Bed {
                        location,
                        status: row.get(0)?,
                    })
                },
            )
            .optional()?;
        Ok(bed)
    }

    /// Visit by folio.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn visit(&self, folio: &str) -> Result<Option<Visit>, AllocationError> {
        read_visit(&self.connect()?, folio)
    }

    /// All visits in creation order.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on failure.
    pub fn visits(&self) -> Result<Vec<Visit>, AllocationError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {VISIT_COLUMNS} FROM visits ORDER BY id"))?;
        let visits = stmt
            .query_map([], visit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(visits)
    }
}

fn read_visit(conn: &Connection, folio: &str) -> Result<Option<Visit>, AllocationError> {
    let visit = conn
        .query_row(
            &format!("SELECT {VISIT_COLUMNS} FROM visits WHERE folio = ?1"),
            params![folio],
            visit_from_row,
        )
        .optional()?;
    Ok(visit)
}

impl AllocationStore for SqliteStore {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AllocationError> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(Box::new(SqliteTransaction {
            conn,
            finished: false,
        }))
    }

    fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT folio, patient_id, doctor_id, room_id, bed_id, priority, reason, opened_at \
             FROM visits WHERE status = 'OPEN' ORDER BY opened_at DESC, id DESC",
        )?;
        let open = stmt
            .query_map([], |row| {
                Ok(OpenVisitSummary {
                    folio: row.get(0)?,
                    patient_id: row.get(1)?,
                    doctor_id: row.get(2)?,
                    room_id: row.get(3)?,
                    bed_id: row.get(4)?,
                    priority: row.get(5)?,
                    reason: row.get(6)?,
                    opened_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(open)
    }
}

/// Transaction on a dedicated connection.
pub struct SqliteTransaction {
    conn: Connection,
    finished: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
                tracing::error!(error = %err, "sqlite rollback on drop failed");
            }
        }
    }
}

impl StoreTransaction for SqliteTransaction {
    fn doctor_loads(&mut self) -> Result<Vec<DoctorLoad>, AllocationError> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, \
                    (SELECT COUNT(*) FROM visits v \
                      WHERE v.doctor_id = d.id AND v.status = 'OPEN') AS open_visits \
             FROM doctors d \
             WHERE d.active = 1 AND d.available = 1 \
             ORDER BY open_visits ASC, d.id ASC",
        )?;
        let loads = stmt
            .query_map([], |row| {
                Ok(DoctorLoad {
                    doctor_id: row.get(0)?,
                    open_visits: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loads)
    }

    fn free_beds(&mut self) -> Result<Vec<BedRef>, AllocationError> {
        let mut stmt = self.conn.prepare(
            "SELECT room_id, bed_id FROM beds WHERE status = 'FREE' ORDER BY room_id, bed_id",
        )?;
        let beds = stmt
            .query_map([], |row| Ok(BedRef::new(row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(beds)
    }

    fn visit(&mut self, folio: &str) -> Result<Option<Visit>, AllocationError> {
        read_visit(&self.conn, folio)
    }

    fn claim_doctor(&mut self, doctor_id: DoctorId) -> Result<usize, AllocationError> {
        Ok(self.conn.execute(
            "UPDATE doctors SET available = 0 WHERE id = ?1 AND available = 1",
            params![doctor_id],
        )?)
    }

    fn release_doctor(&mut self, doctor_id: DoctorId) -> Result<usize, AllocationError> {
        Ok(self.conn.execute(
            "UPDATE doctors SET available = 1 WHERE id = ?1",
            params![doctor_id],
        )?)
    }

    fn claim_bed(&mut self, bed: BedRef) -> Result<usize, AllocationError> {
        Ok(self.conn.execute(
            "UPDATE beds SET status = 'OCCUPIED' \
             WHERE room_id = ?1 AND bed_id = ?2 AND status = 'FREE'",
            params![bed.room_id, bed.bed_id],
        )?)
    }

    fn release_bed(&mut self, bed: BedRef) -> Result<usize, AllocationError> {
        Ok(self.conn.execute(
            "UPDATE beds SET status = 'FREE' WHERE room_id = ?1 AND bed_id = ?2",
            params![bed.room_id, bed.bed_id],
        )?)
    }

    fn insert_visit(&mut self, visit: &NewVisit) -> Result<String, AllocationError> {
        self.conn.execute(
            "INSERT INTO visits (patient_id, doctor_id, worker_id, room_id, bed_id, \
                                 origin, priority, reason, opened_at, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                visit.patient_id,
                visit.doctor_id,
                visit.worker_id,
                visit.bed.room_id,
                visit.bed.bed_id,
                visit.origin,
                visit.priority,
                visit.reason,
                visit.opened_at,
                VisitStatus::Open,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let folio = format_folio(id);
        self.conn.execute(
            "UPDATE visits SET folio = ?1 WHERE id = ?2",
            params![folio, id],
        )?;
        Ok(folio)
    }

    fn close_visit(
        &mut self,
        folio: &str,
        closed_at: DateTime<Utc>,
    ) -> Result<usize, AllocationError> {
        Ok(self.conn.execute(
            "UPDATE visits SET status = 'CLOSED', closed_at = ?1 \
             WHERE folio = ?2 AND status = 'OPEN'",
            params![closed_at, folio],
        )?)
    }

    fn commit(mut self: Box<Self>) -> Result<(), AllocationError> {
        let result = self.conn.execute_batch("COMMIT;");
        // On failure the drop handler issues ROLLBACK.
        self.finished = result.is_ok();
        result.map_err(Into::into)
    }

    fn rollback(mut self: Box<Self>) -> Result<(), AllocationError> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK;").map_err(Into::into)
    }
}
