//! Attendance repository.
//!
//! Attendance rows are immutable once written; this repository only
//! inserts and reads. Member existence is enforced by the store's
//! foreign key, not re-validated here.

use crate::db::StoreResult;
use rusqlite::{params, Connection};

/// One check-in event.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub id: i64,
    pub member_id: i64,
    pub date: String,
    pub check_in_time: String,
}

/// Check-in event joined with the member's name for display.
#[derive(Debug, Clone)]
pub struct AttendanceWithName {
    pub id: i64,
    pub member_id: i64,
    pub full_name: String,
    pub date: String,
    pub check_in_time: String,
}

pub struct AttendanceRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AttendanceRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Insert one check-in. Fails (via the FK constraint) if the member
    /// id does not resolve at insertion time.
    pub fn insert(&self, member_id: i64, date: &str, check_in_time: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO Attendance (member_id, date, check_in_time) VALUES (?1, ?2, ?3)",
            params![member_id, date, check_in_time],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(member_id, date, check_in_time, "attendance inserted");
        Ok(id)
    }

    pub fn for_member(&self, member_id: i64) -> StoreResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, date, check_in_time FROM Attendance
             WHERE member_id = ?1 ORDER BY id",
        )?;
        let mut rows = stmt.query([member_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(AttendanceRecord {
                id: row.get(0)?,
                member_id: row.get(1)?,
                date: row.get(2)?,
                check_in_time: row.get(3)?,
            });
        }
        Ok(records)
    }

    /// All check-ins joined with member names.
    pub fn all_with_names(&self) -> StoreResult<Vec<AttendanceWithName>> {
        let mut stmt = self.conn.prepare(
            "SELECT A.id, A.member_id, M.full_name, A.date, A.check_in_time
             FROM Attendance AS A
             JOIN Members AS M ON A.member_id = M.id
             ORDER BY A.id",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(AttendanceWithName {
                id: row.get(0)?,
                member_id: row.get(1)?,
                full_name: row.get(2)?,
                date: row.get(3)?,
                check_in_time: row.get(4)?,
            });
        }
        Ok(records)
    }
}
