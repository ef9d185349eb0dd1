//! Connection bootstrap and schema.
//!
//! `Storage::open` is the only fatal failure point of the whole engine:
//! if the database cannot be opened and bootstrapped at startup, the
//! application aborts. Everything downstream treats storage errors as
//! recoverable per-operation failures.

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::attendance::AttendanceRepo;
use crate::member::MemberRepo;
use crate::payment::PaymentRepo;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("member {0} not found")]
    MemberNotFound(i64),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Owns the SQLite connection for the lifetime of the application.
/// Repositories borrow the connection and never close it.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database file and bootstrap it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        tracing::info!(db = %path.display(), "connected to database");
        Self::bootstrap(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> StoreResult<Self> {
        // ON DELETE CASCADE needs foreign_keys enabled per connection.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn members(&self) -> MemberRepo<'_> {
        MemberRepo::new(&self.conn)
    }

    pub fn attendance(&self) -> AttendanceRepo<'_> {
        AttendanceRepo::new(&self.conn)
    }

    pub fn payments(&self) -> PaymentRepo<'_> {
        PaymentRepo::new(&self.conn)
    }
}

fn create_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS Members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            date_of_birth DATE,
            phone_number TEXT UNIQUE,
            gender TEXT,
            address TEXT,
            member_status TEXT,
            join_date DATE NOT NULL,
            membership_type TEXT,
            membership_start_date DATE,
            membership_end_date DATE,
            emergency_name TEXT,
            emergency_number TEXT
        );
        CREATE TABLE IF NOT EXISTS Attendance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL,
            date DATE NOT NULL,
            check_in_time DATETIME NOT NULL,
            FOREIGN KEY (member_id) REFERENCES Members(id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS Payment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL,
            payment_date DATE NOT NULL,
            amount REAL NOT NULL,
            payment_method TEXT NOT NULL,
            FOREIGN KEY (member_id) REFERENCES Members(id) ON DELETE CASCADE
        );",
    )?;
    tracing::debug!("schema checked/created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{MemberStatus, NewMember};

    fn sample_member(name: &str, phone: &str) -> NewMember {
        NewMember {
            full_name: name.to_string(),
            date_of_birth: Some("2000-01-01".to_string()),
            phone_number: Some(phone.to_string()),
            gender: Some("Other".to_string()),
            address: Some("123 Main St".to_string()),
            status: MemberStatus::Rookie,
            join_date: "2024-01-01".to_string(),
            membership_type: Some("Monthly".to_string()),
            membership_start_date: Some("2024-01-01".to_string()),
            membership_end_date: Some("2024-02-01".to_string()),
            emergency_name: Some("Emergency Contact".to_string()),
            emergency_number: Some("0987654321".to_string()),
        }
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().join("gym.db")).unwrap();
        assert!(storage.members().all().unwrap().is_empty());
    }

    #[test]
    fn test_hard_delete_cascades() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage.members().insert(&sample_member("Test User", "1234567890")).unwrap();
        storage.attendance().insert(id, "27-10-2025", "03:00:00 PM").unwrap();
        storage.payments().insert(id, "27-10-2025", 500.0, "Cash").unwrap();

        storage.members().delete(id).unwrap();

        assert!(storage.members().get(id).unwrap().is_none());
        assert!(storage.attendance().for_member(id).unwrap().is_empty());
        assert!(storage.payments().for_member(id).unwrap().is_empty());
    }

    #[test]
    fn test_soft_delete_keeps_dependent_rows() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage.members().insert(&sample_member("Test User", "1234567890")).unwrap();
        storage.attendance().insert(id, "27-10-2025", "03:00:00 PM").unwrap();
        storage.payments().insert(id, "27-10-2025", 500.0, "Cash").unwrap();

        storage.members().close(id).unwrap();

        let member = storage.members().get(id).unwrap().unwrap();
        assert_eq!(member.status, MemberStatus::Closed);
        assert_eq!(storage.attendance().for_member(id).unwrap().len(), 1);
        assert_eq!(storage.payments().for_member(id).unwrap().len(), 1);
    }

    #[test]
    fn test_attendance_requires_existing_member() {
        let storage = Storage::open_in_memory().unwrap();
        let result = storage.attendance().insert(999, "27-10-2025", "03:00:00 PM");
        assert!(result.is_err(), "FK violation must surface as an error");
    }

    #[test]
    fn test_duplicate_phone_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        storage.members().insert(&sample_member("A", "1112223334")).unwrap();
        assert!(storage.members().insert(&sample_member("B", "1112223334")).is_err());
    }
}
