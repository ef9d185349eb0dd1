//! Member repository.

use crate::db::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};

/// Membership payment status. String forms are stored verbatim in the
/// `member_status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Rookie,
    Paid,
    Unpaid,
    Closed,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Rookie => "ROOKIE",
            MemberStatus::Paid => "PAID",
            MemberStatus::Unpaid => "UNPAID",
            MemberStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ROOKIE" => Some(MemberStatus::Rookie),
            "PAID" => Some(MemberStatus::Paid),
            "UNPAID" => Some(MemberStatus::Unpaid),
            "Closed" => Some(MemberStatus::Closed),
            _ => None,
        }
    }

    /// True for statuses that owe a payment reminder.
    pub fn owes_payment(&self) -> bool {
        matches!(self, MemberStatus::Unpaid | MemberStatus::Rookie)
    }
}

/// A gym member row. Owned by the storage layer; the recognition and
/// reminder engines only ever reference members by id.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: i64,
    pub full_name: String,
    pub date_of_birth: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub status: MemberStatus,
    pub join_date: String,
    pub membership_type: Option<String>,
    pub membership_start_date: Option<String>,
    pub membership_end_date: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_number: Option<String>,
}

/// Insert payload for a new member (id is assigned by the store).
#[derive(Debug, Clone)]
pub struct NewMember {
    pub full_name: String,
    pub date_of_birth: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub status: MemberStatus,
    pub join_date: String,
    pub membership_type: Option<String>,
    pub membership_start_date: Option<String>,
    pub membership_end_date: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_number: Option<String>,
}

const MEMBER_COLUMNS: &str = "id, full_name, date_of_birth, phone_number, gender, address, \
     member_status, join_date, membership_type, membership_start_date, \
     membership_end_date, emergency_name, emergency_number";

pub struct MemberRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MemberRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, member: &NewMember) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO Members (full_name, date_of_birth, phone_number, gender, address,
                 member_status, join_date, membership_type, membership_start_date,
                 membership_end_date, emergency_name, emergency_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                member.full_name,
                member.date_of_birth,
                member.phone_number,
                member.gender,
                member.address,
                member.status.as_str(),
                member.join_date,
                member.membership_type,
                member.membership_start_date,
                member.membership_end_date,
                member.emergency_name,
                member.emergency_number,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(member_id = id, name = %member.full_name, "member inserted");
        Ok(id)
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MEMBER_COLUMNS} FROM Members WHERE id = ?1"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(member_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Resolve a member from the manual attendance form fields.
    pub fn find_by_details(
        &self,
        full_name: &str,
        date_of_birth: &str,
        phone_number: &str,
    ) -> StoreResult<Option<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM Members
             WHERE full_name = ?1 AND date_of_birth = ?2 AND phone_number = ?3"
        ))?;
        let mut rows = stmt.query(params![full_name, date_of_birth, phone_number])?;
        match rows.next()? {
            Some(row) => Ok(Some(member_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn all(&self) -> StoreResult<Vec<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MEMBER_COLUMNS} FROM Members ORDER BY id"))?;
        let mut rows = stmt.query([])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(member_from_row(row)?);
        }
        Ok(members)
    }

    /// Members eligible for payment reminders (status UNPAID or ROOKIE).
    pub fn with_outstanding_payments(&self) -> StoreResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM Members
             WHERE member_status IN ('UNPAID', 'ROOKIE') ORDER BY id"
        ))?;
        let mut rows = stmt.query([])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(member_from_row(row)?);
        }
        Ok(members)
    }

    pub fn update_status(&self, id: i64, status: MemberStatus) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE Members SET member_status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::MemberNotFound(id));
        }
        tracing::info!(member_id = id, status = status.as_str(), "member status updated");
        Ok(())
    }

    /// Soft delete: set status to Closed, keep all dependent rows.
    pub fn close(&self, id: i64) -> StoreResult<()> {
        self.update_status(id, MemberStatus::Closed)
    }

    /// Hard delete: remove the member; the store cascades the delete to
    /// Attendance and Payment rows.
    pub fn delete(&self, id: i64) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM Members WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(StoreError::MemberNotFound(id));
        }
        tracing::warn!(member_id = id, "member deleted with all related records");
        Ok(())
    }
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    let status_text: String = row.get(6)?;
    let status = MemberStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown member status: {status_text}").into(),
        )
    })?;

    Ok(Member {
        id: row.get(0)?,
        full_name: row.get(1)?,
        date_of_birth: row.get(2)?,
        phone_number: row.get(3)?,
        gender: row.get(4)?,
        address: row.get(5)?,
        status,
        join_date: row.get(7)?,
        membership_type: row.get(8)?,
        membership_start_date: row.get(9)?,
        membership_end_date: row.get(10)?,
        emergency_name: row.get(11)?,
        emergency_number: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Storage;

    fn new_member(name: &str, phone: &str, status: MemberStatus) -> NewMember {
        NewMember {
            full_name: name.to_string(),
            date_of_birth: Some("1985-03-12".to_string()),
            phone_number: Some(phone.to_string()),
            gender: None,
            address: None,
            status,
            join_date: "2024-01-01".to_string(),
            membership_type: None,
            membership_start_date: None,
            membership_end_date: None,
            emergency_name: None,
            emergency_number: None,
        }
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .members()
            .insert(&new_member("Tony Stark", "9674528439", MemberStatus::Paid))
            .unwrap();

        let member = storage.members().get(id).unwrap().unwrap();
        assert_eq!(member.full_name, "Tony Stark");
        assert_eq!(member.status, MemberStatus::Paid);
        assert_eq!(member.phone_number.as_deref(), Some("9674528439"));
    }

    #[test]
    fn test_find_by_details() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .members()
            .insert(&new_member("Tony Stark", "9674528439", MemberStatus::Paid))
            .unwrap();

        let found = storage
            .members()
            .find_by_details("Tony Stark", "1985-03-12", "9674528439")
            .unwrap();
        assert!(found.is_some());

        let missing = storage
            .members()
            .find_by_details("Tony Stark", "1985-03-12", "0000000000")
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_with_outstanding_payments_filters_status() {
        let storage = Storage::open_in_memory().unwrap();
        let repo = storage.members();
        repo.insert(&new_member("A", "1000000001", MemberStatus::Paid)).unwrap();
        let unpaid = repo.insert(&new_member("B", "1000000002", MemberStatus::Unpaid)).unwrap();
        let rookie = repo.insert(&new_member("C", "1000000003", MemberStatus::Rookie)).unwrap();
        repo.insert(&new_member("D", "1000000004", MemberStatus::Closed)).unwrap();

        let owing: Vec<i64> = repo
            .with_outstanding_payments()
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(owing, vec![unpaid, rookie]);
    }

    #[test]
    fn test_update_status_unknown_member() {
        let storage = Storage::open_in_memory().unwrap();
        let err = storage.members().update_status(42, MemberStatus::Paid);
        assert!(matches!(err, Err(StoreError::MemberNotFound(42))));
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            MemberStatus::Rookie,
            MemberStatus::Paid,
            MemberStatus::Unpaid,
            MemberStatus::Closed,
        ] {
            assert_eq!(MemberStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MemberStatus::parse("closed"), None);
    }
}
