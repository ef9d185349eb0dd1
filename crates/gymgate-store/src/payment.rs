//! Payment repository.

use crate::db::StoreResult;
use rusqlite::{params, Connection};

/// One payment row.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: i64,
    pub member_id: i64,
    pub payment_date: String,
    pub amount: f64,
    pub payment_method: String,
}

pub struct PaymentRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> PaymentRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn insert(
        &self,
        member_id: i64,
        payment_date: &str,
        amount: f64,
        payment_method: &str,
    ) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO Payment (member_id, payment_date, amount, payment_method)
             VALUES (?1, ?2, ?3, ?4)",
            params![member_id, payment_date, amount, payment_method],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(member_id, amount, "payment inserted");
        Ok(id)
    }

    pub fn for_member(&self, member_id: i64) -> StoreResult<Vec<PaymentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, payment_date, amount, payment_method FROM Payment
             WHERE member_id = ?1 ORDER BY id",
        )?;
        let mut rows = stmt.query([member_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(PaymentRecord {
                id: row.get(0)?,
                member_id: row.get(1)?,
                payment_date: row.get(2)?,
                amount: row.get(3)?,
                payment_method: row.get(4)?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Storage;
    use crate::member::{MemberStatus, NewMember};

    #[test]
    fn test_insert_and_list_payments() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .members()
            .insert(&NewMember {
                full_name: "A".to_string(),
                date_of_birth: None,
                phone_number: Some("1000000001".to_string()),
                gender: None,
                address: None,
                status: MemberStatus::Unpaid,
                join_date: "2024-01-01".to_string(),
                membership_type: None,
                membership_start_date: None,
                membership_end_date: None,
                emergency_name: None,
                emergency_number: None,
            })
            .unwrap();

        storage.payments().insert(id, "23-08-2026", 500.0, "Cash").unwrap();
        storage.payments().insert(id, "23-09-2026", 550.0, "Online").unwrap();

        let payments = storage.payments().for_member(id).unwrap();
        assert_eq!(payments.len(), 2);
        assert!((payments[0].amount - 500.0).abs() < f64::EPSILON);
        assert_eq!(payments[1].payment_method, "Online");
    }

    #[test]
    fn test_payment_requires_existing_member() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.payments().insert(7, "23-08-2026", 100.0, "Cash").is_err());
    }
}
