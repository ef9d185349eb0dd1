//! Attendance persistence for recognition events.
//!
//! Recognition events are best-effort: a failed insert (most often a
//! member deleted mid-session, tripping the foreign key) is logged and
//! the event dropped. The capture loop must never stall on storage.

use chrono::NaiveDateTime;
use gymgate_store::Storage;

const DATE_FORMAT: &str = "%d-%m-%Y";
const TIME_FORMAT: &str = "%I:%M:%S %p";

pub struct AttendanceRecorder<'a> {
    storage: &'a Storage,
}

impl<'a> AttendanceRecorder<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record a check-in for a recognized member id. Returns whether
    /// the row was written.
    pub fn record(&self, member_id: i64, now: NaiveDateTime) -> bool {
        let date = now.format(DATE_FORMAT).to_string();
        let time = now.format(TIME_FORMAT).to_string();
        match self.storage.attendance().insert(member_id, &date, &time) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(member_id, error = %err, "attendance insert failed, event dropped");
                false
            }
        }
    }

    /// Manual check-in by identity details instead of recognition.
    pub fn record_by_details(
        &self,
        full_name: &str,
        date_of_birth: &str,
        phone_number: &str,
        now: NaiveDateTime,
    ) -> bool {
        let member = match self
            .storage
            .members()
            .find_by_details(full_name, date_of_birth, phone_number)
        {
            Ok(Some(member)) => member,
            Ok(None) => {
                tracing::warn!(full_name, "no member matches the given details");
                return false;
            }
            Err(err) => {
                tracing::warn!(full_name, error = %err, "member lookup failed");
                return false;
            }
        };
        self.record(member.id, now)
    }
}
