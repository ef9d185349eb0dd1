//! gymgate-store — SQLite persistence and reminder-debounce state.
//!
//! One typed repository per entity (Members / Attendance / Payment)
//! replaces dynamic table/field query routing: each repository exposes
//! only the operations and columns its entity legitimately supports.
//! The connection is owned by the application root and borrowed by the
//! repositories; no subordinate component ever closes it.

pub mod attendance;
pub mod db;
pub mod member;
pub mod payment;
pub mod reminder;

pub use attendance::{AttendanceRecord, AttendanceRepo, AttendanceWithName};
pub use db::{Storage, StoreError, StoreResult};
pub use member::{Member, MemberRepo, MemberStatus, NewMember};
pub use payment::{PaymentRecord, PaymentRepo};
pub use reminder::{should_send, ReminderEntry, ReminderStore, REMINDER_DEBOUNCE_DAYS};
