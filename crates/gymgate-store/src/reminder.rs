//! Reminder-debounce state: member id → last-reminder date.
//!
//! Persisted as a JSON document keyed by the member id as a string.
//! Every read path is fail-open: a missing file, a malformed file or an
//! unparsable date must never silently suppress a legitimately due
//! reminder — the worst case is one extra message, never a lost one.

use crate::db::StoreResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Minimum days between two reminders to the same member.
pub const REMINDER_DEBOUNCE_DAYS: i64 = 3;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Per-member reminder record. The name is a display snapshot taken at
/// send time; the id key next to it is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderEntry {
    pub name: String,
    pub last_reminder_date: String,
}

/// Persisted debounce state. Entries exist only for members who have
/// ever received a reminder.
pub struct ReminderStore {
    path: PathBuf,
    state: BTreeMap<String, ReminderEntry>,
}

impl ReminderStore {
    /// Load state from `path`. Absent or malformed files yield empty
    /// state (fail-open, logged).
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(state) => state,
                Err(err) => {
                    tracing::warn!(
                        file = %path.display(),
                        error = %err,
                        "malformed reminder state, starting empty (fail-open)"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(
                    file = %path.display(),
                    error = %err,
                    "cannot read reminder state, starting empty (fail-open)"
                );
                BTreeMap::new()
            }
        };
        Self { path, state }
    }

    /// Persist the whole map. Called once after a full dispatch pass.
    pub fn save(&self) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, text)?;
        tracing::debug!(file = %self.path.display(), entries = self.state.len(), "reminder state saved");
        Ok(())
    }

    pub fn last_reminder_date(&self, member_id: i64) -> Option<&str> {
        self.state
            .get(&member_id.to_string())
            .map(|entry| entry.last_reminder_date.as_str())
    }

    /// True when the member is due a reminder today.
    pub fn is_due(&self, member_id: i64, today: NaiveDate) -> bool {
        should_send(self.last_reminder_date(member_id), today)
    }

    /// Record a successful send. In-memory only; `save` persists.
    pub fn mark_sent(&mut self, member_id: i64, name: &str, today: NaiveDate) {
        self.state.insert(
            member_id.to_string(),
            ReminderEntry {
                name: name.to_string(),
                last_reminder_date: today.format(DATE_FORMAT).to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

/// Debounce predicate. True if there is no previous date, if the
/// previous date is unparsable (fail-open), or if strictly more than
/// `REMINDER_DEBOUNCE_DAYS` days have elapsed.
pub fn should_send(last_reminder_date: Option<&str>, today: NaiveDate) -> bool {
    let Some(raw) = last_reminder_date else {
        return true;
    };
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(last) => (today - last).num_days() > REMINDER_DEBOUNCE_DAYS,
        Err(err) => {
            tracing::warn!(value = raw, error = %err, "unparsable reminder date, sending anyway (fail-open)");
            true
        }
    }
}
