//! Payment reminder dispatch pass.
//!
//! One pass walks every member with an outstanding status, applies the
//! per-member debounce, and sends through the notifier with a
//! per-recipient timeout. Outcomes stream over a channel as they
//! happen; debounce state is saved once, at the end of the pass,
//! regardless of individual failures.

use crate::notify::{Notifier, NotifyError};
use chrono::NaiveDate;
use gymgate_store::{Member, ReminderStore};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct ReminderOptions {
    /// Country calling prefix prepended to the stored phone digits.
    pub country_prefix: String,
    /// Upper bound on one recipient's send attempt.
    pub send_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent,
    /// Debounced; a reminder went out recently enough.
    Skipped,
    Failed(NotifyError),
}

/// Per-member result, emitted as soon as it is known.
#[derive(Debug, Clone)]
pub struct ReminderEvent {
    pub member_id: i64,
    pub name: String,
    pub outcome: ReminderOutcome,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReminderReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub fn compose_message(name: &str) -> String {
    format!(
        "Hello {name},\n\nThis is a reminder that you have not paid for your gym \
         membership yet. Please make the payment at your earliest convenience to \
         continue enjoying our services.\n\nThank you!"
    )
}

/// Normalize a stored phone number into a gateway destination: strip
/// everything but digits, then prepend the country prefix.
pub fn format_destination(prefix: &str, phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{prefix}{digits}")
}

/// Run one reminder pass over `members`.
///
/// Only members whose status owes payment are considered. Each outcome
/// is pushed to `events` immediately; the final tally is returned. The
/// debounce state is persisted exactly once, after the last member.
pub async fn run_reminders<N: Notifier>(
    members: Vec<Member>,
    mut state: ReminderStore,
    notifier: N,
    opts: ReminderOptions,
    today: NaiveDate,
    events: mpsc::Sender<ReminderEvent>,
) -> ReminderReport {
    let mut report = ReminderReport::default();

    for member in members.iter().filter(|m| m.status.owes_payment()) {
        let outcome = dispatch_one(member, &mut state, &notifier, &opts, today).await;

        match &outcome {
            ReminderOutcome::Sent => report.sent += 1,
            ReminderOutcome::Skipped => report.skipped += 1,
            ReminderOutcome::Failed(err) => {
                report.failed += 1;
                tracing::warn!(
                    member_id = member.id,
                    name = %member.full_name,
                    error = %err,
                    "reminder not delivered"
                );
            }
        }

        let _ = events
            .send(ReminderEvent {
                member_id: member.id,
                name: member.full_name.clone(),
                outcome,
            })
            .await;
    }

    // Partial progress survives even when later sends failed.
    if let Err(err) = state.save() {
        tracing::error!(error = %err, "failed to persist reminder state");
    }

    tracing::info!(
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        "reminder pass finished"
    );
    report
}

async fn dispatch_one<N: Notifier>(
    member: &Member,
    state: &mut ReminderStore,
    notifier: &N,
    opts: &ReminderOptions,
    today: NaiveDate,
) -> ReminderOutcome {
    if !state.is_due(member.id, today) {
        return ReminderOutcome::Skipped;
    }

    let Some(phone) = member.phone_number.as_deref().filter(|p| !p.is_empty()) else {
        return ReminderOutcome::Failed(NotifyError::InvalidDestination(
            "no phone number on record".to_string(),
        ));
    };

    let destination = format_destination(&opts.country_prefix, phone);
    let body = compose_message(&member.full_name);

    match tokio::time::timeout(opts.send_timeout, notifier.send(&destination, &body)).await {
        Ok(Ok(())) => {
            state.mark_sent(member.id, &member.full_name, today);
            ReminderOutcome::Sent
        }
        Ok(Err(err)) => ReminderOutcome::Failed(err),
        Err(_) => ReminderOutcome::Failed(NotifyError::Connectivity(format!(
            "send timed out after {:?}",
            opts.send_timeout
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gymgate_store::MemberStatus;
    use std::sync::Mutex;

    struct MockNotifier {
        calls: Mutex<Vec<String>>,
        results: Mutex<Vec<Result<(), NotifyError>>>,
        delay: Duration,
    }

    impl MockNotifier {
        fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn scripted(results: Vec<Result<(), NotifyError>>) -> Self {
            Self {
                results: Mutex::new(results),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl Notifier for &MockNotifier {
        async fn send(&self, destination: &str, _body: &str) -> Result<(), NotifyError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.calls.lock().unwrap().push(destination.to_string());
            self.results.lock().unwrap().pop().unwrap_or(Ok(()))
        }
    }

    fn member(id: i64, name: &str, phone: Option<&str>, status: MemberStatus) -> Member {
        Member {
            id,
            full_name: name.to_string(),
            date_of_birth: None,
            phone_number: phone.map(str::to_string),
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

    fn opts() -> ReminderOptions {
        ReminderOptions {
            country_prefix: "+91".to_string(),
            send_timeout: Duration::from_secs(1),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    fn state_in(dir: &tempfile::TempDir) -> ReminderStore {
        ReminderStore::load(dir.path().join("reminders.json"))
    }

    #[test]
    fn test_format_destination_strips_punctuation() {
        assert_eq!(format_destination("+91", "967-452 8439"), "+919674528439");
    }

    #[tokio::test]
    async fn test_sent_then_debounced_on_second_pass() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = MockNotifier::ok();
        let (tx, mut rx) = mpsc::channel(16);

        let members = vec![member(1, "Alice", Some("9674528439"), MemberStatus::Unpaid)];
        let report = run_reminders(
            members.clone(),
            state_in(&dir),
            &notifier,
            opts(),
            today(),
            tx.clone(),
        )
        .await;

        assert_eq!(report, ReminderReport { sent: 1, skipped: 0, failed: 0 });
        assert_eq!(
            notifier.calls.lock().unwrap().as_slice(),
            ["+919674528439"]
        );
        assert_eq!(rx.try_recv().unwrap().outcome, ReminderOutcome::Sent);

        // Second pass reloads the saved state: debounced, no send.
        let report = run_reminders(members, state_in(&dir), &notifier, opts(), today(), tx).await;
        assert_eq!(report, ReminderReport { sent: 0, skipped: 1, failed: 0 });
        assert_eq!(notifier.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_mark_state() {
        let dir = tempfile::tempdir().unwrap();
        let notifier =
            MockNotifier::scripted(vec![Err(NotifyError::Connectivity("refused".into()))]);
        let (tx, mut rx) = mpsc::channel(16);

        let members = vec![member(2, "Bob", Some("9000000001"), MemberStatus::Rookie)];
        let report =
            run_reminders(members.clone(), state_in(&dir), &notifier, opts(), today(), tx.clone())
                .await;
        assert_eq!(report, ReminderReport { sent: 0, skipped: 0, failed: 1 });
        assert!(matches!(
            rx.try_recv().unwrap().outcome,
            ReminderOutcome::Failed(NotifyError::Connectivity(_))
        ));

        // The member is still due next pass.
        let retry = MockNotifier::ok();
        let report = run_reminders(members, state_in(&dir), &retry, opts(), today(), tx).await;
        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn test_paid_and_closed_members_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = MockNotifier::ok();
        let (tx, _rx) = mpsc::channel(16);

        let members = vec![
            member(1, "Paid", Some("9000000001"), MemberStatus::Paid),
            member(2, "Gone", Some("9000000002"), MemberStatus::Closed),
        ];
        let report = run_reminders(members, state_in(&dir), &notifier, opts(), today(), tx).await;

        assert_eq!(report, ReminderReport::default());
        assert!(notifier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_phone_is_invalid_destination() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = MockNotifier::ok();
        let (tx, mut rx) = mpsc::channel(16);

        let members = vec![member(3, "NoPhone", None, MemberStatus::Unpaid)];
        let report = run_reminders(members, state_in(&dir), &notifier, opts(), today(), tx).await;

        assert_eq!(report.failed, 1);
        assert!(matches!(
            rx.try_recv().unwrap().outcome,
            ReminderOutcome::Failed(NotifyError::InvalidDestination(_))
        ));
        assert!(notifier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_send_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = MockNotifier {
            delay: Duration::from_millis(50),
            ..MockNotifier::ok()
        };
        let (tx, mut rx) = mpsc::channel(16);

        let members = vec![member(4, "Slow", Some("9000000004"), MemberStatus::Unpaid)];
        let slow_opts = ReminderOptions {
            send_timeout: Duration::from_millis(10),
            ..opts()
        };
        let report = run_reminders(members, state_in(&dir), &notifier, slow_opts, today(), tx).await;

        assert_eq!(report.failed, 1);
        assert!(matches!(
            rx.try_recv().unwrap().outcome,
            ReminderOutcome::Failed(NotifyError::Connectivity(_))
        ));
        // A timed-out send must not be marked as delivered.
        assert!(state_in(&dir).is_empty());
    }
}
