use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use gymgate_core::{EnrollmentIndex, FacePipeline};
use gymgate_hw::Camera;
use gymgate_store::{ReminderStore, Storage};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod config;
mod notify;
mod recorder;
mod reminder;
mod session;

use config::Config;
use notify::HttpNotifier;
use recorder::AttendanceRecorder;
use reminder::{run_reminders, ReminderOptions, ReminderOutcome};
use session::{Session, SessionEvent, SessionOptions, StopReason};

#[derive(Parser)]
#[command(name = "gymgated", about = "Gym attendance recognition and reminder daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recognition session until Ctrl-C
    Attend {
        /// Skip the deferred payment-reminder pass
        #[arg(long)]
        no_reminders: bool,
    },
    /// Run one payment-reminder pass and exit
    Remind,
    /// Record a manual check-in by member details
    Mark {
        #[arg(long)]
        name: String,
        /// Date of birth, as stored (YYYY-MM-DD)
        #[arg(long)]
        dob: String,
        #[arg(long)]
        phone: String,
    },
    /// List available camera devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Attend { no_reminders } => attend(&config, !no_reminders).await,
        Commands::Remind => remind(&config).await,
        Commands::Mark { name, dob, phone } => mark(&config, &name, &dob, &phone),
        Commands::Devices => {
            devices();
            Ok(())
        }
    }
}

/// Run a recognition session, recording attendance for each recognized
/// member, until Ctrl-C or a camera failure.
async fn attend(config: &Config, with_reminders: bool) -> Result<()> {
    let storage =
        Storage::open(&config.db_path).context("failed to open member database")?;

    let mut pipeline = FacePipeline::load(
        &config.detector_model_path(),
        &config.encoder_model_path(),
    )
    .context("failed to load face models")?;

    let index = EnrollmentIndex::rebuild(&config.photo_dir, &mut pipeline);
    tracing::info!(enrolled = index.len(), "enrollment index ready");

    // The reminder pass runs deferred on the runtime while the session
    // occupies this task. Members and debounce state are snapshotted
    // up front; the SQLite connection stays on this task.
    let reminder_task = if with_reminders {
        let members = storage
            .members()
            .with_outstanding_payments()
            .context("failed to query members with outstanding payments")?;
        let state = ReminderStore::load(&config.reminder_state_path);
        let notifier = HttpNotifier::new(config.gateway_url.clone());
        let opts = ReminderOptions {
            country_prefix: config.country_prefix.clone(),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
        };
        let delay = Duration::from_secs(config.reminder_delay_secs);

        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let (tx, mut rx) = mpsc::channel(16);
            let pass = tokio::spawn(run_reminders(
                members,
                state,
                notifier,
                opts,
                Local::now().date_naive(),
                tx,
            ));
            while let Some(event) = rx.recv().await {
                if let ReminderOutcome::Sent = event.outcome {
                    tracing::info!(member_id = event.member_id, name = %event.name, "reminder sent");
                }
            }
            pass.await.ok()
        }))
    } else {
        None
    };

    let mut session = Session::start(
        &config.camera_device,
        index,
        pipeline,
        SessionOptions {
            match_threshold: config.match_threshold,
            recognize_every: config.recognize_every,
            cycle_interval: Duration::from_millis(config.cycle_interval_ms),
            recognition_downscale: config.recognition_downscale,
        },
    )?;

    let recorder = AttendanceRecorder::new(&storage);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("stop requested");
                session.stop();
            }
            event = session.next_event() => match event {
                Some(SessionEvent::Recognized { member_id }) => {
                    if recorder.record(member_id, Local::now().naive_local()) {
                        println!("checked in: member {member_id}");
                    }
                }
                Some(SessionEvent::Preview(frame)) => {
                    tracing::trace!(sequence = frame.sequence, "preview frame");
                }
                Some(SessionEvent::Stopped(reason)) => {
                    match reason {
                        StopReason::Requested => tracing::info!("session stopped"),
                        StopReason::CameraFailed(err) => {
                            tracing::error!(error = %err, "session stopped on camera failure");
                        }
                    }
                    break;
                }
                None => break,
            },
        }
    }

    if let Some(task) = reminder_task {
        if let Ok(Some(report)) = task.await {
            println!(
                "reminders: {} sent, {} skipped, {} failed",
                report.sent, report.skipped, report.failed
            );
        }
    }

    Ok(())
}

/// Run one foreground reminder pass, printing each outcome.
async fn remind(config: &Config) -> Result<()> {
    let storage =
        Storage::open(&config.db_path).context("failed to open member database")?;
    let members = storage
        .members()
        .with_outstanding_payments()
        .context("failed to query members with outstanding payments")?;
    let state = ReminderStore::load(&config.reminder_state_path);
    let notifier = HttpNotifier::new(config.gateway_url.clone());
    let opts = ReminderOptions {
        country_prefix: config.country_prefix.clone(),
        send_timeout: Duration::from_secs(config.send_timeout_secs),
    };

    let (tx, mut rx) = mpsc::channel(16);
    let pass = tokio::spawn(run_reminders(
        members,
        state,
        notifier,
        opts,
        Local::now().date_naive(),
        tx,
    ));

    while let Some(event) = rx.recv().await {
        match event.outcome {
            ReminderOutcome::Sent => println!("sent: {} (#{})", event.name, event.member_id),
            ReminderOutcome::Skipped => {
                println!("skipped (recently reminded): {} (#{})", event.name, event.member_id)
            }
            ReminderOutcome::Failed(err) => {
                println!("failed: {} (#{}): {err}", event.name, event.member_id)
            }
        }
    }

    let report = pass.await.context("reminder pass panicked")?;
    println!(
        "{} sent, {} skipped, {} failed",
        report.sent, report.skipped, report.failed
    );
    Ok(())
}

/// Manual check-in for when recognition is unavailable.
fn mark(config: &Config, name: &str, dob: &str, phone: &str) -> Result<()> {
    let storage =
        Storage::open(&config.db_path).context("failed to open member database")?;
    let recorder = AttendanceRecorder::new(&storage);
    if recorder.record_by_details(name, dob, phone, Local::now().naive_local()) {
        println!("checked in: {name}");
    } else {
        println!("no check-in recorded for {name}");
    }
    Ok(())
}

fn devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("no capture devices found");
        return;
    }
    for dev in devices {
        println!("{}  {} ({})", dev.path, dev.name, dev.driver);
    }
}
