//! Recognition session engine.
//!
//! A session is one continuous camera run. The capture loop lives on a
//! dedicated worker thread that owns the camera and pushes events over
//! a bounded channel back to the coordinating task; the only
//! cancellation primitive is a stop token checked at the top of every
//! cycle, so cancellation latency is bounded by one cycle interval.
//!
//! State machine: Idle → Starting → Running → Stopping → Idle.
//! `Session::start` is the Starting phase — it opens the device before
//! spawning the worker, so an open failure returns to Idle and the
//! device never reaches Running. A stop request, a frame-read failure
//! and dropping the handle all converge on the same exit path: the
//! worker breaks out of its loop and releases the camera exactly once
//! when its scope ends.
//!
//! Attendance deduplication is scoped to the session, not the calendar
//! day: the recognized-member set is emptied at every session start, so
//! stopping and restarting the loop can record the same member again on
//! the same day.

use gymgate_core::{EnrollmentIndex, FaceAnalyzer, FaceMatcher, NearestMatcher};
use gymgate_hw::{Camera, CameraError, Frame};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no enrolled faces; add member photos before starting recognition")]
    EmptyEnrollment,
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
}

/// Tuning knobs for the capture loop.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
    /// Run recognition on every Kth frame; other frames only feed the
    /// preview, keeping per-cycle latency bounded.
    pub recognize_every: u32,
    /// Sleep between cycles.
    pub cycle_interval: Duration,
    /// Integer downscale factor applied before detection/encoding.
    pub recognition_downscale: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            match_threshold: gymgate_core::DEFAULT_MATCH_THRESHOLD,
            recognize_every: 5,
            cycle_interval: Duration::from_millis(30),
            recognition_downscale: 4,
        }
    }
}

/// Why the capture loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    CameraFailed(String),
}

/// Events pushed from the worker to the coordinating task.
pub enum SessionEvent {
    /// Latest captured frame, sent every cycle regardless of whether
    /// recognition ran. Stale previews are dropped, never blocked on.
    Preview(Frame),
    /// A member was recognized for the first time this session.
    Recognized { member_id: i64 },
    /// The loop has ended; no further events will arrive.
    Stopped(StopReason),
}

/// Handle to a running recognition session.
pub struct Session {
    events: mpsc::Receiver<SessionEvent>,
    stop: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl Session {
    /// Open the camera and spawn the capture worker.
    ///
    /// Fails without spawning anything if the enrollment index is empty
    /// or the device cannot be opened.
    pub fn start<A>(
        device_path: &str,
        index: EnrollmentIndex,
        analyzer: A,
        opts: SessionOptions,
    ) -> Result<Self, SessionError>
    where
        A: FaceAnalyzer + Send + 'static,
    {
        if index.is_empty() {
            return Err(SessionError::EmptyEnrollment);
        }

        let camera = Camera::open(device_path)?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_token = Arc::clone(&stop);

        let worker = std::thread::Builder::new()
            .name("gymgate-session".into())
            .spawn(move || {
                let mut analyzer = analyzer;
                match camera.stream() {
                    Ok(mut stream) => {
                        tracing::info!(device = %camera.device_path, "session running");
                        let mut source = || camera.read_frame(&mut stream);
                        run_loop(&mut source, &mut analyzer, &index, &opts, &stop_token, &tx);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to start capture stream");
                        let _ = tx.blocking_send(SessionEvent::Stopped(StopReason::CameraFailed(
                            err.to_string(),
                        )));
                    }
                }
                // Camera handle is released here, once, on every path.
                tracing::info!("session worker exiting");
            })
            .expect("failed to spawn session worker");

        Ok(Self {
            events: rx,
            stop,
            worker: Some(worker),
        })
    }

    /// Receive the next session event. `None` after the worker is gone.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Request a stop. Takes effect at the top of the next cycle.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// One frame per call. Implemented by the camera read closure in
/// production and by scripted sources in tests.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, CameraError>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Result<Frame, CameraError>,
{
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        self()
    }
}

/// The capture cycle. Runs until the stop token is set or a frame read
/// fails; both paths emit a final `Stopped` event.
fn run_loop(
    source: &mut impl FrameSource,
    analyzer: &mut impl FaceAnalyzer,
    index: &EnrollmentIndex,
    opts: &SessionOptions,
    stop: &AtomicBool,
    events: &mpsc::Sender<SessionEvent>,
) {
    let matcher = NearestMatcher;
    // Emptied exactly once per session start.
    let mut recognized: HashSet<i64> = HashSet::new();
    let mut counter: u64 = 0;
    let stride = opts.recognize_every.max(1) as u64;

    loop {
        if stop.load(Ordering::Relaxed) {
            let _ = events.blocking_send(SessionEvent::Stopped(StopReason::Requested));
            break;
        }

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "frame read failed, stopping session");
                let _ = events.blocking_send(SessionEvent::Stopped(StopReason::CameraFailed(
                    err.to_string(),
                )));
                break;
            }
        };

        counter += 1;

        if counter % stride == 0 {
            let small = frame.downscale(opts.recognition_downscale);
            match analyzer.encodings_in(&small.data, small.width, small.height) {
                Ok(encodings) => {
                    for encoding in &encodings {
                        let Some(hit) =
                            matcher.identify(encoding, index.faces(), opts.match_threshold)
                        else {
                            continue;
                        };
                        if recognized.insert(hit.member_id) {
                            tracing::info!(
                                member_id = hit.member_id,
                                distance = hit.distance,
                                "member recognized"
                            );
                            // Deferred to the coordinating task; the cycle
                            // never blocks on persistence. On a full
                            // channel, un-insert so a later cycle retries.
                            let event = SessionEvent::Recognized { member_id: hit.member_id };
                            if events.try_send(event).is_err() {
                                recognized.remove(&hit.member_id);
                                tracing::warn!(
                                    member_id = hit.member_id,
                                    "event channel full, recognition will be retried"
                                );
                            }
                        }
                    }
                }
                Err(err) => {
                    // Inference errors skip the frame; only device errors
                    // stop the loop.
                    tracing::warn!(error = %err, "face analysis failed for this frame");
                }
            }
        }

        // Preview is updated every cycle, recognition or not.
        let _ = events.try_send(SessionEvent::Preview(frame));

        if !opts.cycle_interval.is_zero() {
            std::thread::sleep(opts.cycle_interval);
        }
    }
}
