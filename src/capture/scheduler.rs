/// Timer-driven capture loop
///
/// A capture run is a single repeating timer bounded by a wall-clock
/// window: each tick checks the end time, samples one frame, appends
/// it to the session record, and saves. The run ends when the window
/// closes or when the user stops it early.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::capture::camera::Camera;
use crate::capture::frame;
use crate::session::data::Photo;
use crate::session::store::SessionStore;

/// Errors that block a capture run from starting
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("End time must be after start time")]
    EndBeforeStart,
    #[error("Capture interval must be positive")]
    ZeroInterval,
    #[error("Session name cannot be empty")]
    EmptyName,
}

/// Lifecycle of one capture run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run started yet
    Idle,
    /// The timer is ticking
    Running,
    /// The end time was reached
    Completed,
    /// The run was cancelled early
    Stopped,
}

/// What a single timer tick should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Capture one frame; the run has this much time left
    Capture { remaining: Duration },
    /// The end time has been reached or passed; finish without capturing
    Complete,
}

/// A capture window: wall-clock start/end plus the tick period.
///
/// The start time gates validation only; ticking begins the moment the
/// run is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSchedule {
    /// Window start, Unix milliseconds
    pub start_ms: i64,
    /// Window end, Unix milliseconds
    pub end_ms: i64,
    /// Fixed tick period
    pub interval: Duration,
}

impl CaptureSchedule {
    pub fn new(start_ms: i64, end_ms: i64, interval: Duration) -> Self {
        Self {
            start_ms,
            end_ms,
            interval,
        }
    }

    /// Check the window before a run may start: the end must be
    /// strictly after the start and the tick period must be positive
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_ms >= self.end_ms {
            return Err(ScheduleError::EndBeforeStart);
        }
        if self.interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(())
    }

    /// Decide what a tick at `now_ms` does. Pure: no clock reads, no
    /// stored state.
    pub fn tick(&self, now_ms: i64) -> TickOutcome {
        if now_ms >= self.end_ms {
            TickOutcome::Complete
        } else {
            TickOutcome::Capture {
                remaining: self.remaining(now_ms),
            }
        }
    }

    /// Time left until the end of the window (zero once passed)
    pub fn remaining(&self, now_ms: i64) -> Duration {
        Duration::from_millis(self.end_ms.saturating_sub(now_ms).max(0) as u64)
    }
}

/// Result of a finished capture run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Completed (end time reached) or Stopped (cancelled early)
    pub state: RunState,
    /// Photos appended over the run
    pub photos_taken: u64,
}

/// Handle to a running capture loop.
///
/// Dropping the handle does not stop the run; use `stop` to cancel
/// early or `wait` to let it reach the end time.
#[derive(Debug)]
pub struct CaptureHandle {
    state: Arc<Mutex<RunState>>,
    stop: Arc<Notify>,
    task: JoinHandle<CaptureSummary>,
}

impl CaptureHandle {
    /// Current run state
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap()
    }

    /// Signal that requests an early stop (for ctrl-c wiring)
    pub fn stop_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.stop)
    }

    /// Let the run finish naturally and return its summary
    pub async fn wait(self) -> CaptureSummary {
        self.task.await.expect("capture task panicked")
    }

    /// Cancel the run. An in-flight tick finishes first; once this
    /// returns, no further photos are appended.
    pub async fn stop(self) -> CaptureSummary {
        self.stop.notify_one();
        self.task.await.expect("capture task panicked")
    }
}

/// Validate and start a capture run against the given store and camera.
///
/// The timer fires immediately and then once per interval. Ticks that
/// cannot capture (no frame, no session record, storage failure) are
/// skipped and the loop keeps going; delayed ticks are never replayed.
pub fn start_capture<C>(
    schedule: CaptureSchedule,
    session_name: &str,
    store: SessionStore,
    camera: C,
) -> Result<CaptureHandle, ScheduleError>
where
    C: Camera + Send + 'static,
{
    if session_name.trim().is_empty() {
        return Err(ScheduleError::EmptyName);
    }
    schedule.validate()?;

    let state = Arc::new(Mutex::new(RunState::Running));
    let stop = Arc::new(Notify::new());

    let task = tokio::spawn(run_capture_loop(
        schedule,
        session_name.to_string(),
        store,
        camera,
        Arc::clone(&state),
        Arc::clone(&stop),
    ));

    Ok(CaptureHandle { state, stop, task })
}

async fn run_capture_loop<C>(
    schedule: CaptureSchedule,
    session_name: String,
    store: SessionStore,
    mut camera: C,
    state: Arc<Mutex<RunState>>,
    stop: Arc<Notify>,
) -> CaptureSummary
where
    C: Camera + Send + 'static,
{
    // Wall-clock anchor taken once at loop start; ticks pace against
    // the monotonic clock from here on
    let anchor_ms = Utc::now().timestamp_millis();
    let started = tokio::time::Instant::now();

    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut photos_taken: u64 = 0;

    let final_state = loop {
        tokio::select! {
            biased;

            _ = stop.notified() => {
                println!("🛑 Capture stopped early for session '{}'", session_name);
                break RunState::Stopped;
            }

            _ = ticker.tick() => {
                let now_ms = anchor_ms + started.elapsed().as_millis() as i64;

                match schedule.tick(now_ms) {
                    TickOutcome::Complete => {
                        println!(
                            "✅ Photo-taking process complete! {} photos in session '{}'",
                            photos_taken, session_name
                        );
                        break RunState::Completed;
                    }
                    TickOutcome::Capture { remaining } => {
                        println!(
                            "⏳ {}s remaining in session '{}'",
                            remaining.as_secs(),
                            session_name
                        );
                        if capture_tick(&store, &mut camera, &session_name, now_ms) {
                            photos_taken += 1;
                        }
                    }
                }
            }
        }
    };

    *state.lock().unwrap() = final_state;

    CaptureSummary {
        state: final_state,
        photos_taken,
    }
}

/// One capture attempt: grab a frame, encode it, append it to the
/// session record, save. Any failure skips the tick and the loop
/// continues un-retried.
fn capture_tick<C: Camera>(
    store: &SessionStore,
    camera: &mut C,
    session_name: &str,
    now_ms: i64,
) -> bool {
    let frame = match camera.grab_frame() {
        Some(frame) => frame,
        None => {
            eprintln!("⚠️  No frame available from '{}', skipping tick", camera.label());
            return false;
        }
    };

    let image_data = match frame::encode_data_uri(&frame) {
        Some(image_data) => image_data,
        None => {
            eprintln!("⚠️  Failed to encode frame, skipping tick");
            return false;
        }
    };

    let mut session = match store.get_session(session_name) {
        Ok(Some(session)) => session,
        Ok(None) => {
            eprintln!("⚠️  No active session '{}', skipping tick", session_name);
            return false;
        }
        Err(err) => {
            eprintln!("⚠️  Failed to load session '{}': {}", session_name, err);
            return false;
        }
    };

    session.push_photo(Photo {
        timestamp: now_ms,
        image_data,
    });

    match store.save_session(&session) {
        Ok(()) => {
            println!(
                "📸 Photo {} saved to session '{}'",
                session.photos.len(),
                session_name
            );
            true
        }
        Err(err) => {
            eprintln!("⚠️  Failed to save photo to '{}': {}", session_name, err);
            false
        }
    }
}
