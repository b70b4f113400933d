use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand};

use nightflow::capture::camera::{self, CameraAccess, TestPatternCamera};
use nightflow::capture::frame;
use nightflow::capture::scheduler::{start_capture, CaptureSchedule, ScheduleError};
use nightflow::session::data::{default_session_name, PhotoSession};
use nightflow::session::store::SessionStore;

/// Dimensions of frames sampled from the capture source
const FRAME_WIDTH: u32 = 1280;
const FRAME_HEIGHT: u32 = 720;

/// Top-level CLI parser for the `nightflow` binary.
#[derive(Debug, Parser)]
#[command(name = "nightflow", version, about = "Timed photo capture sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start a timed capture run
    Capture {
        /// Session name (defaults to a timestamped name)
        #[arg(long)]
        name: Option<String>,
        /// Window start, local time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        start: String,
        /// Window end, local time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        end: String,
        /// Minutes between captures
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
    /// List stored sessions
    List,
    /// Show the photos of one session
    Show {
        /// Session name
        name: String,
    },
    /// Export a session's photos as JPEG files
    Export {
        /// Session name
        name: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete a session
    Delete {
        /// Session name
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// List available camera devices
    Cameras,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize the catalog
    // If this fails, we exit because the app cannot function without its database
    let store = match cli.db {
        Some(ref path) => SessionStore::open(path.clone()),
        None => SessionStore::new(),
    }
    .expect("Failed to initialize database. Check permissions and disk space.");

    let session_count = store.session_count().unwrap_or(0);
    println!("🌙 Nightflow ready. {} sessions in catalog.", session_count);

    let result = match cli.command {
        Commands::Capture {
            name,
            start,
            end,
            interval,
        } => run_capture(store, name, &start, &end, interval).await,
        Commands::List => list_sessions(&store),
        Commands::Show { name } => show_session(&store, &name),
        Commands::Export { name, out } => export_session(&store, &name, &out),
        Commands::Delete { name, yes } => delete_session(&store, &name, yes),
        Commands::Cameras => list_cameras(),
    };

    if let Err(err) = result {
        eprintln!("❌ {}", err);
        std::process::exit(1);
    }
}

/// Start a capture run: validate the window, create the empty session
/// record, then drive the capture loop until the window ends or the
/// user interrupts.
async fn run_capture(
    store: SessionStore,
    name: Option<String>,
    start: &str,
    end: &str,
    interval_minutes: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let session_name = name.unwrap_or_else(default_session_name);

    let schedule = CaptureSchedule::new(
        parse_datetime_local(start)?,
        parse_datetime_local(end)?,
        Duration::from_secs(interval_minutes * 60),
    );

    // An invalid request must not leave a session record behind
    if session_name.trim().is_empty() {
        return Err(ScheduleError::EmptyName.into());
    }
    schedule.validate()?;

    // A denied camera device blocks the run before anything is written
    let devices = camera::list_devices();
    if let Some(device) = camera::pick_default(&devices) {
        if camera::probe_access(&device.id) == CameraAccess::Denied {
            return Err(format!("Camera permission denied for {}", device.id).into());
        }
    }

    store.save_session(&PhotoSession::new(session_name.clone()))?;
    println!("📁 Session '{}' created", session_name);

    let window_minutes = (schedule.end_ms - schedule.start_ms) / 60_000;
    println!(
        "🌙 Capturing every {} min over a {} min window",
        interval_minutes, window_minutes
    );

    let camera = TestPatternCamera::new(FRAME_WIDTH, FRAME_HEIGHT);
    let handle = start_capture(schedule, &session_name, store, camera)?;

    // ctrl-c requests a cooperative stop; the in-flight tick finishes
    let stop = handle.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!();
            println!("🛑 Stop requested, finishing the current tick...");
            stop.notify_one();
        }
    });

    let summary = handle.wait().await;
    println!(
        "📊 Run finished: {:?}, {} photos taken",
        summary.state, summary.photos_taken
    );

    Ok(())
}

/// Print every stored session with its photo count
fn list_sessions(store: &SessionStore) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = store.get_sessions()?;

    if sessions.is_empty() {
        println!("No capture sessions yet.");
        return Ok(());
    }

    for session in &sessions {
        println!("📁 {} ({} photos)", session.name, session.photos.len());
    }

    Ok(())
}

/// Print the photos of one session: index, capture time, encoded size
fn show_session(store: &SessionStore, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let session = store
        .get_session(name)?
        .ok_or_else(|| format!("Session not found: {}", name))?;

    if session.photos.is_empty() {
        println!("No photos captured in this session yet.");
        return Ok(());
    }

    println!(
        "📁 {} photos in session '{}':",
        session.photos.len(),
        session.name
    );
    for (index, photo) in session.photos.iter().enumerate() {
        let taken = Local
            .timestamp_millis_opt(photo.timestamp)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| photo.timestamp.to_string());

        println!(
            "  {:04}  {}  ({} bytes encoded)",
            index,
            taken,
            photo.image_data.len()
        );
    }

    Ok(())
}

/// Decode a session's photos into JPEG files under `out`
fn export_session(
    store: &SessionStore,
    name: &str,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = store
        .get_session(name)?
        .ok_or_else(|| format!("Session not found: {}", name))?;

    std::fs::create_dir_all(out)?;

    let mut exported = 0;
    for (index, photo) in session.photos.iter().enumerate() {
        match frame::save_photo(photo, out, index) {
            Some(path) => {
                println!("📸 Wrote {}", path.display());
                exported += 1;
            }
            None => eprintln!("⚠️  Could not export photo {} of '{}'", index, name),
        }
    }

    println!(
        "✅ Exported {} of {} photos to {}",
        exported,
        session.photos.len(),
        out.display()
    );

    Ok(())
}

/// Delete a session after confirmation
fn delete_session(
    store: &SessionStore,
    name: &str,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !yes && !confirm(&format!("Are you sure you want to delete the session: {}?", name))? {
        println!("Delete cancelled.");
        return Ok(());
    }

    store.delete_session(name)?;
    println!("🗑️  Session '{}' deleted", name);

    Ok(())
}

/// Enumerate camera devices with their access state
fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let devices = camera::list_devices();

    if devices.is_empty() {
        println!("No camera devices found.");
        return Ok(());
    }

    for device in &devices {
        let access = camera::probe_access(&device.id);
        println!("🎥 {} ({:?})", device.id, access);
    }

    if let Some(default) = camera::pick_default(&devices) {
        println!("Default device: {}", default.id);
    }

    Ok(())
}

/// Ask a yes/no question on stdin; only an explicit "y"/"yes" confirms
fn confirm(question: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;

    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Parse a `datetime-local` string (YYYY-MM-DDTHH:MM, seconds optional)
/// as local time, returning Unix milliseconds
fn parse_datetime_local(s: &str) -> Result<i64, String> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| format!("Invalid date-time '{}', expected YYYY-MM-DDTHH:MM", s))?;

    match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Ok(dt.timestamp_millis()),
        chrono::LocalResult::Ambiguous(dt, _) => Ok(dt.timestamp_millis()),
        chrono::LocalResult::None => Err(format!("Invalid local date-time '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_datetime_local_formats() {
        let ms = parse_datetime_local("2024-06-01T20:30").unwrap();
        assert!(ms > 0);

        let with_seconds = parse_datetime_local("2024-06-01T20:30:00").unwrap();
        assert_eq!(ms, with_seconds);

        assert!(parse_datetime_local("tonight").is_err());
        assert!(parse_datetime_local("2024-06-01 20:30").is_err());
    }

    #[test]
    fn test_capture_parses_with_defaults() {
        let cli = Cli::try_parse_from([
            "nightflow",
            "capture",
            "--start",
            "2024-06-01T20:00",
            "--end",
            "2024-06-02T04:00",
        ])
        .expect("cli should parse");

        match cli.command {
            Commands::Capture { name, interval, .. } => {
                assert!(name.is_none());
                assert_eq!(interval, 10);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_db_flag_is_global() {
        let cli = Cli::try_parse_from(["nightflow", "list", "--db", "/tmp/n.db"])
            .expect("cli should parse");

        assert_eq!(cli.db, Some(PathBuf::from("/tmp/n.db")));
    }
}
