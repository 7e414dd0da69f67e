use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use clip_capture_core::models::error::CaptureError;
use clip_capture_core::models::facing::Facing;
use clip_capture_core::models::recording_result::RecordingResult;
use clip_capture_core::models::state::{CaptureState, CaptureWarning, StopOutcome};
use clip_capture_core::processing::time_format::format_clock;
use clip_capture_core::traits::upload_sink::UploadSink;
use clip_capture_core::{SessionConfig, VideoCaptureSession};
use clip_capture_sim::{FileSink, MemoryEncoder, SyntheticCamera};

#[derive(Parser)]
#[command(name = "record-clip")]
#[command(about = "Record a short clip from the synthetic camera")]
#[command(version)]
struct Cli {
    /// Camera to open: front (user) or back (environment)
    #[arg(short, long, default_value = "front")]
    facing: Facing,

    /// Seconds to record before stopping (the session auto-stops at --max)
    #[arg(short, long, default_value = "20")]
    seconds: u64,

    /// Minimum clip length in seconds
    #[arg(long)]
    min: Option<u64>,

    /// Maximum clip length in seconds
    #[arg(long)]
    max: Option<u64>,

    /// Session config as JSON; --min and --max override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory clips are written under
    #[arg(short, long, default_value = "clips")]
    output_dir: PathBuf,

    /// Owner of the recorded clip
    #[arg(short, long, default_value = "local-user")]
    user_id: String,
}

/// Prints the recording HUD and hands clips to the file sink.
struct ConsoleSink {
    files: FileSink,
    max_secs: u64,
}

impl UploadSink for ConsoleSink {
    fn on_recorded(&self, result: &RecordingResult) {
        self.files.on_recorded(result);
    }

    fn on_cancelled(&self) {
        self.files.on_cancelled();
    }

    fn on_state_changed(&self, state: &CaptureState) {
        self.files.on_state_changed(state);
    }

    fn on_elapsed(&self, elapsed_secs: u64, remaining_secs: u64) {
        println!(
            "  ● REC {} / {}  ({}s left)",
            format_clock(elapsed_secs),
            format_clock(self.max_secs),
            remaining_secs
        );
    }

    fn on_warning(&self, warning: &CaptureWarning) {
        println!("  ! {}", warning.message());
    }
}

/// Shown after a failure only when running again could succeed.
fn retry_hint(error: &CaptureError) -> Option<&'static str> {
    error
        .is_retryable()
        .then_some("This may be temporary. Run the command again to retry.")
}

fn load_config(cli: &Cli) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SessionConfig::default(),
    };
    config.initial_facing = cli.facing;
    if let Some(min) = cli.min {
        config.min_duration_secs = min;
    }
    if let Some(max) = cli.max {
        config.max_duration_secs = max;
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let sink = Arc::new(ConsoleSink {
        files: FileSink::new(&cli.output_dir, &cli.user_id)?,
        max_secs: config.max_duration_secs,
    });
    let session = VideoCaptureSession::builder(SyntheticCamera::new(), MemoryEncoder::new())
        .config(config)
        .sink(sink.clone())
        .build()?;

    if let CaptureState::Error(error) = session.open()? {
        let message = session.error_message().unwrap_or_default();
        eprintln!("Camera unavailable: {}", message);
        if let Some(hint) = retry_hint(&error) {
            eprintln!("{}", hint);
        }
        std::process::exit(1);
    }
    println!(
        "{} camera ready, recording {}s (min {}s, max {}s)",
        session.facing(),
        cli.seconds,
        session.config().min_duration_secs,
        session.config().max_duration_secs
    );

    session.start_recording()?;
    let deadline = Instant::now() + Duration::from_secs(cli.seconds);
    while Instant::now() < deadline && session.state().is_recording() {
        thread::sleep(Duration::from_millis(100));
    }

    let outcome = if session.state().is_recording() {
        session.stop_recording()?
    } else {
        match session.state() {
            CaptureState::Completed { duration_secs } => {
                println!("Stopped at the {}s limit", duration_secs);
                return report_stored(&sink.files);
            }
            CaptureState::Error(error) => {
                eprintln!("Recording ended early: {}", error.user_message());
                if let Some(hint) = retry_hint(&error) {
                    eprintln!("{}", hint);
                }
                std::process::exit(1);
            }
            other => {
                eprintln!("Recording ended early: {}", other.name());
                std::process::exit(1);
            }
        }
    };

    match outcome {
        StopOutcome::Recorded(result) => {
            println!("Recorded {} clip", format_clock(result.duration_secs));
            report_stored(&sink.files)
        }
        StopOutcome::TooShort { duration_secs } => {
            println!(
                "Discarded {}s clip; camera still live ({})",
                duration_secs,
                session.state().name()
            );
            session.cancel()?;
            Ok(())
        }
        StopOutcome::Failed(e) => {
            eprintln!("Recording failed: {}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn report_stored(files: &FileSink) -> Result<(), Box<dyn std::error::Error>> {
    for path in files.stored() {
        println!("Saved {}", path.display());
    }
    Ok(())
}
