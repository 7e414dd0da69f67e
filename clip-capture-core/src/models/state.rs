use super::error::CaptureError;
use super::recording_result::RecordingResult;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → acquiring → ready → recording → finalizing → completed
///          ↑   ↓       ↑ ↓                   │
///          └─ error    │ └→ acquiring         │ (too short)
///                      └──────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Acquiring,
    Ready,
    Recording { elapsed_secs: u64 },
    Finalizing,
    Completed { duration_secs: u64 },
    Error(CaptureError),
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Ready => "ready",
            Self::Recording { .. } => "recording",
            Self::Finalizing => "finalizing",
            Self::Completed { .. } => "completed",
            Self::Error(_) => "error",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Recording in progress or being finalized; camera changes and
    /// cancellation are refused.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Recording { .. } | Self::Finalizing)
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Non-fatal condition shown to the user for a short time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureWarning {
    TooShort {
        duration_secs: u64,
        min_duration_secs: u64,
    },
}

impl CaptureWarning {
    pub fn message(&self) -> String {
        match self {
            Self::TooShort {
                min_duration_secs, ..
            } => format!("Video must be at least {} seconds", min_duration_secs),
        }
    }
}

/// What `stop_recording` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// The clip met the minimum duration and was handed to the sink.
    Recorded(RecordingResult),
    /// The clip was discarded; the session is back in `Ready`.
    TooShort { duration_secs: u64 },
    /// Encoding failed; the session is in `Error`.
    Failed(CaptureError),
}

/// Why a recording left the `Recording` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTrigger {
    Manual,
    MaxDuration,
}

/// Counters for debugging resource handling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDiagnostics {
    pub acquisitions: u64,
    pub releases: u64,
    pub recordings_started: u64,
    pub clips_discarded: u64,
    pub auto_stops: u64,
    pub ticks: u64,
}

impl SessionDiagnostics {
    /// Streams acquired but not yet given back.
    pub fn streams_held(&self) -> u64 {
        self.acquisitions.saturating_sub(self.releases)
    }
}
