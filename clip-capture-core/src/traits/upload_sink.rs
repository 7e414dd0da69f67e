use crate::models::recording_result::RecordingResult;
use crate::models::state::{CaptureState, CaptureWarning};

/// Receiver for finished clips and session notifications.
///
/// Implemented by the feature embedding the recorder; it uploads the blob
/// and records its metadata. Callbacks run on whichever thread drove the
/// transition (the caller's, or the capture timer thread for auto-stop)
/// and never while the session lock is held.
pub trait UploadSink: Send + Sync {
    /// A clip met the minimum duration. Called at most once per session.
    fn on_recorded(&self, result: &RecordingResult);

    /// The user closed the recorder without producing a clip.
    fn on_cancelled(&self);

    fn on_state_changed(&self, _state: &CaptureState) {}

    /// Called once per elapsed second while recording.
    fn on_elapsed(&self, _elapsed_secs: u64, _remaining_secs: u64) {}

    fn on_warning(&self, _warning: &CaptureWarning) {}
}
