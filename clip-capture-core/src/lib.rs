//! # clip-capture-core
//!
//! Platform-agnostic short-clip video capture core library.
//!
//! Drives a camera through acquisition, recording and finalization while
//! enforcing minimum and maximum clip lengths. Front-camera recordings are
//! mirrored through a compositing loop so the saved clip matches the
//! preview. Platform backends implement `MediaDeviceProvider` and
//! `VideoEncoder` and plug into the generic `VideoCaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! clip-capture-core (this crate)
//! ├── traits/       ← MediaDeviceProvider, VideoEncoder, FrameTransformer, UploadSink, Clock
//! ├── models/       ← CaptureError, CaptureState, SessionConfig, MediaStream, VideoFrame, etc.
//! ├── processing/   ← SoftwareCompositor, Ticker, ChunkCollector, MM:SS formatting
//! └── session/      ← VideoCaptureSession (generic state machine)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::SessionConfig;
pub use models::error::{CaptureError, DeviceError};
pub use models::facing::{AudioProcessing, Facing, StreamRequest};
pub use models::frame::{Dimensions, FrameTransform, PixelFormat, VideoFrame};
pub use models::media_format::{select_format, MediaFormat};
pub use models::recording_result::{ClipBlob, ClipMetadata, RecordingResult};
pub use models::state::{CaptureState, CaptureWarning, SessionDiagnostics, StopOutcome, StopTrigger};
pub use models::stream::{AudioTrack, MediaStream, StreamId};
pub use processing::chunk_collector::ChunkCollector;
pub use processing::compositor::SoftwareCompositor;
pub use processing::ticker::Ticker;
pub use session::capture::{SessionBuilder, VideoCaptureSession};
pub use traits::clock::{Clock, ManualClock, SystemClock};
pub use traits::frame_source::FrameSource;
pub use traits::frame_transformer::{CompositorHandle, FrameTransformer};
pub use traits::media_device::MediaDeviceProvider;
pub use traits::upload_sink::UploadSink;
pub use traits::video_encoder::{EncoderSettings, EncodingJob, RecordingSource, VideoEncoder};
