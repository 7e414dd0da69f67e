//! # clip-capture-sim
//!
//! Simulated backend for clip-capture.
//!
//! Provides:
//! - `SyntheticCamera`: `MediaDeviceProvider` producing a moving test pattern
//! - `MemoryEncoder`: `VideoEncoder` storing sampled frames in a length-prefixed container
//! - `FileSink`: `UploadSink` writing clips and JSON sidecars to disk
//!
//! ## Usage
//! ```ignore
//! use clip_capture_core::VideoCaptureSession;
//! use clip_capture_sim::{FileSink, MemoryEncoder, SyntheticCamera};
//!
//! let sink = std::sync::Arc::new(FileSink::new("clips", "user-1")?);
//! let session = VideoCaptureSession::builder(SyntheticCamera::new(), MemoryEncoder::new())
//!     .sink(sink)
//!     .build()?;
//! session.open()?;
//! session.start_recording()?;
//! ```

pub mod file_sink;
pub mod memory_encoder;
pub mod synthetic_camera;

pub use file_sink::{FileSink, SinkError};
pub use memory_encoder::{DecodedClip, MemoryEncoder};
pub use synthetic_camera::{PatternSource, SyntheticCamera};
