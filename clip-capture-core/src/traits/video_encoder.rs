use std::fmt;
use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::frame::Dimensions;
use crate::models::media_format::MediaFormat;
use crate::models::recording_result::ClipBlob;
use crate::models::stream::AudioTrack;
use crate::traits::frame_source::FrameSource;

/// Video + audio inputs handed to the encoder.
#[derive(Clone)]
pub struct RecordingSource {
    /// Raw camera track (back camera) or the compositor output (front camera).
    pub video: Arc<dyn FrameSource>,
    /// Microphone track, passed through unmodified.
    pub audio: Option<AudioTrack>,
    pub dimensions: Dimensions,
}

impl fmt::Debug for RecordingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSource")
            .field("dimensions", &self.dimensions)
            .field("audio", &self.audio)
            .finish_non_exhaustive()
    }
}

/// Encoder parameters chosen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub format: MediaFormat,
    pub video_bitrate: u32,
    pub frame_rate: u32,
}

/// Platform recorder, modelled as an explicit two-phase operation:
/// `begin_encoding` starts accumulating chunks, `finish_encoding` on the
/// returned job assembles them into a single blob.
pub trait VideoEncoder: Send + Sync {
    /// Whether this platform can encode `format`.
    fn is_format_supported(&self, format: &MediaFormat) -> bool;

    /// Start encoding `source`. Capture begins immediately.
    fn begin_encoding(
        &self,
        source: RecordingSource,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn EncodingJob>, CaptureError>;
}

/// An in-progress encode.
pub trait EncodingJob: Send {
    /// Flush pending data and return the finished clip.
    fn finish_encoding(self: Box<Self>) -> Result<ClipBlob, CaptureError>;

    /// Stop and discard everything captured so far.
    fn abort(self: Box<Self>);

    /// A fault the recorder hit while running, if any. Polled on every
    /// capture-timer tick.
    fn error(&self) -> Option<CaptureError> {
        None
    }
}

impl<T: VideoEncoder + ?Sized> VideoEncoder for Arc<T> {
    fn is_format_supported(&self, format: &MediaFormat) -> bool {
        (**self).is_format_supported(format)
    }

    fn begin_encoding(
        &self,
        source: RecordingSource,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn EncodingJob>, CaptureError> {
        (**self).begin_encoding(source, settings)
    }
}
