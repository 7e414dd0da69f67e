//! In-memory chunked encoder.
//!
//! Samples the recording source at the configured frame rate on a
//! `clip-encoder` thread and stores raw frames in a simple length-prefixed
//! container. Not a real codec: it exists so the full capture flow can run
//! and be inspected without platform media APIs.
//!
//! Container layout (all integers little-endian):
//!
//! ```text
//! header:  "CLIP" | mime_len u32 | mime bytes | bitrate u32 | frame_rate u32
//! frame:   sequence u64 | width u32 | height u32 | data_len u32 | data
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use clip_capture_core::models::error::CaptureError;
use clip_capture_core::models::frame::Dimensions;
use clip_capture_core::models::media_format::MediaFormat;
use clip_capture_core::models::recording_result::ClipBlob;
use clip_capture_core::processing::chunk_collector::ChunkCollector;
use clip_capture_core::processing::ticker::Ticker;
use clip_capture_core::traits::video_encoder::{
    EncoderSettings, EncodingJob, RecordingSource, VideoEncoder,
};

const MAGIC: &[u8; 4] = b"CLIP";

/// Formats a typical browser recorder accepts (no VP9, no MP4).
pub const DEFAULT_SUPPORTED: [&str; 2] = ["video/webm;codecs=vp8", "video/webm"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    #[error("missing CLIP header")]
    BadMagic,
    #[error("container truncated at byte {0}")]
    Truncated(usize),
    #[error("mime type is not valid UTF-8")]
    InvalidMime,
}

/// One frame read back from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub sequence: u64,
    pub dimensions: Dimensions,
    pub data: Vec<u8>,
}

/// Parsed container contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClip {
    pub mime_type: String,
    pub video_bitrate: u32,
    pub frame_rate: u32,
    pub frames: Vec<EncodedFrame>,
}

impl DecodedClip {
    pub fn parse(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut reader = Reader { bytes, pos: 0 };
        if reader.take(4)? != MAGIC {
            return Err(ContainerError::BadMagic);
        }
        let mime_len = reader.u32()? as usize;
        let mime_type = std::str::from_utf8(reader.take(mime_len)?)
            .map_err(|_| ContainerError::InvalidMime)?
            .to_string();
        let video_bitrate = reader.u32()?;
        let frame_rate = reader.u32()?;

        let mut frames = Vec::new();
        while !reader.is_empty() {
            let sequence = reader.u64()?;
            let width = reader.u32()?;
            let height = reader.u32()?;
            let len = reader.u32()? as usize;
            frames.push(EncodedFrame {
                sequence,
                dimensions: Dimensions::new(width, height),
                data: reader.take(len)?.to_vec(),
            });
        }

        Ok(Self {
            mime_type,
            video_bitrate,
            frame_rate,
            frames,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ContainerError> {
        let end = self.pos.checked_add(n).ok_or(ContainerError::Truncated(self.pos))?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ContainerError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, ContainerError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, ContainerError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }
}

fn header_chunk(settings: &EncoderSettings) -> Vec<u8> {
    let mime = settings.format.mime_type().as_bytes();
    let mut chunk = Vec::with_capacity(16 + mime.len());
    chunk.extend_from_slice(MAGIC);
    chunk.extend_from_slice(&(mime.len() as u32).to_le_bytes());
    chunk.extend_from_slice(mime);
    chunk.extend_from_slice(&settings.video_bitrate.to_le_bytes());
    chunk.extend_from_slice(&settings.frame_rate.to_le_bytes());
    chunk
}

fn frame_chunk(sequence: u64, dimensions: Dimensions, data: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(20 + data.len());
    chunk.extend_from_slice(&sequence.to_le_bytes());
    chunk.extend_from_slice(&dimensions.width.to_le_bytes());
    chunk.extend_from_slice(&dimensions.height.to_le_bytes());
    chunk.extend_from_slice(&(data.len() as u32).to_le_bytes());
    chunk.extend_from_slice(data);
    chunk
}

/// Shared between the job handle and its sampling thread.
#[derive(Default)]
struct Track {
    chunks: ChunkCollector,
    last_sequence: Option<u64>,
    fault: Option<CaptureError>,
}

impl Track {
    /// Append the source's current frame unless it was already captured.
    fn sample(&mut self, source: &RecordingSource) -> bool {
        let Some(frame) = source.video.current_frame() else {
            return false;
        };
        if self.last_sequence == Some(frame.sequence) {
            return false;
        }
        self.last_sequence = Some(frame.sequence);
        self.chunks
            .push(frame_chunk(frame.sequence, frame.dimensions, &frame.data));
        true
    }
}

/// `VideoEncoder` that keeps every sampled frame in memory.
pub struct MemoryEncoder {
    supported: Vec<MediaFormat>,
    jobs_started: AtomicU64,
}

impl MemoryEncoder {
    pub fn new() -> Self {
        Self::with_formats(&DEFAULT_SUPPORTED)
    }

    pub fn with_formats(mime_types: &[&str]) -> Self {
        Self {
            supported: mime_types.iter().map(|m| MediaFormat::new(*m)).collect(),
            jobs_started: AtomicU64::new(0),
        }
    }

    pub fn jobs_started(&self) -> u64 {
        self.jobs_started.load(Ordering::SeqCst)
    }
}

impl Default for MemoryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoEncoder for MemoryEncoder {
    fn is_format_supported(&self, format: &MediaFormat) -> bool {
        self.supported.contains(format)
    }

    fn begin_encoding(
        &self,
        source: RecordingSource,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn EncodingJob>, CaptureError> {
        if !self.is_format_supported(&settings.format) {
            return Err(CaptureError::RecorderUnavailable(format!(
                "{} is not supported",
                settings.format
            )));
        }
        if settings.frame_rate == 0 {
            return Err(CaptureError::ConfigurationFailed(
                "encoder frame rate must be positive".into(),
            ));
        }

        let track = Arc::new(Mutex::new(Track::default()));
        {
            let mut t = track.lock();
            t.chunks.push(header_chunk(settings));
            t.sample(&source);
        }

        let period = Duration::from_secs(1) / settings.frame_rate;
        let sampler = Arc::clone(&track);
        let ticker = Ticker::spawn("clip-encoder", period, move || {
            let mut track = sampler.lock();
            if !source.video.is_live() {
                log::warn!("Encoder input ended, sampling stopped");
                track.fault = Some(CaptureError::EncodingFailed(
                    "video input ended".into(),
                ));
                return false;
            }
            track.sample(&source);
            true
        })?;

        self.jobs_started.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Encoding {} at {} bps, {} fps",
            settings.format,
            settings.video_bitrate,
            settings.frame_rate
        );

        Ok(Box::new(MemoryEncodingJob {
            track,
            ticker: Some(ticker),
            format: settings.format.clone(),
        }))
    }
}

struct MemoryEncodingJob {
    track: Arc<Mutex<Track>>,
    ticker: Option<Ticker>,
    format: MediaFormat,
}

impl MemoryEncodingJob {
    fn stop_sampling(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

impl EncodingJob for MemoryEncodingJob {
    fn finish_encoding(mut self: Box<Self>) -> Result<ClipBlob, CaptureError> {
        self.stop_sampling();
        let track = std::mem::take(&mut *self.track.lock());
        // Header only: the source never produced a frame.
        if track.last_sequence.is_none() {
            return Err(CaptureError::EncodingFailed(
                "no frames were captured".into(),
            ));
        }
        let blob = track.chunks.assemble(self.format.clone());
        log::debug!("Encoder produced {} bytes", blob.len());
        Ok(blob)
    }

    fn error(&self) -> Option<CaptureError> {
        self.track.lock().fault.clone()
    }

    fn abort(mut self: Box<Self>) {
        self.stop_sampling();
        let mut track = self.track.lock();
        log::debug!("Encoder aborted, dropping {} chunks", track.chunks.chunk_count());
        track.chunks.clear();
    }
}

impl Drop for MemoryEncodingJob {
    fn drop(&mut self) {
        self.stop_sampling();
    }
}
