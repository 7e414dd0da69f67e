use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use crate::traits::video_encoder::VideoEncoder;

/// Container/codec preference order, best first.
pub const DEFAULT_FORMAT_PREFERENCES: [&str; 4] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
    "video/mp4",
];

/// A MIME type describing the encoded clip, e.g. `video/webm;codecs=vp9`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaFormat(String);

impl MediaFormat {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self(mime_type.into())
    }

    pub fn mime_type(&self) -> &str {
        &self.0
    }

    /// MIME type without codec parameters (`video/webm`).
    pub fn essence(&self) -> &str {
        self.0.split(';').next().unwrap_or("").trim()
    }

    /// Codec parameter if present (`vp9` for `video/webm;codecs=vp9`).
    pub fn codec(&self) -> Option<&str> {
        self.0
            .split(';')
            .skip(1)
            .filter_map(|param| param.trim().strip_prefix("codecs="))
            .map(|c| c.trim_matches('"'))
            .next()
    }

    /// File extension for the container.
    pub fn extension(&self) -> &str {
        match self.essence() {
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            "video/quicktime" => "mov",
            "video/x-matroska" => "mkv",
            _ => "bin",
        }
    }

    pub fn default_preferences() -> Vec<MediaFormat> {
        DEFAULT_FORMAT_PREFERENCES
            .iter()
            .map(|m| MediaFormat::new(*m))
            .collect()
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pick the first preferred format the encoder supports.
///
/// Fails closed: an environment that supports none of the preferences gets
/// `RecorderUnavailable` instead of a clip nobody can play back.
pub fn select_format<E>(encoder: &E, preferences: &[MediaFormat]) -> Result<MediaFormat, CaptureError>
where
    E: VideoEncoder + ?Sized,
{
    for format in preferences {
        if encoder.is_format_supported(format) {
            log::debug!("Selected recording format {}", format);
            return Ok(format.clone());
        }
        log::trace!("Recording format {} not supported", format);
    }

    let tried: Vec<&str> = preferences.iter().map(|f| f.mime_type()).collect();
    Err(CaptureError::RecorderUnavailable(format!(
        "none of the preferred formats are supported: {}",
        tried.join(", ")
    )))
}
