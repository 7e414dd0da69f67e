use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use super::facing::Facing;
use super::media_format::MediaFormat;

/// Configuration for a capture session.
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Clips shorter than this are discarded with a warning (default: 15).
    pub min_duration_secs: u64,

    /// Recording auto-stops when elapsed time reaches this (default: 60).
    pub max_duration_secs: u64,

    /// Camera opened by `VideoCaptureSession::open` (default: front).
    pub initial_facing: Facing,

    /// Compositing and encoding frame rate (default: 30).
    pub frame_rate: u32,

    /// Target video bitrate in bits per second (default: 2.5 Mbps).
    pub video_bitrate: u32,

    /// Preferred capture resolution, portrait (default: 1080x1920).
    pub ideal_width: u32,
    pub ideal_height: u32,

    /// Encoding formats in preference order.
    pub format_preferences: Vec<MediaFormat>,

    /// Elapsed-time tick period (default: 1000 ms).
    pub tick_interval_ms: u64,

    /// How long the too-short warning stays visible (default: 3000 ms).
    pub warning_ms: u64,

    /// How long to wait for the first frame after acquisition (default: 5000 ms).
    pub metadata_timeout_ms: u64,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_duration_secs == 0 {
            return Err("max duration must be positive".into());
        }
        if self.min_duration_secs > self.max_duration_secs {
            return Err(format!(
                "min duration {}s exceeds max duration {}s",
                self.min_duration_secs, self.max_duration_secs
            ));
        }
        if self.frame_rate == 0 {
            return Err("frame rate must be positive".into());
        }
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err("ideal resolution must be non-zero".into());
        }
        if self.format_preferences.is_empty() {
            return Err("at least one recording format is required".into());
        }
        if self.tick_interval_ms == 0 || self.metadata_timeout_ms == 0 {
            return Err("tick interval and metadata timeout must be positive".into());
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid config: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn warning_duration(&self) -> Duration {
        Duration::from_millis(self.warning_ms)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: 15,
            max_duration_secs: 60,
            initial_facing: Facing::Front,
            frame_rate: 30,
            video_bitrate: 2_500_000,
            ideal_width: 1080,
            ideal_height: 1920,
            format_preferences: MediaFormat::default_preferences(),
            tick_interval_ms: 1000,
            warning_ms: 3000,
            metadata_timeout_ms: 5000,
        }
    }
}
