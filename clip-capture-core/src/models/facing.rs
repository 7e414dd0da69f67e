use serde::{Deserialize, Serialize};

/// Which physical camera supplies the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// User-facing camera.
    #[default]
    Front,
    /// World-facing camera.
    Back,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(Self::Front),
            "back" | "environment" => Ok(Self::Back),
            other => Err(format!("unknown camera facing: {other}")),
        }
    }
}

/// Audio processing flags requested alongside the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioProcessing {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioProcessing {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Parameters passed to `MediaDeviceProvider::acquire`.
///
/// Resolution values are preferences; providers pick the closest mode
/// the hardware offers.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub aspect_ratio: f64,
    pub audio: AudioProcessing,
}

impl StreamRequest {
    /// Portrait 9:16 request at the given ideal resolution.
    pub fn portrait(facing: Facing, ideal_width: u32, ideal_height: u32) -> Self {
        Self {
            facing,
            ideal_width,
            ideal_height,
            aspect_ratio: 9.0 / 16.0,
            audio: AudioProcessing::default(),
        }
    }
}
