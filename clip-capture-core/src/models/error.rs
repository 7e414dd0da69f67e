use thiserror::Error;

/// Failure reported by a `MediaDeviceProvider` when a stream cannot be acquired.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("no matching device")]
    NotFound,

    #[error("{0}")]
    Other(String),
}

/// Errors that can occur during clip capture.
///
/// Device and recorder failures are surfaced through `CaptureState::Error`;
/// only `InvalidState` and `ConfigurationFailed` are returned directly to
/// callers of the session API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("no camera found")]
    NoDeviceFound,

    #[error("camera acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("timed out waiting for stream metadata")]
    MetadataTimeout,

    #[error("recorder unavailable: {0}")]
    RecorderUnavailable(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("compositing failed: {0}")]
    CompositingFailed(String),

    #[error("stream lost during recording")]
    StreamLost,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Text suitable for showing to the person holding the camera.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Camera access denied. Please grant camera permissions.".into()
            }
            Self::NoDeviceFound => "No camera found on this device.".into(),
            Self::AcquisitionFailed(_) | Self::MetadataTimeout => {
                "Unable to access camera. Please check permissions.".into()
            }
            Self::RecorderUnavailable(_) => {
                "Video recording is not supported on this device.".into()
            }
            Self::EncodingFailed(_) | Self::CompositingFailed(_) => {
                "Recording failed. Please try again.".into()
            }
            Self::StreamLost => "The camera stopped during recording. Please try again.".into(),
            Self::InvalidState(_) | Self::ConfigurationFailed(_) | Self::Unknown(_) => {
                "Something went wrong. Please try again.".into()
            }
        }
    }

    /// Whether retrying acquisition has a realistic chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NoDeviceFound | Self::RecorderUnavailable(_))
    }
}

impl From<DeviceError> for CaptureError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::PermissionDenied => Self::PermissionDenied,
            DeviceError::NotFound => Self::NoDeviceFound,
            DeviceError::Other(msg) => Self::AcquisitionFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_are_classified() {
        assert_eq!(
            CaptureError::from(DeviceError::PermissionDenied),
            CaptureError::PermissionDenied
        );
        assert_eq!(
            CaptureError::from(DeviceError::NotFound),
            CaptureError::NoDeviceFound
        );
        assert_eq!(
            CaptureError::from(DeviceError::Other("busy".into())),
            CaptureError::AcquisitionFailed("busy".into())
        );
    }

    #[test]
    fn permission_message_mentions_permission() {
        let msg = CaptureError::PermissionDenied.user_message();
        assert!(msg.to_lowercase().contains("permission"));
    }

    #[test]
    fn no_device_is_not_worth_retrying() {
        assert!(!CaptureError::NoDeviceFound.is_retryable());
        assert!(CaptureError::PermissionDenied.is_retryable());
        assert!(CaptureError::CompositingFailed("stalled".into()).is_retryable());
        assert!(!CaptureError::RecorderUnavailable("video/mp4".into()).is_retryable());
    }
}
