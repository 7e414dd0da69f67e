use crate::models::error::DeviceError;
use crate::models::facing::StreamRequest;
use crate::models::stream::MediaStream;

/// Host capability for acquiring camera + microphone streams.
///
/// Implementations own the hardware side; the session only ever holds one
/// stream at a time and always returns it through `release`.
pub trait MediaDeviceProvider: Send + Sync {
    /// Open an audio + video stream for the requested camera.
    ///
    /// May block while the platform asks the user for permission.
    fn acquire(&self, request: &StreamRequest) -> Result<MediaStream, DeviceError>;

    /// Stop every track of `stream` and free the device.
    fn release(&self, stream: MediaStream);
}

impl<T: MediaDeviceProvider + ?Sized> MediaDeviceProvider for std::sync::Arc<T> {
    fn acquire(&self, request: &StreamRequest) -> Result<MediaStream, DeviceError> {
        (**self).acquire(request)
    }

    fn release(&self, stream: MediaStream) {
        (**self).release(stream)
    }
}
