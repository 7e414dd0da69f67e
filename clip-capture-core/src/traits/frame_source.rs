use crate::models::frame::{Dimensions, VideoFrame};

/// Anything that can be sampled for its most recent video frame.
///
/// Camera tracks, compositing surfaces and synthetic test generators all
/// implement this. Sampling is pull-based: consumers call `current_frame`
/// at their own rate, the way a canvas draws from a playing video element.
pub trait FrameSource: Send + Sync {
    /// Frame size, or `None` until the first frame has arrived.
    fn dimensions(&self) -> Option<Dimensions>;

    /// Latest frame, or `None` if nothing has been produced yet.
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Whether the source is still producing frames.
    ///
    /// A source that reports `false` mid-recording aborts the clip.
    fn is_live(&self) -> bool {
        true
    }
}
