use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::frame::{Dimensions, FrameTransform};
use crate::traits::frame_source::FrameSource;

/// Capability that turns an input frame source into a transformed output
/// source at a fixed rate.
///
/// Implemented by:
/// - `SoftwareCompositor` (CPU loop, this crate)
/// - GPU or filter-graph backends supplied by the host
pub trait FrameTransformer: Send + Sync {
    /// Start compositing `input` through `transform` onto a surface of
    /// `surface` size, redrawing `frame_rate` times per second.
    fn spawn(
        &self,
        input: Arc<dyn FrameSource>,
        transform: FrameTransform,
        surface: Dimensions,
        frame_rate: u32,
    ) -> Result<Box<dyn CompositorHandle>, CaptureError>;
}

/// Running compositing loop. The loop is not restartable once cancelled.
pub trait CompositorHandle: Send {
    /// The composited output, suitable as an encoder video source.
    fn output(&self) -> Arc<dyn FrameSource>;

    /// Whether the draw loop is still running.
    fn is_active(&self) -> bool;

    /// Stop drawing. Idempotent; no draws happen after this returns.
    fn cancel(&mut self);
}
