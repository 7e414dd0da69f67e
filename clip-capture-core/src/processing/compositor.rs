use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::frame::{Dimensions, FrameTransform, VideoFrame};
use crate::processing::ticker::Ticker;
use crate::traits::frame_source::FrameSource;
use crate::traits::frame_transformer::{CompositorHandle, FrameTransformer};

/// Off-screen surface the compositing loop draws into.
///
/// Exposed to the encoder as a `FrameSource`; it stops reporting itself
/// live once the loop is cancelled.
#[derive(Debug)]
pub struct CompositedSurface {
    dimensions: Dimensions,
    latest: Mutex<Option<VideoFrame>>,
    active: AtomicBool,
    frames_drawn: AtomicU64,
}

impl CompositedSurface {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            latest: Mutex::new(None),
            active: AtomicBool::new(true),
            frames_drawn: AtomicU64::new(0),
        }
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn.load(Ordering::SeqCst)
    }

    /// Draw the input's current frame through `transform`.
    ///
    /// Returns `false` if the input had nothing to draw yet.
    fn draw(&self, input: &dyn FrameSource, transform: FrameTransform) -> bool {
        let Some(frame) = input.current_frame() else {
            return false;
        };
        if frame.dimensions != self.dimensions {
            log::trace!(
                "Input frame {}x{} differs from surface {}x{}",
                frame.dimensions.width,
                frame.dimensions.height,
                self.dimensions.width,
                self.dimensions.height
            );
        }
        *self.latest.lock() = Some(transform.apply(&frame));
        self.frames_drawn.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl FrameSource for CompositedSurface {
    fn dimensions(&self) -> Option<Dimensions> {
        Some(self.dimensions)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        self.latest.lock().clone()
    }

    fn is_live(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// CPU compositing loop: one named thread per recording redrawing the
/// latest camera frame at the target rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareCompositor;

impl FrameTransformer for SoftwareCompositor {
    fn spawn(
        &self,
        input: Arc<dyn FrameSource>,
        transform: FrameTransform,
        surface: Dimensions,
        frame_rate: u32,
    ) -> Result<Box<dyn CompositorHandle>, CaptureError> {
        if frame_rate == 0 {
            return Err(CaptureError::ConfigurationFailed(
                "compositor frame rate must be positive".into(),
            ));
        }

        let surface = Arc::new(CompositedSurface::new(surface));
        let period = Duration::from_secs_f64(1.0 / frame_rate as f64);

        // First frame is drawn synchronously so the encoder never starts
        // on an empty surface when the camera is already producing.
        surface.draw(input.as_ref(), transform);

        let draw_surface = Arc::clone(&surface);
        let ticker = Ticker::spawn("frame-compositor", period, move || {
            draw_surface.draw(input.as_ref(), transform);
            true
        })?;

        log::debug!("Compositor started: {:?} at {} fps", transform, frame_rate);

        Ok(Box::new(SoftwareCompositorHandle {
            surface,
            ticker: Some(ticker),
        }))
    }
}

struct SoftwareCompositorHandle {
    surface: Arc<CompositedSurface>,
    ticker: Option<Ticker>,
}

impl CompositorHandle for SoftwareCompositorHandle {
    fn output(&self) -> Arc<dyn FrameSource> {
        Arc::clone(&self.surface) as Arc<dyn FrameSource>
    }

    fn is_active(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_active)
    }

    fn cancel(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
            self.surface.deactivate();
            log::debug!(
                "Compositor stopped after {} frames",
                self.surface.frames_drawn()
            );
        }
    }
}

impl Drop for SoftwareCompositorHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
