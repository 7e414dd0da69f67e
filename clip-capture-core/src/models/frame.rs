use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use super::facing::Facing;

/// Pixel dimensions of a video surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Packed pixel layouts understood by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Gray8 => 1,
        }
    }
}

/// One decoded video frame, tightly packed (no row padding).
///
/// Pixel data is reference counted so frames can be handed between the
/// camera, the compositor and the encoder without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub sequence: u64,
    pub timestamp: Duration,
    pub dimensions: Dimensions,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(
        sequence: u64,
        timestamp: Duration,
        dimensions: Dimensions,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let expected = dimensions.pixel_count() * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(CaptureError::EncodingFailed(format!(
                "frame buffer is {} bytes, expected {} for {}x{} {:?}",
                data.len(),
                expected,
                dimensions.width,
                dimensions.height,
                format
            )));
        }
        Ok(Self {
            sequence,
            timestamp,
            dimensions,
            format,
            data: data.into(),
        })
    }

    fn row_len(&self) -> usize {
        self.dimensions.width as usize * self.format.bytes_per_pixel()
    }

    /// Bytes of the pixel at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.row_len() + x as usize * bpp;
        self.data.get(start..start + bpp)
    }

    /// Copy of this frame with every row's pixel columns reversed.
    pub fn mirrored(&self) -> VideoFrame {
        let bpp = self.format.bytes_per_pixel();
        let row_len = self.row_len();
        let mut out = Vec::with_capacity(self.data.len());

        if row_len > 0 {
            for row in self.data.chunks_exact(row_len) {
                for px in row.chunks_exact(bpp).rev() {
                    out.extend_from_slice(px);
                }
            }
        }

        VideoFrame {
            sequence: self.sequence,
            timestamp: self.timestamp,
            dimensions: self.dimensions,
            format: self.format,
            data: out.into(),
        }
    }
}

/// Per-frame transform applied by the compositing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTransform {
    Identity,
    MirrorHorizontal,
}

impl FrameTransform {
    /// Front-camera footage is recorded mirrored so it matches the preview.
    pub fn for_facing(facing: Facing) -> Self {
        match facing {
            Facing::Front => Self::MirrorHorizontal,
            Facing::Back => Self::Identity,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    pub fn apply(&self, frame: &VideoFrame) -> VideoFrame {
        match self {
            Self::Identity => frame.clone(),
            Self::MirrorHorizontal => frame.mirrored(),
        }
    }
}
