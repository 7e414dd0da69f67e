//! Synthetic camera provider.
//!
//! Produces a moving RGBA gradient instead of real sensor data. Each
//! facing has its own resolution and can be held by only one stream at a
//! time, like a physical device.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use clip_capture_core::models::error::DeviceError;
use clip_capture_core::models::facing::{Facing, StreamRequest};
use clip_capture_core::models::frame::{Dimensions, PixelFormat, VideoFrame};
use clip_capture_core::models::stream::{AudioTrack, MediaStream, StreamId};
use clip_capture_core::traits::frame_source::FrameSource;
use clip_capture_core::traits::media_device::MediaDeviceProvider;

/// Default sensor size: a 1/10 scale portrait 1080x1920.
pub const DEFAULT_DIMENSIONS: Dimensions = Dimensions {
    width: 108,
    height: 192,
};

const DEFAULT_FRAME_RATE: u32 = 30;

/// Live video track backed by a generated test pattern.
///
/// The red channel rises left to right and the green channel top to
/// bottom, so a mirrored frame is distinguishable from the original. The
/// blue channel advances with the frame sequence.
#[derive(Debug)]
pub struct PatternSource {
    facing: Facing,
    dimensions: Dimensions,
    started: Instant,
    frame_interval: Duration,
    live: AtomicBool,
    cached: Mutex<Option<VideoFrame>>,
    frames_served: AtomicU64,
}

impl PatternSource {
    pub fn new(facing: Facing, dimensions: Dimensions, frame_rate: u32) -> Self {
        Self {
            facing,
            dimensions,
            started: Instant::now(),
            frame_interval: Duration::from_secs(1) / frame_rate.max(1),
            live: AtomicBool::new(true),
            cached: Mutex::new(None),
            frames_served: AtomicU64::new(0),
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn frames_served(&self) -> u64 {
        self.frames_served.load(Ordering::SeqCst)
    }

    /// Simulate the track ending (device unplugged or stopped).
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    /// Frame for `sequence`, generated independently of wall-clock time.
    pub fn render(&self, sequence: u64) -> VideoFrame {
        let Dimensions { width, height } = self.dimensions;
        let mut data = Vec::with_capacity(self.dimensions.pixel_count() * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[
                    scale(x, width),
                    scale(y, height),
                    (sequence % 256) as u8,
                    255,
                ]);
            }
        }
        // Buffer length matches the dimensions by construction.
        VideoFrame {
            sequence,
            timestamp: self
                .frame_interval
                .saturating_mul(u32::try_from(sequence).unwrap_or(u32::MAX)),
            dimensions: self.dimensions,
            format: PixelFormat::Rgba8,
            data: data.into(),
        }
    }

    fn current_sequence(&self) -> u64 {
        let nanos = self.frame_interval.as_nanos().max(1);
        (self.started.elapsed().as_nanos() / nanos) as u64
    }
}

fn scale(value: u32, extent: u32) -> u8 {
    if extent <= 1 {
        return 0;
    }
    (value as u64 * 255 / (extent as u64 - 1)) as u8
}

impl FrameSource for PatternSource {
    fn dimensions(&self) -> Option<Dimensions> {
        Some(self.dimensions)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.live.load(Ordering::SeqCst) {
            return None;
        }
        let sequence = self.current_sequence();
        let mut cached = self.cached.lock();
        let frame = match cached.as_ref() {
            Some(frame) if frame.sequence == sequence => frame.clone(),
            _ => {
                let frame = self.render(sequence);
                *cached = Some(frame.clone());
                frame
            }
        };
        self.frames_served.fetch_add(1, Ordering::SeqCst);
        Some(frame)
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// In-process camera with a front and a back sensor.
pub struct SyntheticCamera {
    front: Dimensions,
    back: Dimensions,
    frame_rate: u32,
    permission_granted: AtomicBool,
    connected: AtomicBool,
    in_use: Mutex<HashSet<Facing>>,
    active: Mutex<HashMap<StreamId, Arc<PatternSource>>>,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS, DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(front: Dimensions, back: Dimensions) -> Self {
        Self {
            front,
            back,
            frame_rate: DEFAULT_FRAME_RATE,
            permission_granted: AtomicBool::new(true),
            connected: AtomicBool::new(true),
            in_use: Mutex::new(HashSet::new()),
            active: Mutex::new(HashMap::new()),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// Make the next acquisitions fail as if the user blocked camera access.
    pub fn set_permission(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Attach or detach the camera hardware.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Detach the hardware and end every stream currently handed out.
    pub fn unplug(&self) {
        self.set_connected(false);
        for source in self.active.lock().values() {
            source.stop();
        }
        log::info!("Synthetic camera unplugged");
    }

    pub fn active_streams(&self) -> usize {
        self.active.lock().len()
    }

    /// Source behind the live stream for `facing`, if one is held.
    pub fn source_for(&self, facing: Facing) -> Option<Arc<PatternSource>> {
        self.active
            .lock()
            .values()
            .find(|s| s.facing() == facing)
            .cloned()
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }

    fn dimensions_for(&self, facing: Facing) -> Dimensions {
        match facing {
            Facing::Front => self.front,
            Facing::Back => self.back,
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDeviceProvider for SyntheticCamera {
    fn acquire(&self, request: &StreamRequest) -> Result<MediaStream, DeviceError> {
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DeviceError::NotFound);
        }
        if !self.in_use.lock().insert(request.facing) {
            return Err(DeviceError::Other(format!(
                "{} camera is already in use",
                request.facing
            )));
        }

        let dimensions = self.dimensions_for(request.facing);
        let source = Arc::new(PatternSource::new(
            request.facing,
            dimensions,
            self.frame_rate,
        ));
        let id = StreamId::new();
        self.active.lock().insert(id.clone(), Arc::clone(&source));
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        log::debug!(
            "Synthetic {} camera opened at {}x{} (stream {})",
            request.facing,
            dimensions.width,
            dimensions.height,
            id
        );

        let audio = AudioTrack {
            id: format!("{}-mic", id),
            label: "Synthetic Microphone".into(),
        };
        Ok(MediaStream::new(id, request.facing, source, Some(audio)))
    }

    fn release(&self, stream: MediaStream) {
        if let Some(source) = self.active.lock().remove(stream.id()) {
            source.stop();
        } else {
            log::warn!("Release of unknown stream {}", stream.id());
        }
        self.in_use.lock().remove(&stream.facing());
        self.releases.fetch_add(1, Ordering::SeqCst);
        log::debug!("Synthetic {} camera released", stream.facing());
    }
}
