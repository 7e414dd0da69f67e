//! In-memory fakes for driving `VideoCaptureSession` without hardware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::config::SessionConfig;
use crate::models::error::{CaptureError, DeviceError};
use crate::models::facing::{Facing, StreamRequest};
use crate::models::frame::{Dimensions, FrameTransform, PixelFormat, VideoFrame};
use crate::models::media_format::MediaFormat;
use crate::models::recording_result::{ClipBlob, RecordingResult};
use crate::models::state::{CaptureState, CaptureWarning};
use crate::models::stream::{AudioTrack, MediaStream, StreamId};
use crate::processing::chunk_collector::ChunkCollector;
use crate::traits::frame_source::FrameSource;
use crate::traits::frame_transformer::{CompositorHandle, FrameTransformer};
use crate::traits::media_device::MediaDeviceProvider;
use crate::traits::upload_sink::UploadSink;
use crate::traits::video_encoder::{EncoderSettings, EncodingJob, RecordingSource, VideoEncoder};

pub(crate) const TEST_DIMENSIONS: Dimensions = Dimensions {
    width: 9,
    height: 16,
};

/// Config with fast ticks so background threads react within milliseconds.
pub(crate) fn fast_config() -> SessionConfig {
    SessionConfig {
        tick_interval_ms: 2,
        metadata_timeout_ms: 100,
        ..Default::default()
    }
}

pub(crate) fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// RGBA frame whose red channel is the column index, so mirroring is visible.
pub(crate) fn column_frame(dimensions: Dimensions, facing: Facing) -> VideoFrame {
    let tag = match facing {
        Facing::Front => 1,
        Facing::Back => 2,
    };
    let mut data = Vec::with_capacity(dimensions.pixel_count() * 4);
    for y in 0..dimensions.height {
        for x in 0..dimensions.width {
            data.extend_from_slice(&[x as u8, y as u8, tag, 255]);
        }
    }
    VideoFrame::new(0, Duration::ZERO, dimensions, PixelFormat::Rgba8, data).unwrap()
}

pub(crate) struct TestSource {
    frame: VideoFrame,
    has_metadata: bool,
    live: AtomicBool,
    pub(crate) samples: AtomicU64,
}

impl TestSource {
    pub(crate) fn frame(&self) -> &VideoFrame {
        &self.frame
    }

    pub(crate) fn unplug(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl FrameSource for TestSource {
    fn dimensions(&self) -> Option<Dimensions> {
        self.has_metadata.then_some(self.frame.dimensions)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.has_metadata.then(|| self.frame.clone())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct FakeCamera {
    failures: Mutex<VecDeque<DeviceError>>,
    withhold_metadata: AtomicBool,
    pub(crate) requests: Mutex<Vec<StreamRequest>>,
    pub(crate) sources: Mutex<Vec<Arc<TestSource>>>,
    pub(crate) acquisitions: AtomicU64,
    pub(crate) releases: AtomicU64,
}

impl FakeCamera {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_next(&self, err: DeviceError) {
        self.failures.lock().push_back(err);
    }

    pub(crate) fn withhold_metadata(&self) {
        self.withhold_metadata.store(true, Ordering::SeqCst);
    }

    pub(crate) fn live_streams(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst) - self.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn last_source(&self) -> Arc<TestSource> {
        Arc::clone(self.sources.lock().last().unwrap())
    }

    pub(crate) fn requested_facings(&self) -> Vec<Facing> {
        self.requests.lock().iter().map(|r| r.facing).collect()
    }
}

impl MediaDeviceProvider for FakeCamera {
    fn acquire(&self, request: &StreamRequest) -> Result<MediaStream, DeviceError> {
        self.requests.lock().push(request.clone());
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        // One physical camera: a second stream is refused until release.
        if self.live_streams() > 0 {
            return Err(DeviceError::Other("camera already in use".into()));
        }

        let source = Arc::new(TestSource {
            frame: column_frame(TEST_DIMENSIONS, request.facing),
            has_metadata: !self.withhold_metadata.load(Ordering::SeqCst),
            live: AtomicBool::new(true),
            samples: AtomicU64::new(0),
        });
        self.sources.lock().push(Arc::clone(&source));
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        Ok(MediaStream::new(
            StreamId::new(),
            request.facing,
            source,
            Some(AudioTrack {
                id: "mic-0".into(),
                label: "Test Microphone".into(),
            }),
        ))
    }

    fn release(&self, _stream: MediaStream) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeEncoder {
    supported: Vec<&'static str>,
    fail_finish: AtomicBool,
    empty_output: AtomicBool,
    fault: Arc<Mutex<Option<CaptureError>>>,
    pub(crate) begun: AtomicU64,
    pub(crate) aborted: Arc<AtomicU64>,
    pub(crate) settings: Mutex<Vec<EncoderSettings>>,
    pub(crate) first_frames: Mutex<Vec<VideoFrame>>,
    pub(crate) sources: Mutex<Vec<RecordingSource>>,
}

impl FakeEncoder {
    pub(crate) fn new() -> Arc<Self> {
        Self::supporting(vec!["video/webm;codecs=vp8", "video/webm"])
    }

    pub(crate) fn supporting(supported: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            supported,
            fail_finish: AtomicBool::new(false),
            empty_output: AtomicBool::new(false),
            fault: Arc::new(Mutex::new(None)),
            begun: AtomicU64::new(0),
            aborted: Arc::new(AtomicU64::new(0)),
            settings: Mutex::new(Vec::new()),
            first_frames: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn fail_on_finish(&self) {
        self.fail_finish.store(true, Ordering::SeqCst);
    }

    pub(crate) fn produce_nothing(&self) {
        self.empty_output.store(true, Ordering::SeqCst);
    }

    /// Make every running job report `error` from now on.
    pub(crate) fn fail_while_running(&self, error: CaptureError) {
        *self.fault.lock() = Some(error);
    }
}

impl VideoEncoder for FakeEncoder {
    fn is_format_supported(&self, format: &MediaFormat) -> bool {
        self.supported.contains(&format.mime_type())
    }

    fn begin_encoding(
        &self,
        source: RecordingSource,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn EncodingJob>, CaptureError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        self.settings.lock().push(settings.clone());
        self.sources.lock().push(source.clone());

        let mut chunks = ChunkCollector::new();
        if let Some(frame) = source.video.current_frame() {
            chunks.push(frame.data.to_vec());
            self.first_frames.lock().push(frame);
        }

        Ok(Box::new(FakeJob {
            chunks,
            format: settings.format.clone(),
            fail: self.fail_finish.load(Ordering::SeqCst),
            empty: self.empty_output.load(Ordering::SeqCst),
            aborted: Arc::clone(&self.aborted),
            fault: Arc::clone(&self.fault),
        }))
    }
}

struct FakeJob {
    chunks: ChunkCollector,
    format: MediaFormat,
    fail: bool,
    empty: bool,
    aborted: Arc<AtomicU64>,
    fault: Arc<Mutex<Option<CaptureError>>>,
}

impl EncodingJob for FakeJob {
    fn finish_encoding(self: Box<Self>) -> Result<ClipBlob, CaptureError> {
        if self.fail {
            return Err(CaptureError::EncodingFailed("fake encoder failure".into()));
        }
        if self.empty {
            return Ok(ClipBlob::new(Vec::new(), self.format));
        }
        Ok(self.chunks.assemble(self.format))
    }

    fn abort(self: Box<Self>) {
        self.aborted.fetch_add(1, Ordering::SeqCst);
    }

    fn error(&self) -> Option<CaptureError> {
        self.fault.lock().clone()
    }
}

/// Transformer whose loop is dead from the start; output passes the
/// input through.
pub(crate) struct StalledCompositor;

impl FrameTransformer for StalledCompositor {
    fn spawn(
        &self,
        input: Arc<dyn FrameSource>,
        _transform: FrameTransform,
        _surface: Dimensions,
        _frame_rate: u32,
    ) -> Result<Box<dyn CompositorHandle>, CaptureError> {
        Ok(Box::new(StalledHandle { output: input }))
    }
}

struct StalledHandle {
    output: Arc<dyn FrameSource>,
}

impl CompositorHandle for StalledHandle {
    fn output(&self) -> Arc<dyn FrameSource> {
        Arc::clone(&self.output)
    }

    fn is_active(&self) -> bool {
        false
    }

    fn cancel(&mut self) {}
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) recorded: Mutex<Vec<RecordingResult>>,
    pub(crate) cancelled: AtomicU64,
    pub(crate) states: Mutex<Vec<CaptureState>>,
    pub(crate) elapsed: Mutex<Vec<(u64, u64)>>,
    pub(crate) warnings: Mutex<Vec<CaptureWarning>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn recorded_count(&self) -> usize {
        self.recorded.lock().len()
    }
}

impl UploadSink for RecordingSink {
    fn on_recorded(&self, result: &RecordingResult) {
        self.recorded.lock().push(result.clone());
    }

    fn on_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    fn on_state_changed(&self, state: &CaptureState) {
        self.states.lock().push(state.clone());
    }

    fn on_elapsed(&self, elapsed_secs: u64, remaining_secs: u64) {
        self.elapsed.lock().push((elapsed_secs, remaining_secs));
    }

    fn on_warning(&self, warning: &CaptureWarning) {
        self.warnings.lock().push(*warning);
    }
}
