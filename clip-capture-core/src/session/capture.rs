use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::config::SessionConfig;
use crate::models::error::CaptureError;
use crate::models::facing::{Facing, StreamRequest};
use crate::models::frame::{Dimensions, FrameTransform};
use crate::models::media_format::select_format;
use crate::models::recording_result::RecordingResult;
use crate::models::state::{
    CaptureState, CaptureWarning, SessionDiagnostics, StopOutcome, StopTrigger,
};
use crate::models::stream::{AudioTrack, MediaStream};
use crate::processing::compositor::SoftwareCompositor;
use crate::processing::ticker::Ticker;
use crate::processing::time_format;
use crate::traits::clock::{Clock, SystemClock};
use crate::traits::frame_source::FrameSource;
use crate::traits::frame_transformer::{CompositorHandle, FrameTransformer};
use crate::traits::media_device::MediaDeviceProvider;
use crate::traits::upload_sink::UploadSink;
use crate::traits::video_encoder::{EncoderSettings, EncodingJob, RecordingSource, VideoEncoder};

const METADATA_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Resources that exist only while a clip is being recorded.
struct ActiveRecording {
    started_at: Instant,
    facing: Facing,
    dimensions: Dimensions,
    mirrored: bool,
    job: Option<Box<dyn EncodingJob>>,
    compositor: Option<Box<dyn CompositorHandle>>,
    timer: Option<Ticker>,
}

struct ActiveWarning {
    warning: CaptureWarning,
    expires_at: Instant,
}

/// Mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    phase: CaptureState,
    facing: Facing,
    stream: Option<MediaStream>,
    dimensions: Option<Dimensions>,
    // Bumped on every (re)acquisition and cancel so late results are discarded.
    generation: u64,
    recording: Option<ActiveRecording>,
    // Set while `start_recording` builds a recording with the lock
    // released; every other mutating operation is refused meanwhile.
    preparing: bool,
    warning: Option<ActiveWarning>,
    diagnostics: SessionDiagnostics,
}

impl SessionState {
    fn new(facing: Facing) -> Self {
        Self {
            phase: CaptureState::Idle,
            facing,
            stream: None,
            dimensions: None,
            generation: 0,
            recording: None,
            preparing: false,
            warning: None,
            diagnostics: SessionDiagnostics::default(),
        }
    }
}

/// Builder for `VideoCaptureSession`.
pub struct SessionBuilder<D, E> {
    devices: D,
    encoder: E,
    config: SessionConfig,
    transformer: Box<dyn FrameTransformer>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn UploadSink>>,
}

impl<D, E> SessionBuilder<D, E>
where
    D: MediaDeviceProvider + 'static,
    E: VideoEncoder + 'static,
{
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn UploadSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the default `SoftwareCompositor`.
    pub fn transformer(mut self, transformer: impl FrameTransformer + 'static) -> Self {
        self.transformer = Box::new(transformer);
        self
    }

    pub fn build(self) -> Result<VideoCaptureSession<D, E>, CaptureError> {
        self.config
            .validate()
            .map_err(CaptureError::ConfigurationFailed)?;

        let facing = self.config.initial_facing;
        Ok(VideoCaptureSession {
            inner: Arc::new(SessionInner {
                devices: self.devices,
                encoder: self.encoder,
                transformer: self.transformer,
                clock: self.clock,
                config: self.config,
                sink: self.sink,
                state: Mutex::new(SessionState::new(facing)),
            }),
        })
    }
}

/// Records one short clip from a live camera.
///
/// Generic over the device and encoder backends. Owns at most one camera
/// stream; while recording it also owns the compositing loop (front
/// camera only), the encoding job and the capture timer, all of which are
/// torn down on every way out of `Recording`.
///
/// ```text
/// [MediaDeviceProvider] → MediaStream ─┬─ back ──────────────────────┐
///                                      └─ front → [FrameTransformer] ─┴→ [VideoEncoder] → [UploadSink]
/// ```
///
/// Device and encoder failures never surface as `Err`: they move the
/// session to `CaptureState::Error`. `Err` is reserved for calls that are
/// not allowed in the current state.
pub struct VideoCaptureSession<D, E>
where
    D: MediaDeviceProvider + 'static,
    E: VideoEncoder + 'static,
{
    inner: Arc<SessionInner<D, E>>,
}

impl<D, E> VideoCaptureSession<D, E>
where
    D: MediaDeviceProvider + 'static,
    E: VideoEncoder + 'static,
{
    pub fn builder(devices: D, encoder: E) -> SessionBuilder<D, E> {
        SessionBuilder {
            devices,
            encoder,
            config: SessionConfig::default(),
            transformer: Box::new(SoftwareCompositor),
            clock: Arc::new(SystemClock),
            sink: None,
        }
    }

    /// Open the configured initial camera. Transitions: idle → acquiring → ready/error.
    pub fn open(&self) -> Result<CaptureState, CaptureError> {
        self.inner.start_camera(self.inner.config.initial_facing)
    }

    /// Release any held stream and acquire `facing`.
    /// Transitions: * → acquiring → ready/error.
    pub fn start_camera(&self, facing: Facing) -> Result<CaptureState, CaptureError> {
        self.inner.start_camera(facing)
    }

    /// Toggle front/back. No-op while recording.
    pub fn switch_camera(&self) -> Result<CaptureState, CaptureError> {
        self.inner.switch_camera()
    }

    /// Re-acquire after a device failure. Transitions: error → acquiring.
    pub fn retry(&self) -> Result<CaptureState, CaptureError> {
        self.inner.retry()
    }

    /// Transitions: ready → recording.
    pub fn start_recording(&self) -> Result<CaptureState, CaptureError> {
        self.inner.start_recording()
    }

    /// Transitions: recording → finalizing → completed/ready/error.
    pub fn stop_recording(&self) -> Result<StopOutcome, CaptureError> {
        self.inner.finish_recording(StopTrigger::Manual)
    }

    /// Close the recorder without a clip. Refused while recording.
    pub fn cancel(&self) -> Result<(), CaptureError> {
        self.inner.cancel()
    }

    pub fn state(&self) -> CaptureState {
        self.inner.state.lock().phase.clone()
    }

    pub fn facing(&self) -> Facing {
        self.inner.state.lock().facing
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Size of the live camera feed, once known.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.inner.state.lock().dimensions
    }

    pub fn has_stream(&self) -> bool {
        self.inner.state.lock().stream.is_some()
    }

    /// Whole seconds recorded so far (0 when not recording).
    pub fn elapsed_secs(&self) -> u64 {
        match self.inner.state.lock().phase {
            CaptureState::Recording { elapsed_secs } => elapsed_secs,
            _ => 0,
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        time_format::remaining_secs(self.elapsed_secs(), self.inner.config.max_duration_secs)
    }

    /// The too-short warning, while it is still due to be shown.
    pub fn active_warning(&self) -> Option<CaptureWarning> {
        let now = self.inner.clock.now();
        let s = self.inner.state.lock();
        s.warning
            .as_ref()
            .filter(|w| now < w.expires_at)
            .map(|w| w.warning)
    }

    /// User-facing text for the current error, if any.
    pub fn error_message(&self) -> Option<String> {
        self.state().error().map(CaptureError::user_message)
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.inner.state.lock().diagnostics.clone()
    }
}

impl<D, E> Drop for VideoCaptureSession<D, E>
where
    D: MediaDeviceProvider + 'static,
    E: VideoEncoder + 'static,
{
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

struct SessionInner<D, E> {
    devices: D,
    encoder: E,
    transformer: Box<dyn FrameTransformer>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    sink: Option<Arc<dyn UploadSink>>,
    state: Mutex<SessionState>,
}

impl<D, E> SessionInner<D, E>
where
    D: MediaDeviceProvider + 'static,
    E: VideoEncoder + 'static,
{
    fn start_camera(&self, facing: Facing) -> Result<CaptureState, CaptureError> {
        let (previous, generation) = {
            let mut s = self.state.lock();
            if s.phase.is_busy() || s.preparing {
                return Err(CaptureError::InvalidState(
                    "cannot change camera while recording".into(),
                ));
            }
            if s.phase.is_terminal() {
                return Err(CaptureError::InvalidState("session already completed".into()));
            }
            s.generation += 1;
            s.facing = facing;
            s.dimensions = None;
            s.warning = None;
            s.phase = CaptureState::Acquiring;
            (s.stream.take(), s.generation)
        };
        self.notify_state(&CaptureState::Acquiring);

        if let Some(stream) = previous {
            self.release_stream(stream);
        }

        log::debug!("Acquiring {} camera", facing);
        let request =
            StreamRequest::portrait(facing, self.config.ideal_width, self.config.ideal_height);
        let acquired = match self.devices.acquire(&request) {
            Ok(stream) => {
                self.state.lock().diagnostics.acquisitions += 1;
                match self.await_metadata(&stream) {
                    Ok(dimensions) => Ok((stream, dimensions)),
                    Err(e) => {
                        self.release_stream(stream);
                        Err(e)
                    }
                }
            }
            Err(e) => Err(CaptureError::from(e)),
        };

        let mut s = self.state.lock();
        if s.generation != generation || !matches!(s.phase, CaptureState::Acquiring) {
            let current = s.phase.clone();
            drop(s);
            log::debug!("Discarding superseded {} camera acquisition", facing);
            if let Ok((stream, _)) = acquired {
                self.release_stream(stream);
            }
            return Ok(current);
        }

        let next = match acquired {
            Ok((stream, dimensions)) => {
                log::info!(
                    "{} camera ready at {}x{}",
                    facing,
                    dimensions.width,
                    dimensions.height
                );
                s.stream = Some(stream);
                s.dimensions = Some(dimensions);
                CaptureState::Ready
            }
            Err(e) => {
                log::warn!("Camera acquisition failed: {}", e);
                CaptureState::Error(e)
            }
        };
        s.phase = next.clone();
        drop(s);

        self.notify_state(&next);
        Ok(next)
    }

    fn switch_camera(&self) -> Result<CaptureState, CaptureError> {
        let next = {
            let s = self.state.lock();
            if s.phase.is_busy() || s.preparing {
                log::debug!("Ignoring camera switch while recording");
                return Ok(s.phase.clone());
            }
            if matches!(s.phase, CaptureState::Acquiring) {
                return Err(CaptureError::InvalidState(
                    "camera acquisition already in progress".into(),
                ));
            }
            s.facing.toggled()
        };
        self.start_camera(next)
    }

    fn retry(&self) -> Result<CaptureState, CaptureError> {
        let facing = {
            let s = self.state.lock();
            if !s.phase.is_error() {
                return Err(CaptureError::InvalidState(format!(
                    "retry is only possible after an error, session is {}",
                    s.phase.name()
                )));
            }
            s.facing
        };
        self.start_camera(facing)
    }

    /// Poll the new stream until its first frame reports a size.
    fn await_metadata(&self, stream: &MediaStream) -> Result<Dimensions, CaptureError> {
        let video = stream.video();
        let deadline = Instant::now() + self.config.metadata_timeout();
        loop {
            if let Some(dims) = video.dimensions().filter(|d| !d.is_empty()) {
                return Ok(dims);
            }
            if Instant::now() >= deadline {
                return Err(CaptureError::MetadataTimeout);
            }
            thread::sleep(METADATA_POLL_INTERVAL);
        }
    }

    fn start_recording(self: &Arc<Self>) -> Result<CaptureState, CaptureError> {
        let (video, audio, dimensions, facing) = {
            let mut s = self.state.lock();
            if s.preparing {
                return Err(CaptureError::InvalidState(
                    "recording is already starting".into(),
                ));
            }
            if !s.phase.is_ready() {
                return Err(CaptureError::InvalidState(format!(
                    "can only start recording when ready, session is {}",
                    s.phase.name()
                )));
            }
            let (video, audio, dimensions) = match (&s.stream, s.dimensions) {
                (Some(stream), Some(dims)) => (stream.video(), stream.audio().cloned(), dims),
                _ => {
                    return Err(CaptureError::InvalidState("no live camera stream".into()));
                }
            };
            s.preparing = true;
            (video, audio, dimensions, s.facing)
        };

        // Host code (transformer, encoder) runs with the lock released.
        let recording = match self.prepare_recording(video, audio, dimensions, facing) {
            Ok(recording) => recording,
            Err(e) => {
                log::error!("Failed to start recording: {}", e);
                let stream = {
                    let mut s = self.state.lock();
                    s.dimensions = None;
                    s.stream.take()
                };
                self.dispose(stream, None);
                let state = CaptureState::Error(e);
                {
                    let mut s = self.state.lock();
                    s.preparing = false;
                    s.phase = state.clone();
                }
                self.notify_state(&state);
                return Ok(state);
            }
        };

        {
            let mut s = self.state.lock();
            s.recording = Some(recording);
            s.warning = None;
            s.diagnostics.recordings_started += 1;
            s.phase = CaptureState::Recording { elapsed_secs: 0 };
        }
        log::info!(
            "Recording started: {} camera, {}-{}s",
            facing,
            self.config.min_duration_secs,
            self.config.max_duration_secs
        );
        let state = CaptureState::Recording { elapsed_secs: 0 };
        self.notify_state(&state);

        // Timer starts after the recording is installed.
        let weak: Weak<Self> = Arc::downgrade(self);
        let timer = Ticker::spawn("capture-timer", self.config.tick_interval(), move || {
            weak.upgrade().is_some_and(|inner| inner.tick())
        });
        match timer {
            Ok(timer) => {
                let orphaned = {
                    let mut s = self.state.lock();
                    s.preparing = false;
                    match s.recording.as_mut() {
                        Some(recording) => {
                            recording.timer = Some(timer);
                            None
                        }
                        // Finished or aborted before the timer was attached.
                        None => Some(timer),
                    }
                };
                if let Some(mut timer) = orphaned {
                    timer.cancel();
                }
                Ok(state)
            }
            Err(e) => {
                self.state.lock().preparing = false;
                self.abort_recording(e);
                Ok(self.state.lock().phase.clone())
            }
        }
    }

    /// Build the compositor and encoder job for a new clip.
    ///
    /// Anything started before a failure is torn down before returning.
    fn prepare_recording(
        &self,
        video: Arc<dyn FrameSource>,
        audio: Option<AudioTrack>,
        dimensions: Dimensions,
        facing: Facing,
    ) -> Result<ActiveRecording, CaptureError> {
        let format = select_format(&self.encoder, &self.config.format_preferences)?;

        let transform = FrameTransform::for_facing(facing);
        let mut compositor = if transform.is_identity() {
            None
        } else {
            Some(self.transformer.spawn(
                Arc::clone(&video),
                transform,
                dimensions,
                self.config.frame_rate,
            )?)
        };

        let source = RecordingSource {
            video: compositor.as_ref().map_or(video, |c| c.output()),
            audio,
            dimensions,
        };
        let settings = EncoderSettings {
            format,
            video_bitrate: self.config.video_bitrate,
            frame_rate: self.config.frame_rate,
        };

        let job = match self.encoder.begin_encoding(source, &settings) {
            Ok(job) => job,
            Err(e) => {
                if let Some(c) = compositor.as_mut() {
                    c.cancel();
                }
                return Err(e);
            }
        };

        Ok(ActiveRecording {
            started_at: self.clock.now(),
            facing,
            dimensions,
            mirrored: !transform.is_identity(),
            job: Some(job),
            compositor,
            timer: None,
        })
    }

    fn elapsed_since(&self, started_at: Instant) -> u64 {
        self.clock
            .now()
            .saturating_duration_since(started_at)
            .as_secs()
    }

    /// One capture-timer tick. Returns `false` once the timer should stop.
    ///
    /// Elapsed time is recomputed from the start instant every tick, so a
    /// delayed or throttled timer never drifts.
    fn tick(&self) -> bool {
        let (elapsed, changed, fault) = {
            let mut s = self.state.lock();
            let previous = match s.phase {
                CaptureState::Recording { elapsed_secs } => elapsed_secs,
                _ => return false,
            };
            let live = s.stream.as_ref().is_some_and(|st| st.video().is_live());
            let Some(recording) = s.recording.as_ref() else {
                return false;
            };
            let elapsed = self.elapsed_since(recording.started_at);
            let fault = if !live {
                Some(CaptureError::StreamLost)
            } else if recording.compositor.as_ref().is_some_and(|c| !c.is_active()) {
                Some(CaptureError::CompositingFailed(
                    "compositing loop stopped".into(),
                ))
            } else {
                recording.job.as_ref().and_then(|job| job.error())
            };
            s.diagnostics.ticks += 1;
            s.phase = CaptureState::Recording {
                elapsed_secs: elapsed,
            };
            (elapsed, elapsed != previous, fault)
        };

        if let Some(e) = fault {
            log::warn!("Recording aborted after {}s: {}", elapsed, e);
            self.abort_recording(e);
            return false;
        }

        if changed {
            self.notify_state(&CaptureState::Recording {
                elapsed_secs: elapsed,
            });
            if let Some(sink) = &self.sink {
                let remaining =
                    time_format::remaining_secs(elapsed, self.config.max_duration_secs);
                sink.on_elapsed(elapsed, remaining);
            }
        }

        if elapsed >= self.config.max_duration_secs {
            log::info!(
                "Maximum duration of {}s reached",
                self.config.max_duration_secs
            );
            if let Err(e) = self.finish_recording(StopTrigger::MaxDuration) {
                log::debug!("Auto-stop skipped: {}", e);
            }
            return false;
        }
        true
    }

    fn finish_recording(&self, trigger: StopTrigger) -> Result<StopOutcome, CaptureError> {
        let mut recording = {
            let mut s = self.state.lock();
            if !s.phase.is_recording() {
                return Err(CaptureError::InvalidState(format!(
                    "can only stop while recording, session is {}",
                    s.phase.name()
                )));
            }
            let Some(recording) = s.recording.take() else {
                return Err(CaptureError::InvalidState("no active recording".into()));
            };
            s.phase = CaptureState::Finalizing;
            if trigger == StopTrigger::MaxDuration {
                s.diagnostics.auto_stops += 1;
            }
            recording
        };
        log::debug!("Finalizing recording ({:?})", trigger);
        self.notify_state(&CaptureState::Finalizing);

        if let Some(mut timer) = recording.timer.take() {
            timer.cancel();
        }
        let payload = match recording.job.take() {
            Some(job) => job.finish_encoding(),
            None => Err(CaptureError::EncodingFailed("no active encoder".into())),
        };
        let duration_secs = self.elapsed_since(recording.started_at);
        if let Some(mut compositor) = recording.compositor.take() {
            compositor.cancel();
        }

        let blob = match payload {
            Ok(blob) if blob.is_empty() => {
                Err(CaptureError::EncodingFailed("recorder produced no data".into()))
            }
            other => other,
        };
        let blob = match blob {
            Ok(blob) => blob,
            Err(e) => {
                log::error!("Recording failed: {}", e);
                self.fail(e.clone());
                return Ok(StopOutcome::Failed(e));
            }
        };

        if duration_secs < self.config.min_duration_secs {
            let warning = CaptureWarning::TooShort {
                duration_secs,
                min_duration_secs: self.config.min_duration_secs,
            };
            {
                let mut s = self.state.lock();
                s.phase = CaptureState::Ready;
                s.warning = Some(ActiveWarning {
                    warning,
                    expires_at: self.clock.now() + self.config.warning_duration(),
                });
                s.diagnostics.clips_discarded += 1;
            }
            log::info!(
                "Discarded {}s clip, minimum is {}s",
                duration_secs,
                self.config.min_duration_secs
            );
            self.notify_state(&CaptureState::Ready);
            if let Some(sink) = &self.sink {
                sink.on_warning(&warning);
            }
            return Ok(StopOutcome::TooShort { duration_secs });
        }

        let result = RecordingResult::new(
            blob,
            duration_secs,
            recording.facing,
            recording.mirrored,
            recording.dimensions,
        );
        log::info!(
            "Recorded {}s clip ({} bytes, {})",
            duration_secs,
            result.blob.len(),
            result.blob.format()
        );

        // Camera is released before completion is published.
        let stream = {
            let mut s = self.state.lock();
            s.dimensions = None;
            s.stream.take()
        };
        self.dispose(stream, None);
        self.state.lock().phase = CaptureState::Completed { duration_secs };

        self.notify_state(&CaptureState::Completed { duration_secs });
        if let Some(sink) = &self.sink {
            sink.on_recorded(&result);
        }
        Ok(StopOutcome::Recorded(result))
    }

    /// Tear down an in-progress recording after a device, compositor or
    /// encoder fault.
    fn abort_recording(&self, error: CaptureError) {
        let (recording, stream) = {
            let mut s = self.state.lock();
            if !s.phase.is_recording() {
                return;
            }
            s.phase = CaptureState::Finalizing;
            s.dimensions = None;
            (s.recording.take(), s.stream.take())
        };
        self.dispose(stream, recording);
        self.enter_error(error);
    }

    /// Release the stream of a recording already taken out of state.
    fn fail(&self, error: CaptureError) {
        let stream = {
            let mut s = self.state.lock();
            s.dimensions = None;
            s.stream.take()
        };
        self.dispose(stream, None);
        self.enter_error(error);
    }

    /// Publish `Error`. Resources must already be released, so a `retry`
    /// issued as soon as the error is visible finds the device free.
    fn enter_error(&self, error: CaptureError) {
        let state = CaptureState::Error(error);
        self.state.lock().phase = state.clone();
        self.notify_state(&state);
    }

    fn cancel(&self) -> Result<(), CaptureError> {
        let (stream, recording) = {
            let mut s = self.state.lock();
            if s.phase.is_busy() || s.preparing {
                return Err(CaptureError::InvalidState(
                    "stop the recording before cancelling".into(),
                ));
            }
            if s.phase.is_terminal() {
                return Err(CaptureError::InvalidState("session already completed".into()));
            }
            s.generation += 1;
            s.phase = CaptureState::Idle;
            s.dimensions = None;
            s.warning = None;
            (s.stream.take(), s.recording.take())
        };
        log::debug!("Capture session cancelled");
        self.dispose(stream, recording);

        self.notify_state(&CaptureState::Idle);
        if let Some(sink) = &self.sink {
            sink.on_cancelled();
        }
        Ok(())
    }

    /// Release everything without notifying the sink.
    fn shutdown(&self) {
        let (stream, recording) = {
            let mut s = self.state.lock();
            s.generation += 1;
            (s.stream.take(), s.recording.take())
        };
        if stream.is_some() || recording.is_some() {
            log::debug!("Capture session dropped, releasing resources");
        }
        self.dispose(stream, recording);
    }

    /// Stop recording resources and release the stream.
    ///
    /// Must be called without the state lock held: cancelling the timer
    /// joins its thread, which may be waiting for that lock.
    fn dispose(&self, stream: Option<MediaStream>, recording: Option<ActiveRecording>) {
        if let Some(mut recording) = recording {
            if let Some(mut timer) = recording.timer.take() {
                timer.cancel();
            }
            if let Some(job) = recording.job.take() {
                job.abort();
            }
            if let Some(mut compositor) = recording.compositor.take() {
                compositor.cancel();
            }
        }
        if let Some(stream) = stream {
            self.release_stream(stream);
        }
    }

    fn release_stream(&self, stream: MediaStream) {
        log::debug!("Releasing {} camera stream {}", stream.facing(), stream.id());
        self.devices.release(stream);
        self.state.lock().diagnostics.releases += 1;
    }

    fn notify_state(&self, state: &CaptureState) {
        log::trace!("Capture state -> {}", state.name());
        if let Some(sink) = &self.sink {
            sink.on_state_changed(state);
        }
    }
}
