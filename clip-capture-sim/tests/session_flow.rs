use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clip_capture_core::{
    CaptureError, CaptureState, Facing, ManualClock, SessionConfig, StopOutcome,
    VideoCaptureSession,
};
use clip_capture_sim::file_sink::read_metadata;
use clip_capture_sim::{DecodedClip, FileSink, MemoryEncoder, SyntheticCamera};

type SimSession = VideoCaptureSession<Arc<SyntheticCamera>, MemoryEncoder>;

struct Rig {
    camera: Arc<SyntheticCamera>,
    clock: Arc<ManualClock>,
    sink: Arc<FileSink>,
    session: SimSession,
    root: PathBuf,
}

impl Rig {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("clip-flow-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);

        let camera = Arc::new(SyntheticCamera::new());
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(FileSink::new(&root, "user-42").unwrap());
        let config = SessionConfig {
            tick_interval_ms: 5,
            ..Default::default()
        };
        let session = VideoCaptureSession::builder(Arc::clone(&camera), MemoryEncoder::new())
            .config(config)
            .clock(clock.clone())
            .sink(sink.clone())
            .build()
            .unwrap();

        Self {
            camera,
            clock,
            sink,
            session,
            root,
        }
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn front_clip_is_mirrored_and_stored() {
    let rig = Rig::new("front");
    assert_eq!(rig.session.open().unwrap(), CaptureState::Ready);
    let pattern = rig.camera.source_for(Facing::Front).unwrap();

    rig.session.start_recording().unwrap();
    thread::sleep(Duration::from_millis(50));
    rig.clock.advance_secs(20);

    let StopOutcome::Recorded(result) = rig.session.stop_recording().unwrap() else {
        panic!("expected a stored clip");
    };
    assert_eq!(result.duration_secs, 20);
    assert_eq!(result.blob.format().mime_type(), "video/webm;codecs=vp8");
    assert_eq!(
        rig.session.state(),
        CaptureState::Completed { duration_secs: 20 }
    );
    assert_eq!(rig.camera.active_streams(), 0);

    let clip = DecodedClip::parse(result.blob.as_bytes()).unwrap();
    assert_eq!(clip.video_bitrate, 2_500_000);
    assert!(!clip.frames.is_empty());
    for frame in &clip.frames {
        let expected = pattern.render(frame.sequence).mirrored();
        assert_eq!(frame.data, expected.data.to_vec());
    }

    let stored = rig.sink.stored();
    assert_eq!(stored.len(), 1);
    let name = stored[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("video_0_") && name.ends_with(".webm"));
    assert_eq!(std::fs::read(&stored[0]).unwrap(), result.blob.as_bytes());

    let metadata = read_metadata(&stored[0]).unwrap();
    assert_eq!(metadata.duration_secs, 20);
    assert_eq!(metadata.facing, Facing::Front);
    assert!(metadata.mirrored);
    assert_eq!(metadata.checksum, result.blob.checksum());
}

#[test]
fn back_clip_keeps_raw_orientation() {
    let rig = Rig::new("back");
    rig.session.start_camera(Facing::Back).unwrap();
    let pattern = rig.camera.source_for(Facing::Back).unwrap();

    rig.session.start_recording().unwrap();
    rig.clock.advance_secs(30);

    let StopOutcome::Recorded(result) = rig.session.stop_recording().unwrap() else {
        panic!("expected a stored clip");
    };
    assert!(!result.metadata.mirrored);
    let clip = DecodedClip::parse(result.blob.as_bytes()).unwrap();
    let first = &clip.frames[0];
    assert_eq!(first.data, pattern.render(first.sequence).data.to_vec());
}

#[test]
fn short_clip_is_not_uploaded() {
    let rig = Rig::new("short");
    rig.session.open().unwrap();

    rig.session.start_recording().unwrap();
    rig.clock.advance_secs(5);
    assert_eq!(
        rig.session.stop_recording().unwrap(),
        StopOutcome::TooShort { duration_secs: 5 }
    );

    assert_eq!(rig.session.state(), CaptureState::Ready);
    assert!(rig.sink.stored().is_empty());
    assert_eq!(rig.camera.active_streams(), 1);
    assert!(rig.session.active_warning().is_some());
}

#[test]
fn max_duration_stops_and_uploads_once() {
    let rig = Rig::new("max");
    rig.session.open().unwrap();
    rig.session.start_recording().unwrap();

    rig.clock.advance_secs(60);
    assert!(wait_until(|| rig.session.state().is_terminal()));

    assert_eq!(
        rig.session.state(),
        CaptureState::Completed { duration_secs: 60 }
    );
    assert!(wait_until(|| rig.sink.stored().len() == 1));
    assert!(matches!(
        rig.session.stop_recording(),
        Err(CaptureError::InvalidState(_))
    ));
    assert_eq!(rig.sink.stored().len(), 1);
    assert_eq!(rig.camera.active_streams(), 0);
}

#[test]
fn switching_holds_one_camera_at_a_time() {
    let rig = Rig::new("switch");
    rig.session.open().unwrap();
    rig.session.switch_camera().unwrap();
    rig.session.switch_camera().unwrap();

    assert_eq!(rig.session.facing(), Facing::Front);
    assert_eq!(rig.camera.acquisitions(), 3);
    assert_eq!(rig.camera.releases(), 2);
    assert_eq!(rig.camera.active_streams(), 1);
}

#[test]
fn denied_permission_recovers_on_retry() {
    let rig = Rig::new("permission");
    rig.camera.set_permission(false);

    let state = rig.session.open().unwrap();
    assert_eq!(state, CaptureState::Error(CaptureError::PermissionDenied));
    assert_eq!(
        rig.session.error_message().unwrap(),
        "Camera access denied. Please grant camera permissions."
    );

    rig.camera.set_permission(true);
    assert_eq!(rig.session.retry().unwrap(), CaptureState::Ready);
}

#[test]
fn unplugged_camera_aborts_recording() {
    let rig = Rig::new("unplug");
    rig.session.open().unwrap();
    rig.session.start_recording().unwrap();

    rig.camera.unplug();
    assert!(wait_until(|| rig.session.state().is_error()));
    assert_eq!(
        rig.session.state(),
        CaptureState::Error(CaptureError::StreamLost)
    );
    assert_eq!(rig.camera.active_streams(), 0);
    assert!(rig.sink.stored().is_empty());

    assert_eq!(
        rig.session.retry().unwrap(),
        CaptureState::Error(CaptureError::NoDeviceFound)
    );
}

#[test]
fn cancel_releases_camera_without_upload() {
    let rig = Rig::new("cancel");
    rig.session.open().unwrap();
    rig.session.cancel().unwrap();

    assert_eq!(rig.session.state(), CaptureState::Idle);
    assert_eq!(rig.sink.cancellations(), 1);
    assert_eq!(rig.camera.active_streams(), 0);
}
