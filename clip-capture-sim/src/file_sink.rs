//! Upload sink that stores finished clips on the local filesystem.
//!
//! Clips land in `{root}/{user_id}/video_{order_index}_{timestamp_ms}.{ext}`
//! with a `.metadata.json` sidecar. The order index is the number of clips
//! already stored for the user, so a profile's clips sort in capture order.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use clip_capture_core::models::recording_result::{ClipMetadata, RecordingResult};
use clip_capture_core::models::state::{CaptureState, CaptureWarning};
use clip_capture_core::traits::upload_sink::UploadSink;

const CLIP_PREFIX: &str = "video_";
const METADATA_EXTENSION: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Write clip metadata as a JSON sidecar next to `clip_path`.
pub fn write_metadata(metadata: &ClipMetadata, clip_path: &Path) -> Result<(), SinkError> {
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(clip_path.with_extension(METADATA_EXTENSION), json)?;
    Ok(())
}

pub fn read_metadata(clip_path: &Path) -> Result<ClipMetadata, SinkError> {
    let json = fs::read_to_string(clip_path.with_extension(METADATA_EXTENSION))?;
    Ok(serde_json::from_str(&json)?)
}

pub fn clip_file_name(order_index: u64, timestamp_ms: i64, extension: &str) -> String {
    format!("{}{}_{}.{}", CLIP_PREFIX, order_index, timestamp_ms, extension)
}

/// Stored clips in `dir`, sidecars excluded.
fn existing_clips(dir: &Path) -> Result<u64, SinkError> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(CLIP_PREFIX) && !name.ends_with(METADATA_EXTENSION) {
            count += 1;
        }
    }
    Ok(count)
}

pub struct FileSink {
    dir: PathBuf,
    next_order: AtomicU64,
    stored: Mutex<Vec<PathBuf>>,
    cancellations: AtomicU64,
}

impl FileSink {
    /// Create (or reopen) the clip directory for `user_id` under `root`.
    pub fn new(root: impl AsRef<Path>, user_id: &str) -> Result<Self, SinkError> {
        let dir = root.as_ref().join(user_id);
        fs::create_dir_all(&dir)?;
        let next_order = existing_clips(&dir)?;
        log::debug!("Clip directory {} holds {} clips", dir.display(), next_order);
        Ok(Self {
            dir,
            next_order: AtomicU64::new(next_order),
            stored: Mutex::new(Vec::new()),
            cancellations: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written by this sink, oldest first.
    pub fn stored(&self) -> Vec<PathBuf> {
        self.stored.lock().clone()
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::SeqCst)
    }

    /// Write the clip and its sidecar. Returns the clip path.
    pub fn store(&self, result: &RecordingResult) -> Result<PathBuf, SinkError> {
        let order = self.next_order.fetch_add(1, Ordering::SeqCst);
        let name = clip_file_name(
            order,
            chrono::Utc::now().timestamp_millis(),
            result.blob.format().extension(),
        );
        let path = self.dir.join(name);

        fs::write(&path, result.blob.as_bytes())?;
        write_metadata(&result.metadata, &path)?;

        self.stored.lock().push(path.clone());
        Ok(path)
    }
}

impl UploadSink for FileSink {
    fn on_recorded(&self, result: &RecordingResult) {
        match self.store(result) {
            Ok(path) => log::info!(
                "Stored {}s clip at {} ({} bytes)",
                result.duration_secs,
                path.display(),
                result.blob.len()
            ),
            Err(e) => log::error!("Failed to store clip: {}", e),
        }
    }

    fn on_cancelled(&self) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
        log::info!("Recording cancelled, nothing stored");
    }

    fn on_state_changed(&self, state: &CaptureState) {
        log::debug!("Session state: {}", state.name());
    }

    fn on_warning(&self, warning: &CaptureWarning) {
        log::warn!("{}", warning.message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clip_capture_core::models::facing::Facing;
    use clip_capture_core::models::frame::Dimensions;
    use clip_capture_core::models::media_format::MediaFormat;
    use clip_capture_core::models::recording_result::ClipBlob;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clip-sink-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn result(duration_secs: u64) -> RecordingResult {
        let blob = ClipBlob::new(vec![1, 2, 3, 4], MediaFormat::new("video/webm;codecs=vp8"));
        RecordingResult::new(blob, duration_secs, Facing::Front, true, Dimensions::new(9, 16))
    }

    #[test]
    fn clip_names_follow_order_and_timestamp() {
        assert_eq!(clip_file_name(2, 1_700_000_000_000, "webm"), "video_2_1700000000000.webm");
    }

    #[test]
    fn stores_clip_with_sidecar() {
        let root = temp_root("store");
        let sink = FileSink::new(&root, "user-1").unwrap();

        sink.on_recorded(&result(20));
        let stored = sink.stored();
        assert_eq!(stored.len(), 1);

        let path = &stored[0];
        assert!(path.starts_with(root.join("user-1")));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("video_0_"));
        assert!(name.ends_with(".webm"));
        assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3, 4]);

        let metadata = read_metadata(path).unwrap();
        assert_eq!(metadata.duration_secs, 20);
        assert!(metadata.mirrored);
        assert_eq!(metadata.byte_len, 4);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn order_index_continues_across_reopen() {
        let root = temp_root("reopen");
        {
            let sink = FileSink::new(&root, "user-2").unwrap();
            sink.store(&result(15)).unwrap();
            sink.store(&result(16)).unwrap();
        }

        let sink = FileSink::new(&root, "user-2").unwrap();
        let path = sink.store(&result(30)).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("video_2_"), "got {}", name);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn cancellation_is_counted() {
        let root = temp_root("cancel");
        let sink = FileSink::new(&root, "user-3").unwrap();
        sink.on_cancelled();
        assert_eq!(sink.cancellations(), 1);
        assert!(sink.stored().is_empty());

        let _ = fs::remove_dir_all(&root);
    }
}
