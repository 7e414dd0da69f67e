use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::facing::Facing;
use super::frame::Dimensions;
use super::media_format::MediaFormat;

/// Encoded clip bytes plus the format they were encoded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipBlob {
    bytes: Arc<[u8]>,
    format: MediaFormat,
}

impl ClipBlob {
    pub fn new(bytes: Vec<u8>, format: MediaFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> &MediaFormat {
        &self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 hex digest of the payload.
    pub fn checksum(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        hex_encode(&digest)
    }
}

/// Result handed to the upload sink when a clip is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub blob: ClipBlob,
    pub duration_secs: u64,
    pub metadata: ClipMetadata,
}

/// Metadata describing a finished clip.
///
/// Serializable so the sink can persist it next to the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub id: String,
    pub duration_secs: u64,
    pub mime_type: String,
    pub extension: String,
    pub byte_len: u64,
    pub checksum: String,
    pub facing: Facing,
    pub mirrored: bool,
    pub width: u32,
    pub height: u32,
    pub created_at: String,
}

impl ClipMetadata {
    pub fn describe(
        blob: &ClipBlob,
        duration_secs: u64,
        facing: Facing,
        mirrored: bool,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs,
            mime_type: blob.format().mime_type().to_string(),
            extension: blob.format().extension().to_string(),
            byte_len: blob.len() as u64,
            checksum: blob.checksum(),
            facing,
            mirrored,
            width: dimensions.width,
            height: dimensions.height,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl RecordingResult {
    pub fn new(
        blob: ClipBlob,
        duration_secs: u64,
        facing: Facing,
        mirrored: bool,
        dimensions: Dimensions,
    ) -> Self {
        let metadata = ClipMetadata::describe(&blob, duration_secs, facing, mirrored, dimensions);
        Self {
            blob,
            duration_secs,
            metadata,
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        let blob = ClipBlob::new(b"abc".to_vec(), MediaFormat::new("video/webm"));
        assert_eq!(
            blob.checksum(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn metadata_reflects_blob() {
        let blob = ClipBlob::new(vec![1; 64], MediaFormat::new("video/mp4"));
        let result = RecordingResult::new(
            blob.clone(),
            21,
            Facing::Front,
            true,
            Dimensions::new(1080, 1920),
        );

        assert_eq!(result.metadata.duration_secs, 21);
        assert_eq!(result.metadata.byte_len, 64);
        assert_eq!(result.metadata.extension, "mp4");
        assert_eq!(result.metadata.checksum, blob.checksum());
        assert!(result.metadata.mirrored);
        assert_eq!(uuid::Uuid::parse_str(&result.metadata.id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn metadata_json_round_trip() {
        let blob = ClipBlob::new(vec![0; 8], MediaFormat::new("video/webm;codecs=vp9"));
        let metadata = ClipMetadata::describe(&blob, 30, Facing::Back, false, Dimensions::new(720, 1280));

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"facing\":\"back\""));
        let parsed: ClipMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }
}
