use crate::models::media_format::MediaFormat;
use crate::models::recording_result::ClipBlob;

/// Accumulates encoded chunks as the recorder emits them and assembles
/// them into one blob when recording stops.
///
/// Empty chunks are dropped, matching recorders that flush zero-length
/// data events.
#[derive(Debug, Default)]
pub struct ChunkCollector {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl ChunkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Discard everything collected so far.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Concatenate all chunks in arrival order.
    pub fn assemble(self, format: MediaFormat) -> ClipBlob {
        let mut bytes = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks {
            bytes.extend_from_slice(&chunk);
        }
        ClipBlob::new(bytes, format)
    }
}
