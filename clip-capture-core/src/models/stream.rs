use std::fmt;
use std::sync::Arc;

use super::facing::Facing;
use crate::traits::frame_source::FrameSource;

/// Opaque identifier for an acquired device stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(String);

impl StreamId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to the microphone track of a stream.
///
/// The session never inspects audio; it only forwards the track to the
/// encoder so the platform backend can resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    pub id: String,
    pub label: String,
}

/// A live camera + microphone stream.
///
/// Deliberately not `Clone`: the session owns the stream exclusively and
/// gives it back to the provider by value on release.
pub struct MediaStream {
    id: StreamId,
    facing: Facing,
    video: Arc<dyn FrameSource>,
    audio: Option<AudioTrack>,
}

impl MediaStream {
    pub fn new(
        id: StreamId,
        facing: Facing,
        video: Arc<dyn FrameSource>,
        audio: Option<AudioTrack>,
    ) -> Self {
        Self {
            id,
            facing,
            video,
            audio,
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn video(&self) -> Arc<dyn FrameSource> {
        Arc::clone(&self.video)
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("facing", &self.facing)
            .field("dimensions", &self.video.dimensions())
            .field("audio", &self.audio)
            .finish()
    }
}
