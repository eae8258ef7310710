use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::chunker;
use super::error::FetchError;
use crate::config;

/// One speakable unit of text, ordered within its queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub index: usize,
    pub text: String,
}

/// Ordered segments awaiting playback for one conversational turn.
///
/// A new reply replaces the whole queue; at most one queue is active at a
/// time (enforced by the sequencer's generation counter).
#[derive(Debug, Clone, Default)]
pub struct PlaybackQueue {
    segments: VecDeque<TextSegment>,
}

impl PlaybackQueue {
    pub fn new(segments: Vec<TextSegment>) -> Self {
        Self { segments: segments.into() }
    }

    /// Chunk reply text into a queue. Whitespace-only input yields an
    /// empty queue; the caller should treat that as "nothing to play".
    pub fn from_text(text: &str, max_len: usize) -> Self {
        Self::new(chunker::chunk(text, max_len))
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub(crate) fn into_segments(self) -> VecDeque<TextSegment> {
        self.segments
    }
}

/// Voice parameters forwarded to the synthesis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub voice_id: String,
    pub model_id: String,
    /// Latency optimization hint for the streaming endpoint, 0-4.
    pub optimize_streaming_latency: u8,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: config::DEFAULT_VOICE_ID.to_string(),
            model_id: config::DEFAULT_MODEL_ID.to_string(),
            optimize_streaming_latency: 2,
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

/// Where the resolved audio bytes come from.
pub enum AudioBody {
    /// Live byte stream from the streaming transport, consumable before
    /// the full payload has arrived.
    Streamed(ByteStream),
    /// Fully decoded bytes from the buffered (base64) transport.
    Buffered(Vec<u8>),
}

impl fmt::Debug for AudioBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioBody::Streamed(_) => f.write_str("Streamed(..)"),
            AudioBody::Buffered(b) => write!(f, "Buffered({} bytes)", b.len()),
        }
    }
}

/// Playable audio for one segment, owned transiently by the playback
/// controller and dropped as soon as the segment finishes or fails.
#[derive(Debug)]
pub struct AudioResource {
    pub mime: String,
    pub body: AudioBody,
}

impl AudioResource {
    pub fn buffered(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime: mime.into(), body: AudioBody::Buffered(bytes) }
    }

    pub fn streamed(mime: impl Into<String>, stream: ByteStream) -> Self {
        Self { mime: mime.into(), body: AudioBody::Streamed(stream) }
    }

    pub fn is_streamed(&self) -> bool {
        matches!(self.body, AudioBody::Streamed(_))
    }

    /// Drain the resource into a contiguous buffer. The decoder needs a
    /// seekable source, so even streamed bodies are collected before play.
    pub async fn into_bytes(self) -> Result<Vec<u8>, FetchError> {
        match self.body {
            AudioBody::Buffered(bytes) => Ok(bytes),
            AudioBody::Streamed(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn streamed_body_collects_in_order() {
        let parts: Vec<Result<Bytes, FetchError>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"def")),
        ];
        let resource =
            AudioResource::streamed("audio/mpeg", Box::pin(stream::iter(parts)));
        assert!(resource.is_streamed());
        assert_eq!(resource.into_bytes().await.unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn streamed_body_propagates_errors() {
        let parts: Vec<Result<Bytes, FetchError>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(FetchError::transport("connection reset")),
        ];
        let resource =
            AudioResource::streamed("audio/mpeg", Box::pin(stream::iter(parts)));
        assert!(resource.into_bytes().await.is_err());
    }

    #[test]
    fn queue_from_whitespace_is_empty() {
        assert!(PlaybackQueue::from_text("   ", 180).is_empty());
    }
}
