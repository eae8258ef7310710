//! Client-side sequential playback pipeline.
//!
//! Reply text flows through four stages: the [`chunker`] splits it into
//! sentence-sized segments, the [`fetch`] layer resolves audio for each
//! segment (streaming transport first, buffered base64 fallback), the
//! [`player`] plays one resource to completion, and the [`sequencer`]
//! drives the whole queue strictly in order.

pub mod chunker;
pub mod error;
pub mod fetch;
pub mod player;
pub mod sequencer;
pub mod types;

pub use chunker::chunk;
pub use error::{FetchError, FetchKind, PlaybackError};
pub use fetch::{AudioFetcher, HttpTransport, SpeechFetcher, SynthTransport};
pub use player::{Playback, PlaybackOutcome, PlaybackState};
#[cfg(feature = "audio")]
pub use player::RodioPlayer;
pub use sequencer::Sequencer;
pub use types::{AudioBody, AudioResource, PlaybackQueue, TextSegment, VoiceConfig};
