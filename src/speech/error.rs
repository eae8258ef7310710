use std::fmt;

use thiserror::Error;

use super::player::PlaybackState;

/// Broad category of a fetch failure, used to decide how a failure is
/// reported; the fallback policy itself is fixed (streaming once, then
/// buffered once).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// The client itself is misconfigured (bad base URL, no HTTP client).
    Config,
    /// The input was unusable (empty segment text).
    Validation,
    /// The synthesis service answered with a non-success status or an
    /// unexpected payload.
    Upstream,
    /// The request never completed: network error, timeout, or a body
    /// that could not be read or decoded.
    Transport,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchKind::Config => "config",
            FetchKind::Validation => "validation",
            FetchKind::Upstream => "upstream",
            FetchKind::Transport => "transport",
        };
        f.write_str(name)
    }
}

/// A failed attempt to resolve audio for one segment.
///
/// When both transports fail, `detail` carries both attempts' messages.
#[derive(Debug, Clone, Error)]
#[error("{kind} failure: {detail}")]
pub struct FetchError {
    pub kind: FetchKind,
    pub detail: String,
}

impl FetchError {
    pub fn config(detail: impl Into<String>) -> Self {
        Self { kind: FetchKind::Config, detail: detail.into() }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self { kind: FetchKind::Validation, detail: detail.into() }
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        Self { kind: FetchKind::Upstream, detail: detail.into() }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self { kind: FetchKind::Transport, detail: detail.into() }
    }
}

/// A failure local to the playback controller. Terminal for the segment
/// being played; the sequencer skips it and continues.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback already active (state: {0:?})")]
    Busy(PlaybackState),

    #[error("audio output unavailable: {0}")]
    Device(String),

    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("playback task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
