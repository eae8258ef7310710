//! Playback controller: one resource, one session, explicit states.
//!
//! State machine: `Idle -> Loading -> Playing -> (Ended | Errored)`, plus
//! `Playing -> Stopped` on interruption. `Ended`/`Errored` collapse back
//! to `Idle` before `play` resolves, so observers polling [`Playback::state`]
//! see `Idle` once the controller is ready for the next resource.

use async_trait::async_trait;

use super::error::PlaybackError;
use super::types::AudioResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Stopped,
    Ended,
    Errored,
}

/// How a playback session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The audio played to its natural end.
    Ended,
    /// `stop` interrupted the session.
    Stopped,
}

/// The single owner of "sound currently coming out of the speakers".
///
/// Only the sequencer calls these methods during a drain; everything else
/// goes through `Sequencer::enqueue`.
#[async_trait]
pub trait Playback: Send + Sync {
    /// Play one resource to completion. Legal only from `Idle`; resolves
    /// when playback ends naturally, errors, or is interrupted by [`stop`].
    /// The resource is released in all three cases. Errors are never
    /// retried here; skipping is the sequencer's call.
    ///
    /// [`stop`]: Playback::stop
    async fn play(&self, resource: AudioResource) -> Result<PlaybackOutcome, PlaybackError>;

    /// Halt playback immediately and release the resource. Safe to call
    /// from any state; a no-op when idle.
    fn stop(&self);

    fn state(&self) -> PlaybackState;
}

#[cfg(feature = "audio")]
pub use rodio_player::RodioPlayer;

#[cfg(feature = "audio")]
mod rodio_player {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex, MutexGuard};

    use async_trait::async_trait;
    use tracing::debug;

    use super::{Playback, PlaybackOutcome, PlaybackState};
    use crate::speech::error::PlaybackError;
    use crate::speech::types::AudioResource;

    struct Inner {
        state: PlaybackState,
        sink: Option<Arc<rodio::Sink>>,
    }

    /// Rodio-backed controller. The output stream lives on a blocking
    /// thread for the duration of one session because it is `!Send`;
    /// the sink handle is shared so `stop` works from any task.
    pub struct RodioPlayer {
        inner: Arc<Mutex<Inner>>,
    }

    impl RodioPlayer {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(Inner {
                    state: PlaybackState::Idle,
                    sink: None,
                })),
            }
        }
    }

    impl Default for RodioPlayer {
        fn default() -> Self {
            Self::new()
        }
    }

    fn lock(inner: &Arc<Mutex<Inner>>) -> MutexGuard<'_, Inner> {
        inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[async_trait]
    impl Playback for RodioPlayer {
        async fn play(
            &self,
            resource: AudioResource,
        ) -> Result<PlaybackOutcome, PlaybackError> {
            {
                let mut guard = lock(&self.inner);
                if guard.state != PlaybackState::Idle {
                    return Err(PlaybackError::Busy(guard.state));
                }
                guard.state = PlaybackState::Loading;
            }

            // Drain the transport before decoding; the decoder needs a
            // seekable buffer.
            let bytes = match resource.into_bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    lock(&self.inner).state = PlaybackState::Idle;
                    return Err(e.into());
                }
            };

            // stop() may have landed while the bytes were in flight.
            {
                let mut guard = lock(&self.inner);
                if guard.state == PlaybackState::Stopped {
                    guard.state = PlaybackState::Idle;
                    debug!("playback stopped while loading");
                    return Ok(PlaybackOutcome::Stopped);
                }
            }

            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || play_blocking(&inner, bytes))
                .await
                .map_err(|e| PlaybackError::Task(e.to_string()))?
        }

        fn stop(&self) {
            let mut guard = lock(&self.inner);
            if guard.state == PlaybackState::Idle {
                return;
            }
            if let Some(sink) = guard.sink.take() {
                sink.stop();
            }
            guard.state = PlaybackState::Stopped;
        }

        fn state(&self) -> PlaybackState {
            lock(&self.inner).state
        }
    }

    fn play_blocking(
        inner: &Arc<Mutex<Inner>>,
        bytes: Vec<u8>,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let (_stream, handle) = match rodio::OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                lock(inner).state = PlaybackState::Idle;
                return Err(PlaybackError::Device(e.to_string()));
            }
        };
        let sink = match rodio::Sink::try_new(&handle) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                lock(inner).state = PlaybackState::Idle;
                return Err(PlaybackError::Device(e.to_string()));
            }
        };
        let source = match rodio::Decoder::new(Cursor::new(bytes)) {
            Ok(source) => source,
            Err(e) => {
                // Errored collapses straight to Idle; the controller
                // stays reusable and the error travels in the Result.
                lock(inner).state = PlaybackState::Idle;
                return Err(PlaybackError::Decode(e.to_string()));
            }
        };

        // Install the sink and release the lock before sleeping so stop()
        // from another task is never blocked.
        {
            let mut guard = lock(inner);
            if guard.state == PlaybackState::Stopped {
                guard.state = PlaybackState::Idle;
                return Ok(PlaybackOutcome::Stopped);
            }
            sink.append(source);
            sink.play();
            guard.sink = Some(Arc::clone(&sink));
            guard.state = PlaybackState::Playing;
        }

        sink.sleep_until_end();

        let mut guard = lock(inner);
        let outcome = if guard.state == PlaybackState::Stopped {
            PlaybackOutcome::Stopped
        } else {
            PlaybackOutcome::Ended
        };
        guard.sink = None;
        guard.state = PlaybackState::Idle;
        Ok(outcome)
    }
}
