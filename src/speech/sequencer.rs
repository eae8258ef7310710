//! Serializes chunk processing: fetch, play, advance, never overlap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use super::fetch::AudioFetcher;
use super::player::{Playback, PlaybackOutcome, PlaybackState};
use super::types::{PlaybackQueue, TextSegment, VoiceConfig};

/// The queue and its generation change together, under one lock, so a
/// popped segment is always attributable to the generation it came from.
#[derive(Default)]
struct QueueState {
    generation: u64,
    segments: VecDeque<TextSegment>,
}

struct Inner {
    fetcher: Arc<dyn AudioFetcher>,
    player: Arc<dyn Playback>,
    voice: VoiceConfig,
    gap: Duration,
    queue: Mutex<QueueState>,
    draining: AtomicBool,
}

/// Owns the playback queue and drives it through the fetcher and the
/// playback controller, one segment at a time, strictly in order.
///
/// Cancellation model: [`enqueue`] stops the controller and swaps in the
/// new queue under a bumped generation. A fetch that was already in
/// flight for the old queue may still resolve, but its result is
/// discarded unused because its generation no longer matches.
///
/// [`enqueue`]: Sequencer::enqueue
#[derive(Clone)]
pub struct Sequencer {
    inner: Arc<Inner>,
}

impl Sequencer {
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        player: Arc<dyn Playback>,
        voice: VoiceConfig,
        gap: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                player,
                voice,
                gap,
                queue: Mutex::new(QueueState::default()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Replace any pending or active queue with `queue` and drain it.
    ///
    /// Stops in-flight playback immediately; segments remaining from the
    /// previous queue are discarded. If a drain loop is already running
    /// this returns once the swap is done and the running loop picks up
    /// the new queue; otherwise it drains to completion before returning.
    ///
    /// The generation is bumped before the stop: a session that commits
    /// after the bump fails the sequencer's re-check, and one that
    /// committed before it is reached by the stop. Either way no stale
    /// segment keeps playing.
    pub async fn enqueue(&self, queue: PlaybackQueue) {
        if let Ok(mut state) = self.inner.queue.lock() {
            state.generation += 1;
            state.segments = queue.into_segments();
        }
        self.inner.player.stop();
        self.drain().await;
    }

    /// Drain the queue through fetch + play. Idempotent: a call while a
    /// drain loop is already running is a no-op.
    pub async fn drain(&self) {
        loop {
            if self.inner.draining.swap(true, Ordering::SeqCst) {
                return;
            }
            self.run_queue().await;
            self.inner.draining.store(false, Ordering::SeqCst);
            // A new queue may have arrived between the last pop and the
            // flag clearing; loop so it is not stranded.
            if self.pending() == 0 {
                return;
            }
        }
    }

    /// Number of segments not yet popped for playback.
    pub fn pending(&self) -> usize {
        self.inner
            .queue
            .lock()
            .map(|state| state.segments.len())
            .unwrap_or(0)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    fn current_generation(&self) -> u64 {
        self.inner
            .queue
            .lock()
            .map(|state| state.generation)
            .unwrap_or(0)
    }

    async fn run_queue(&self) {
        loop {
            let popped = self.inner.queue.lock().ok().and_then(|mut state| {
                let generation = state.generation;
                state.segments.pop_front().map(|seg| (generation, seg))
            });
            let Some((generation, segment)) = popped else { break };

            let resource = match self
                .inner
                .fetcher
                .resolve(&segment, &self.inner.voice)
                .await
            {
                Ok(resource) => resource,
                Err(e) => {
                    // Failure is scoped to this segment; the rest of the
                    // queue still plays.
                    warn!(index = segment.index, error = %e, "skipping segment: fetch failed");
                    continue;
                }
            };

            if self.current_generation() != generation {
                debug!(index = segment.index, "discarding stale fetch for a superseded queue");
                drop(resource);
                continue;
            }

            let player = Arc::clone(&self.inner.player);
            let session = tokio::spawn(async move { player.play(resource).await });
            // Wait for the session to commit (leave Idle) so a stop can
            // reach it, then re-check the generation: a replacement that
            // landed before the commit had nothing to stop yet.
            while self.inner.player.state() == PlaybackState::Idle && !session.is_finished() {
                tokio::task::yield_now().await;
            }
            if self.current_generation() != generation {
                self.inner.player.stop();
            }

            match session.await {
                Ok(Ok(PlaybackOutcome::Ended)) => {}
                Ok(Ok(PlaybackOutcome::Stopped)) => {
                    debug!(index = segment.index, "playback interrupted");
                }
                Ok(Err(e)) => {
                    warn!(index = segment.index, error = %e, "skipping segment: playback failed");
                }
                Err(e) => {
                    warn!(index = segment.index, error = %e, "skipping segment: playback task failed");
                }
            }

            // A short pause avoids audio artifacts from back-to-back
            // playback starts.
            if self.pending() > 0 {
                tokio::time::sleep(self.inner.gap).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::speech::error::{FetchError, PlaybackError};
    use crate::speech::types::AudioResource;

    /// Resolves each segment to its own text bytes so the fake player can
    /// report what it played. Fails for configured indices.
    struct FakeFetcher {
        fail_indices: HashSet<usize>,
        calls: StdMutex<Vec<usize>>,
    }

    impl FakeFetcher {
        fn new(fail_indices: impl IntoIterator<Item = usize>) -> Self {
            Self {
                fail_indices: fail_indices.into_iter().collect(),
                calls: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AudioFetcher for FakeFetcher {
        async fn resolve(
            &self,
            segment: &TextSegment,
            _voice: &VoiceConfig,
        ) -> Result<AudioResource, FetchError> {
            self.calls.lock().unwrap().push(segment.index);
            if self.fail_indices.contains(&segment.index) {
                return Err(FetchError::transport("both transports failed"));
            }
            Ok(AudioResource::buffered(
                "audio/mpeg",
                segment.text.clone().into_bytes(),
            ))
        }
    }

    /// Records what finished playing and what was interrupted. Each play
    /// lasts `play_ms` unless stop() pre-empts it.
    struct FakePlayer {
        play_ms: u64,
        state: StdMutex<PlaybackState>,
        stopper: Notify,
        events: StdMutex<Vec<String>>,
    }

    impl FakePlayer {
        fn new(play_ms: u64) -> Self {
            Self {
                play_ms,
                state: StdMutex::new(PlaybackState::Idle),
                stopper: Notify::new(),
                events: StdMutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Playback for FakePlayer {
        async fn play(
            &self,
            resource: AudioResource,
        ) -> Result<PlaybackOutcome, PlaybackError> {
            let text =
                String::from_utf8(resource.into_bytes().await.unwrap()).unwrap();
            *self.state.lock().unwrap() = PlaybackState::Playing;
            let outcome = tokio::select! {
                _ = self.stopper.notified() => PlaybackOutcome::Stopped,
                _ = tokio::time::sleep(Duration::from_millis(self.play_ms)) => {
                    PlaybackOutcome::Ended
                }
            };
            *self.state.lock().unwrap() = PlaybackState::Idle;
            let label = match outcome {
                PlaybackOutcome::Ended => format!("ended:{text}"),
                PlaybackOutcome::Stopped => format!("stopped:{text}"),
            };
            self.events.lock().unwrap().push(label);
            Ok(outcome)
        }

        fn stop(&self) {
            if *self.state.lock().unwrap() == PlaybackState::Playing {
                self.stopper.notify_waiters();
            }
        }

        fn state(&self) -> PlaybackState {
            *self.state.lock().unwrap()
        }
    }

    fn queue_of(texts: &[&str]) -> PlaybackQueue {
        PlaybackQueue::new(
            texts
                .iter()
                .enumerate()
                .map(|(index, text)| TextSegment {
                    index,
                    text: (*text).to_string(),
                })
                .collect(),
        )
    }

    fn sequencer(
        fetcher: Arc<FakeFetcher>,
        player: Arc<FakePlayer>,
        gap_ms: u64,
    ) -> Sequencer {
        Sequencer::new(
            fetcher,
            player,
            VoiceConfig::default(),
            Duration::from_millis(gap_ms),
        )
    }

    #[tokio::test]
    async fn drains_segments_in_order() {
        let fetcher = Arc::new(FakeFetcher::new([]));
        let player = Arc::new(FakePlayer::new(1));
        let seq = sequencer(Arc::clone(&fetcher), Arc::clone(&player), 1);

        seq.enqueue(queue_of(&["one", "two", "three"])).await;

        assert_eq!(player.events(), ["ended:one", "ended:two", "ended:three"]);
        assert_eq!(seq.pending(), 0);
        assert!(!seq.is_draining());
    }

    #[tokio::test]
    async fn empty_queue_plays_nothing() {
        let fetcher = Arc::new(FakeFetcher::new([]));
        let player = Arc::new(FakePlayer::new(1));
        let seq = sequencer(Arc::clone(&fetcher), Arc::clone(&player), 1);

        seq.enqueue(PlaybackQueue::default()).await;

        assert!(player.events().is_empty());
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_segment_is_skipped_not_fatal() {
        let fetcher = Arc::new(FakeFetcher::new([1]));
        let player = Arc::new(FakePlayer::new(1));
        let seq = sequencer(Arc::clone(&fetcher), Arc::clone(&player), 1);

        seq.enqueue(queue_of(&["one", "two", "three"])).await;

        // Segment 2 of 3 fails on both transports: 1 and 3 still play.
        assert_eq!(player.events(), ["ended:one", "ended:three"]);
        assert_eq!(*fetcher.calls.lock().unwrap(), [0, 1, 2]);
        assert_eq!(seq.pending(), 0);
    }

    #[tokio::test]
    async fn enqueue_replaces_active_queue_and_stops_playback() {
        let fetcher = Arc::new(FakeFetcher::new([]));
        let player = Arc::new(FakePlayer::new(100));
        let seq = sequencer(Arc::clone(&fetcher), Arc::clone(&player), 1);

        let background = seq.clone();
        let drain_a = tokio::spawn(async move {
            background.enqueue(queue_of(&["a0", "a1", "a2"])).await;
        });

        // Let a0 start playing, then supersede the queue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        seq.enqueue(queue_of(&["b0", "b1"])).await;
        drain_a.await.unwrap();

        let events = player.events();
        assert_eq!(events[0], "stopped:a0");
        assert!(
            !events.iter().skip(1).any(|e| e.contains(":a")),
            "old queue still played after replacement: {events:?}"
        );
        assert_eq!(&events[1..], ["ended:b0", "ended:b1"]);
        assert_eq!(seq.pending(), 0);
    }

    /// Player whose sessions stay uncommitted (Idle) until the gate opens,
    /// so a test can interleave a queue replacement with session startup.
    struct GatedPlayer {
        gate: Notify,
        stopper: Notify,
        state: StdMutex<PlaybackState>,
        events: StdMutex<Vec<String>>,
    }

    impl GatedPlayer {
        fn new() -> Self {
            Self {
                gate: Notify::new(),
                stopper: Notify::new(),
                state: StdMutex::new(PlaybackState::Idle),
                events: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Playback for GatedPlayer {
        async fn play(
            &self,
            resource: AudioResource,
        ) -> Result<PlaybackOutcome, PlaybackError> {
            let text =
                String::from_utf8(resource.into_bytes().await.unwrap()).unwrap();
            self.gate.notified().await;
            *self.state.lock().unwrap() = PlaybackState::Playing;
            let outcome = tokio::select! {
                _ = self.stopper.notified() => PlaybackOutcome::Stopped,
                _ = tokio::time::sleep(Duration::from_millis(200)) => {
                    PlaybackOutcome::Ended
                }
            };
            *self.state.lock().unwrap() = PlaybackState::Idle;
            let label = match outcome {
                PlaybackOutcome::Ended => format!("ended:{text}"),
                PlaybackOutcome::Stopped => format!("stopped:{text}"),
            };
            self.events.lock().unwrap().push(label);
            Ok(outcome)
        }

        fn stop(&self) {
            if *self.state.lock().unwrap() == PlaybackState::Playing {
                self.stopper.notify_waiters();
            }
        }

        fn state(&self) -> PlaybackState {
            *self.state.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn replacement_during_session_startup_does_not_play_stale_audio() {
        let fetcher = Arc::new(FakeFetcher::new([]));
        let player = Arc::new(GatedPlayer::new());
        let seq = Sequencer::new(
            Arc::clone(&fetcher) as Arc<dyn AudioFetcher>,
            Arc::clone(&player) as Arc<dyn Playback>,
            VoiceConfig::default(),
            Duration::from_millis(1),
        );

        let background = seq.clone();
        let drain = tokio::spawn(async move {
            background.enqueue(queue_of(&["old"])).await;
        });
        // Let the session start and park on the gate, still uncommitted.
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Supersede the queue while nothing is playing yet: a stop issued
        // here has no session to reach, which is exactly the window the
        // sequencer's post-commit re-check covers.
        if let Ok(mut state) = seq.inner.queue.lock() {
            state.generation += 1;
            state.segments.clear();
        }
        player.gate.notify_one();
        drain.await.unwrap();

        assert_eq!(player.events.lock().unwrap().clone(), ["stopped:old"]);
    }

    #[tokio::test]
    async fn concurrent_drains_do_not_double_play() {
        let fetcher = Arc::new(FakeFetcher::new([]));
        let player = Arc::new(FakePlayer::new(1));
        let seq = sequencer(Arc::clone(&fetcher), Arc::clone(&player), 1);

        if let Ok(mut state) = seq.inner.queue.lock() {
            state.segments = queue_of(&["solo"]).into_segments();
        }
        tokio::join!(seq.drain(), seq.drain());

        assert_eq!(player.events(), ["ended:solo"]);
    }
}
