//! Audio resolution for text segments.
//!
//! Two transports against the relay, tried in order: the streaming GET
//! endpoint (low latency, bytes arrive progressively) and the buffered
//! POST endpoint (base64 JSON). A streaming failure of any kind falls
//! back once to buffered; it is never retried.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use futures_util::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::error::FetchError;
use super::types::{AudioResource, TextSegment, VoiceConfig};
use crate::config::ResponseFormat;
use crate::server::dto::{TtsRequest, TtsResponse};

/// Upper bound on one synthesis request. The upstream default is
/// environment-dependent, so the client pins its own.
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Resolves a segment into playable audio. The sequencer only sees this
/// trait, which keeps the transport swappable in tests.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn resolve(
        &self,
        segment: &TextSegment,
        voice: &VoiceConfig,
    ) -> Result<AudioResource, FetchError>;
}

/// One attempt against a single transport. Split out from [`AudioFetcher`]
/// so the fallback policy can be exercised without a network.
#[async_trait]
pub trait SynthTransport: Send + Sync {
    async fn stream(&self, text: &str, voice: &VoiceConfig)
        -> Result<AudioResource, FetchError>;

    async fn buffered(&self, text: &str, voice: &VoiceConfig)
        -> Result<AudioResource, FetchError>;
}

/// HTTP transport against the relay server's `/tts-stream` and `/tts`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| FetchError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SynthTransport for HttpTransport {
    async fn stream(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<AudioResource, FetchError> {
        let url = format!("{}/tts-stream", self.base_url);
        let osl = voice.optimize_streaming_latency.min(4).to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("text", text),
                ("voice_id", voice.voice_id.as_str()),
                ("model_id", voice.model_id.as_str()),
                ("osl", osl.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::transport(format!("streaming request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::upstream(format!(
                "streaming endpoint returned {status}: {body}"
            )));
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !mime.starts_with("audio/") {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::upstream(format!(
                "expected audio content type, got '{mime}': {body}"
            )));
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| FetchError::transport(format!("stream read failed: {e}")));
        Ok(AudioResource::streamed(mime, Box::pin(stream)))
    }

    async fn buffered(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<AudioResource, FetchError> {
        let url = format!("{}/tts", self.base_url);
        let request = TtsRequest {
            text: text.to_string(),
            voice_id: Some(voice.voice_id.clone()),
            model_id: Some(voice.model_id.clone()),
            optimize_streaming_latency: voice.optimize_streaming_latency.min(4),
            stability: voice.stability,
            similarity_boost: voice.similarity_boost,
            style: voice.style,
            use_speaker_boost: voice.use_speaker_boost,
            format: Some(ResponseFormat::Base64),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FetchError::transport(format!("buffered request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::upstream(format!(
                "buffered endpoint returned {status}: {body}"
            )));
        }

        let body: TtsResponse = response
            .json()
            .await
            .map_err(|e| FetchError::transport(format!("malformed synthesis response: {e}")))?;
        let bytes = general_purpose::STANDARD
            .decode(&body.audio_base64)
            .map_err(|e| FetchError::transport(format!("invalid base64 audio: {e}")))?;
        Ok(AudioResource::buffered(body.mime, bytes))
    }
}

/// The fetcher the sequencer uses: streaming first, buffered fallback.
pub struct SpeechFetcher<T: SynthTransport> {
    transport: T,
}

impl<T: SynthTransport> SpeechFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: SynthTransport> AudioFetcher for SpeechFetcher<T> {
    async fn resolve(
        &self,
        segment: &TextSegment,
        voice: &VoiceConfig,
    ) -> Result<AudioResource, FetchError> {
        let text = segment.text.trim();
        if text.is_empty() {
            return Err(FetchError::validation("segment text is empty"));
        }

        let stream_err = match self.transport.stream(text, voice).await {
            Ok(resource) => return Ok(resource),
            Err(e) => e,
        };
        debug!(
            index = segment.index,
            error = %stream_err,
            "streaming transport failed, falling back to buffered"
        );

        match self.transport.buffered(text, voice).await {
            Ok(resource) => Ok(resource),
            Err(buffered_err) => Err(FetchError {
                kind: buffered_err.kind,
                detail: format!(
                    "streaming: {}; buffered: {}",
                    stream_err.detail, buffered_err.detail
                ),
            }),
        }
    }
}
