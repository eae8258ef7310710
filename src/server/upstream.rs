//! The single call both relay endpoints make against the synthesis API.

use serde_json::json;

use super::error::ApiError;
use crate::server::dto::AUDIO_MPEG;

pub(crate) struct SynthRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub model_id: &'a str,
    pub optimize_streaming_latency: u8,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

/// POST the synthesis request upstream and hand back the raw response.
///
/// Callers decide what to do with the body: `/tts` collects it, while
/// `/tts-stream` forwards the byte stream as-is. Non-success statuses
/// are mapped to [`ApiError::Upstream`] with the upstream body attached.
pub(crate) async fn synthesize(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &SynthRequest<'_>,
) -> Result<reqwest::Response, ApiError> {
    let url = format!("{}/{}", base_url, request.voice_id);
    let payload = json!({
        "text": request.text,
        "model_id": request.model_id,
        "voice_settings": {
            "stability": request.stability,
            "similarity_boost": request.similarity_boost,
            "style": request.style,
            "use_speaker_boost": request.use_speaker_boost,
        },
        "optimize_streaming_latency": request.optimize_streaming_latency,
    });

    let response = client
        .post(&url)
        .header("xi-api-key", api_key)
        .header("Accept", AUDIO_MPEG)
        .json(&payload)
        .send()
        .await
        .map_err(|e| ApiError::Gateway(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let details = response.text().await.unwrap_or_default();
        return Err(ApiError::Upstream { status, details });
    }

    Ok(response)
}
