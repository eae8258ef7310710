//! Wire types for the relay endpoints. The `speech::fetch` client reuses
//! these so both sides of the contract share one definition.

use serde::{Deserialize, Serialize};

use crate::config::ResponseFormat;

pub const AUDIO_MPEG: &str = "audio/mpeg";

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

fn default_true() -> bool {
    true
}

/// Body of `POST /tts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(default)]
    pub optimize_streaming_latency: u8,

    #[serde(default = "default_stability")]
    pub stability: f32,

    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,

    #[serde(default)]
    pub style: f32,

    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,

    /// Per-request override of the server's response format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ResponseFormat>,
}

/// Success body of `POST /tts` in base64 mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsResponse {
    pub mime: String,
    pub audio_base64: String,
}

/// Query parameters of `GET /tts-stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    pub text: String,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    /// Latency optimization hint; clamped to 0-4, defaults to 2.
    pub osl: Option<i64>,
}
