use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::ServeArgs;

/// Upstream synthesis API base URL (a voice id is appended per request).
pub const ELEVEN_API: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Voice used when a request does not name one.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Model used when a request does not name one.
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// How `/tts` returns synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// JSON body with base64-encoded audio (`{mime, audio_base64}`).
    #[default]
    Base64,
    /// Raw audio bytes with an `audio/*` content type.
    Binary,
}

/// Runtime configuration for the relay server.
///
/// Values come from CLI flags and environment variables (a `.env` file is
/// honored); see [`ServeArgs`] for the variable names.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub default_voice_id: String,
    pub default_model_id: String,
    pub enable_cors: bool,
    pub response_format: ResponseFormat,
    pub upstream_url: String,
}

impl Config {
    pub fn from_serve_args(args: &ServeArgs) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            api_key: args.api_key.clone(),
            default_voice_id: args.voice_id.clone(),
            default_model_id: args.model_id.clone(),
            enable_cors: args.cors,
            response_format: args.response_format,
            upstream_url: args.upstream_url.trim_end_matches('/').to_string(),
        }
    }
}
