//! Route definitions and request handlers for the relay.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::dto::{StreamParams, TtsRequest, TtsResponse, AUDIO_MPEG};
use super::error::ApiError;
use super::upstream::{self, SynthRequest};
use super::SharedState;
use crate::config::ResponseFormat;

pub fn router(state: SharedState) -> Router {
    let enable_cors = state.config.enable_cors;
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/tts", post(tts))
        .route("/tts-stream", get(tts_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    app
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "ts": now_ms() }))
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Buffered synthesis: collects the upstream audio and returns it either
/// as base64 JSON or as raw bytes, depending on the format toggle.
async fn tts(
    State(state): State<SharedState>,
    Json(request): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    let api_key = state.config.api_key.as_deref().ok_or(ApiError::MissingApiKey)?;
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::MissingText);
    }

    let synth = SynthRequest {
        text,
        voice_id: request
            .voice_id
            .as_deref()
            .unwrap_or(&state.config.default_voice_id),
        model_id: request
            .model_id
            .as_deref()
            .unwrap_or(&state.config.default_model_id),
        optimize_streaming_latency: request.optimize_streaming_latency.min(4),
        stability: request.stability,
        similarity_boost: request.similarity_boost,
        style: request.style,
        use_speaker_boost: request.use_speaker_boost,
    };

    let upstream =
        upstream::synthesize(&state.client, &state.config.upstream_url, api_key, &synth)
            .await?;
    let audio = upstream
        .bytes()
        .await
        .map_err(|e| ApiError::Gateway(e.to_string()))?;
    debug!(bytes = audio.len(), "synthesized buffered audio");

    let format = request.format.unwrap_or(state.config.response_format);
    Ok(match format {
        ResponseFormat::Binary => {
            ([(header::CONTENT_TYPE, AUDIO_MPEG)], audio.to_vec()).into_response()
        }
        ResponseFormat::Base64 => Json(TtsResponse {
            mime: AUDIO_MPEG.to_string(),
            audio_base64: general_purpose::STANDARD.encode(&audio),
        })
        .into_response(),
    })
}

/// Streaming synthesis: forwards the upstream byte stream so playback can
/// begin before the full payload has arrived.
async fn tts_stream(
    State(state): State<SharedState>,
    Query(params): Query<StreamParams>,
) -> Result<Response, ApiError> {
    let api_key = state.config.api_key.as_deref().ok_or(ApiError::MissingApiKey)?;
    let text = params.text.trim();
    if text.is_empty() {
        return Err(ApiError::MissingText);
    }

    let synth = SynthRequest {
        text,
        voice_id: params
            .voice_id
            .as_deref()
            .unwrap_or(&state.config.default_voice_id),
        model_id: params
            .model_id
            .as_deref()
            .unwrap_or(&state.config.default_model_id),
        optimize_streaming_latency: params.osl.unwrap_or(2).clamp(0, 4) as u8,
        stability: 0.5,
        similarity_boost: 0.75,
        style: 0.0,
        use_speaker_boost: true,
    };

    let upstream =
        upstream::synthesize(&state.client, &state.config.upstream_url, api_key, &synth)
            .await?;

    let headers = [
        (header::CONTENT_TYPE, AUDIO_MPEG),
        (header::CACHE_CONTROL, "no-store"),
        (header::ACCEPT_RANGES, "bytes"),
    ];
    Ok((headers, Body::from_stream(upstream.bytes_stream())).into_response())
}
