//! The synthesis relay server: `/health`, `/tts` (buffered base64 or
//! binary) and `/tts-stream` (progressive bytes).

pub mod dto;
pub mod error;
mod routes;
mod upstream;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;

pub use routes::router;

/// State shared across all handlers.
pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
}

pub type SharedState = Arc<AppState>;

/// Bind and serve until the process is stopped.
pub async fn serve(config: Config) -> Result<()> {
    // No total timeout here: /tts-stream keeps the upstream body open for
    // as long as the synthesis takes. Connect attempts are still bounded.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build upstream HTTP client")?;

    let addr = format!("{}:{}", config.host, config.port);
    let has_key = config.api_key.is_some();
    let state = Arc::new(AppState { config, client });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, api_key_configured = has_key, "TTS relay listening");
    if !has_key {
        tracing::warn!("ELEVENLABS_API_KEY is not set; synthesis requests will fail");
    }

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")
}
