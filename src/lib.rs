//! Text-to-speech relay server and sequential speech playback client.
//!
//! The `server` module proxies synthesis requests to an upstream
//! ElevenLabs-compatible API. The `speech` module is the client side:
//! it chunks reply text into speakable segments, resolves audio for each
//! segment (streaming first, base64 fallback) and plays them strictly
//! in order.

pub mod answer;
pub mod cli;
pub mod config;
pub mod server;
pub mod speech;
