use clap::{Parser, Subcommand};

use crate::config::{self, ResponseFormat};

#[derive(Parser, Debug)]
#[command(
    name = "voxbridge",
    version,
    about = "Text-to-speech relay and sequential playback client",
    long_about = "voxbridge proxies text-to-speech requests to an upstream synthesis API and \
plays replies back sentence by sentence — streaming first, base64 fallback, strictly in order."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the synthesis relay server
    Serve(ServeArgs),
    /// Chunk text and play it through the relay
    Speak(SpeakArgs),
    /// Ask the answer service, then speak the reply
    Ask(AskArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0",
          help = "Address to bind")]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value_t = 3000,
          help = "Port to listen on")]
    pub port: u16,

    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true,
          help = "Upstream synthesis API key")]
    pub api_key: Option<String>,

    #[arg(long, env = "DEFAULT_VOICE_ID", default_value = config::DEFAULT_VOICE_ID,
          help = "Voice used when a request omits voice_id")]
    pub voice_id: String,

    #[arg(long, env = "DEFAULT_MODEL_ID", default_value = config::DEFAULT_MODEL_ID,
          help = "Model used when a request omits model_id")]
    pub model_id: String,

    #[arg(long, env = "ENABLE_CORS", default_value_t = false,
          help = "Allow cross-origin requests from any origin")]
    pub cors: bool,

    #[arg(long, env = "TTS_RESPONSE_FORMAT", value_enum, default_value = "base64",
          help = "Default /tts response format (requests may override per call)")]
    pub response_format: ResponseFormat,

    #[arg(long, env = "ELEVEN_API_URL", default_value = config::ELEVEN_API,
          help = "Upstream synthesis base URL")]
    pub upstream_url: String,
}

/// Options shared by the `speak` and `ask` playback pipelines.
#[derive(clap::Args, Debug)]
pub struct PipelineArgs {
    #[arg(long, env = "VOXBRIDGE_URL", default_value = "http://127.0.0.1:3000",
          help = "Base URL of the relay server")]
    pub relay_url: String,

    #[arg(long, env = "DEFAULT_VOICE_ID", default_value = config::DEFAULT_VOICE_ID,
          help = "Voice to synthesize with")]
    pub voice_id: String,

    #[arg(long, env = "DEFAULT_MODEL_ID", default_value = config::DEFAULT_MODEL_ID,
          help = "Model to synthesize with")]
    pub model_id: String,

    #[arg(long, default_value_t = 180, value_name = "CHARS",
          help = "Maximum characters per spoken chunk")]
    pub max_chunk: usize,

    #[arg(long, default_value_t = 120, value_name = "MS",
          help = "Pause between chunks in milliseconds")]
    pub gap_ms: u64,

    #[arg(long, default_value_t = 2, value_name = "0-4",
          help = "Streaming latency optimization hint (clamped to 0-4)")]
    pub latency_hint: u8,
}

#[derive(clap::Args, Debug)]
pub struct SpeakArgs {
    #[arg(value_name = "TEXT", help = "Text to speak (reads stdin when omitted)")]
    pub text: Option<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(clap::Args, Debug)]
pub struct AskArgs {
    #[arg(short, long, help = "User name sent to the answer service")]
    pub user: String,

    #[arg(value_name = "MESSAGE", help = "Optional message for the answer service")]
    pub message: Option<String>,

    #[arg(long, env = "ANSWER_URL", help = "Answer service endpoint")]
    pub answer_url: String,

    #[arg(long, default_value_t = false, help = "Print the reply without playing audio")]
    pub quiet: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}
