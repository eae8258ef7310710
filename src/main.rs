use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use voxbridge::cli::{Args, AskArgs, Commands, PipelineArgs, SpeakArgs};
use voxbridge::config::Config;
use voxbridge::speech::{
    AudioFetcher, HttpTransport, Playback, PlaybackQueue, Sequencer, SpeechFetcher,
    VoiceConfig,
};
use voxbridge::{answer, server};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("voxbridge=info,tower_http=warn")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Serve(serve_args) => {
            server::serve(Config::from_serve_args(&serve_args)).await
        }
        Commands::Speak(speak_args) => run_speak(speak_args).await,
        Commands::Ask(ask_args) => run_ask(ask_args).await,
    }
}

async fn run_speak(args: SpeakArgs) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            buf
        }
    };
    play_text(&text, &args.pipeline).await
}

async fn run_ask(args: AskArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let reply =
        answer::fetch_answer(&client, &args.answer_url, &args.user, args.message.as_deref())
            .await?;

    println!("{}", reply.message);
    if let Some(verse) = &reply.verse {
        println!("{verse}");
    }
    if let Some(reference) = &reply.reference {
        println!("{reference}");
    }

    if args.quiet {
        return Ok(());
    }
    play_text(&reply.spoken_text(), &args.pipeline).await
}

async fn play_text(text: &str, args: &PipelineArgs) -> Result<()> {
    let queue = PlaybackQueue::from_text(text, args.max_chunk);
    if queue.is_empty() {
        println!("Nothing to speak.");
        return Ok(());
    }

    let voice = VoiceConfig {
        voice_id: args.voice_id.clone(),
        model_id: args.model_id.clone(),
        optimize_streaming_latency: args.latency_hint.min(4),
        ..VoiceConfig::default()
    };

    let transport = HttpTransport::new(&args.relay_url)?;
    let fetcher: Arc<dyn AudioFetcher> = Arc::new(SpeechFetcher::new(transport));
    let player = build_player()?;
    let sequencer = Sequencer::new(
        fetcher,
        player,
        voice,
        Duration::from_millis(args.gap_ms),
    );
    sequencer.enqueue(queue).await;
    Ok(())
}

#[cfg(feature = "audio")]
fn build_player() -> Result<Arc<dyn Playback>> {
    Ok(Arc::new(voxbridge::speech::RodioPlayer::new()))
}

#[cfg(not(feature = "audio"))]
fn build_player() -> Result<Arc<dyn Playback>> {
    anyhow::bail!("this build has no audio output; rebuild with `--features audio`")
}
