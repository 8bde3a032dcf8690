use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkback::audio::{AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE};
use talkback::speak::{Speaker, SynthesizedSpeaker, TextSpeaker};
use talkback::{ChatClient, Config, SessionLoop, Transcriber};

/// Talkback - voice-driven AI assistant loop
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Path to a talkback.toml config file
    #[arg(short, long, env = "TALKBACK_CONFIG")]
    config: Option<PathBuf>,

    /// Speak replies with ElevenLabs instead of printing them
    #[arg(long, env = "TALKBACK_SPEAK")]
    speak: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "3")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,talkback=info",
        1 => "info,talkback=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(&config, duration),
            Command::TestSpeaker => test_speaker().await,
        };
    }

    // The speech path needs credentials before the first iteration; a
    // missing key stops here with guidance instead of failing per reply.
    let speaker: Box<dyn Speaker> = if cli.speak {
        let api_key = resolve_api_key()?;
        Box::new(SynthesizedSpeaker::new(
            api_key,
            config.language.clone(),
            config.voice.clone(),
        )?)
    } else {
        Box::new(TextSpeaker)
    };

    println!("Voice-Activated AI Assistant");
    println!("Say '{}' to quit the program", config.exit_keyword);
    println!("==============================");

    let capture = AudioCapture::new(
        Duration::from_secs(config.duration_secs),
        config.sample_rate,
    );
    let transcriber = Transcriber::new(&config.model_dir, &config.model_size, &config.language);
    let chat = ChatClient::new(config.chat_url.clone(), config.persona.clone());

    SessionLoop::new(
        capture,
        transcriber,
        chat,
        speaker,
        config.exit_keyword,
        Duration::from_secs(config.pause_secs),
    )
    .run()
    .await?;

    Ok(())
}

/// ElevenLabs API key from the environment, with an interactive fallback
fn resolve_api_key() -> anyhow::Result<String> {
    if let Ok(key) = std::env::var("ELEVENLABS_API_KEY") {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    println!("ELEVENLABS_API_KEY environment variable not found.");
    println!("Set your ElevenLabs API key with:");
    println!("  export ELEVENLABS_API_KEY='your-api-key'");

    let key: String = dialoguer::Input::new()
        .with_prompt("Or enter your ElevenLabs API key now")
        .allow_empty(true)
        .interact_text()?;

    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("no ElevenLabs API key provided");
    }
    Ok(key.to_string())
}

/// Record a short clip and report its peak level
fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Recording {duration}s from the default input device...");

    let mut capture = AudioCapture::new(Duration::from_secs(duration), config.sample_rate);
    let clip = capture.record()?;
    let samples = clip.read_samples()?;

    let peak = samples.iter().fold(0.0f32, |max, s| max.max(s.abs()));
    println!("Captured {} samples, peak amplitude {peak:.3}", samples.len());

    println!("\n---");
    if peak < 0.01 {
        println!("Peak is very low - check your microphone input level.");
    } else {
        println!("Microphone looks good!");
    }

    Ok(())
}

/// Play a one-second 440 Hz tone
async fn test_speaker() -> anyhow::Result<()> {
    let mut playback = AudioPlayback::new()?;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..PLAYBACK_SAMPLE_RATE)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    println!("Playing a 440 Hz tone...");
    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}
