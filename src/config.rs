//! Configuration for the talkback loop
//!
//! All fields default to the values of the original deployment, so the
//! binary runs with no config file at all. An optional `talkback.toml`
//! overrides any subset of them.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::audio::DEFAULT_SAMPLE_RATE;

/// Default chat completion endpoint
pub const DEFAULT_CHAT_URL: &str = "https://ai.hackclub.com/chat/completions";

/// Default ElevenLabs text-to-speech endpoint (voice id is appended)
pub const DEFAULT_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// System-role instruction sent with every chat request
const DEFAULT_PERSONA: &str = "Răspunde ca un coș de gunoi sarcastic și amuzant, \
jignind in gluma pe cel cu care vorbești, dar într-un mod glumeț, folosind maximum \
2-3 propoziții. Raspunsurile trebuie sa fie total stupide si pe langa, sa nu aiba \
nicio legatura cu viata reala";

/// Config file name looked up in the working directory
const CONFIG_FILE: &str = "talkback.toml";

/// Talkback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of each recorded clip in seconds
    pub duration_secs: u64,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Whisper model size tag ("tiny", "base", "small", ...)
    pub model_size: String,

    /// Directory holding `ggml-<size>.bin` model files
    pub model_dir: PathBuf,

    /// Transcription and synthesis language code
    pub language: String,

    /// System-role persona instruction for the chat endpoint
    pub persona: String,

    /// Chat completion endpoint URL
    pub chat_url: String,

    /// Reply substring that terminates the loop (matched case-insensitively)
    pub exit_keyword: String,

    /// Pause between iterations in seconds
    pub pause_secs: u64,

    /// Speech synthesis configuration
    pub voice: VoiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_secs: 5,
            sample_rate: DEFAULT_SAMPLE_RATE,
            model_size: "small".to_string(),
            model_dir: PathBuf::from("models"),
            language: "ro".to_string(),
            persona: DEFAULT_PERSONA.to_string(),
            chat_url: DEFAULT_CHAT_URL.to_string(),
            exit_keyword: "exit".to_string(),
            pause_secs: 1,
            voice: VoiceConfig::default(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// ElevenLabs voice identity
    pub voice_id: String,

    /// ElevenLabs model identity
    pub tts_model: String,

    /// Voice stability parameter
    pub stability: f32,

    /// Voice similarity boost parameter
    pub similarity_boost: f32,

    /// Text-to-speech endpoint base URL (voice id is appended)
    pub tts_url: String,

    /// Local sink for best-effort clip-duration reports
    pub telemetry_url: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            tts_model: "eleven_turbo_v2_5".to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
            tts_url: DEFAULT_TTS_URL.to_string(),
            telemetry_url: "http://192.168.10.47".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or defaults when none exists
    ///
    /// An explicit path must exist; the implicit `talkback.toml` lookup
    /// falls back to defaults silently.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let implicit = PathBuf::from(CONFIG_FILE);
                if !implicit.exists() {
                    return Ok(Self::default());
                }
                implicit
            }
        };

        let raw = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}
