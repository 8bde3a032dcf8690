//! Reply rendering: printed text or synthesized speech

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::audio::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Timeout for the best-effort telemetry report
const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(1);

/// Renders one reply to the user
///
/// Implementations contain their own failures: a `false` return means the
/// reply could not be rendered, and the loop carries on regardless.
#[async_trait]
pub trait Speaker: Send {
    /// Render the reply, returning whether it reached the user
    async fn render(&mut self, text: &str) -> bool;
}

/// Plays decoded reply audio
///
/// The seam between synthesis and the output device; the HTTP paths are
/// testable against simulated endpoints with a scripted sink here.
#[async_trait]
pub trait Play: Send + Sync {
    /// Play mono f32 samples to completion
    async fn play(&mut self, samples: Vec<f32>) -> Result<()>;
}

#[async_trait]
impl Play for AudioPlayback {
    async fn play(&mut self, samples: Vec<f32>) -> Result<()> {
        Self::play(self, samples).await
    }
}

/// Prints replies to stdout; always succeeds
pub struct TextSpeaker;

#[async_trait]
impl Speaker for TextSpeaker {
    async fn render(&mut self, text: &str) -> bool {
        println!("\nAI: {text}");
        true
    }
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    language_code: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// Speaks replies through ElevenLabs TTS and the local output device
pub struct SynthesizedSpeaker {
    client: reqwest::Client,
    telemetry: reqwest::Client,
    api_key: String,
    language: String,
    voice: VoiceConfig,
    playback: Box<dyn Play>,
}

impl SynthesizedSpeaker {
    /// Create a speaker playing through the default output device
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or no output device is usable
    pub fn new(api_key: String, language: String, voice: VoiceConfig) -> Result<Self> {
        Self::with_output(api_key, language, voice, Box::new(AudioPlayback::new()?))
    }

    /// Create a speaker with an explicit output sink
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn with_output(
        api_key: String,
        language: String,
        voice: VoiceConfig,
        playback: Box<dyn Play>,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for speech output".to_string(),
            ));
        }

        let telemetry = reqwest::Client::builder()
            .timeout(TELEMETRY_TIMEOUT)
            .build()
            .unwrap_or_default();

        Ok(Self {
            client: reqwest::Client::new(),
            telemetry,
            api_key,
            language,
            voice,
            playback,
        })
    }

    /// Request synthesized audio for the reply text
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the status is not success
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/{}",
            self.voice.tts_url.trim_end_matches('/'),
            self.voice.voice_id
        );

        let request = TtsRequest {
            text,
            model_id: &self.voice.tts_model,
            language_code: &self.language,
            voice_settings: VoiceSettings {
                stability: self.voice.stability,
                similarity_boost: self.voice.similarity_boost,
            },
        };

        tracing::debug!(url = %url, chars = text.len(), "requesting speech synthesis");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Report the synthesized clip's duration to the local telemetry sink
    ///
    /// Best-effort by design: failures are logged and swallowed, never
    /// propagated, so a dead sink cannot abort playback.
    async fn report_duration(&self, duration_ms: u64) {
        #[allow(clippy::cast_precision_loss)]
        let payload = serde_json::json!({
            "audio_length_ms": duration_ms,
            "audio_length_sec": duration_ms as f64 / 1000.0,
        });

        match self
            .telemetry
            .post(&self.voice.telemetry_url)
            .json(&payload)
            .send()
            .await
        {
            Ok(_) => {
                tracing::debug!(duration_ms, "reported synthesized clip length");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to send clip length");
            }
        }
    }

    async fn speak(&mut self, text: &str) -> Result<()> {
        let mp3 = self.synthesize(text).await?;
        let (samples, sample_rate) = decode_mp3(&mp3)?;

        if sample_rate != PLAYBACK_SAMPLE_RATE {
            tracing::warn!(
                decoded = sample_rate,
                output = PLAYBACK_SAMPLE_RATE,
                "decoded sample rate differs from the output stream rate; \
                 playback speed will be off"
            );
        }

        let duration_ms = samples.len() as u64 * 1000 / u64::from(sample_rate.max(1));
        self.report_duration(duration_ms).await;

        println!("Speaking...");
        self.playback.play(samples).await
    }
}

#[async_trait]
impl Speaker for SynthesizedSpeaker {
    async fn render(&mut self, text: &str) -> bool {
        println!("\nAI: {text}");
        match self.speak(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "speech rendering failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tts_request_wire_shape() {
        let request = TtsRequest {
            text: "salut",
            model_id: "eleven_turbo_v2_5",
            language_code: "ro",
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.5,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["text"], "salut");
        assert_eq!(value["model_id"], "eleven_turbo_v2_5");
        assert_eq!(value["language_code"], "ro");
        assert_eq!(value["voice_settings"]["stability"], 0.5);
        assert_eq!(value["voice_settings"]["similarity_boost"], 0.5);
    }
}
