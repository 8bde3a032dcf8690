//! Synthesized speaker tests against simulated HTTP endpoints
//!
//! No audio hardware involved: the output device is a scripted sink, and
//! the synthesized body is junk the MP3 decoder skips, so only the HTTP
//! behavior is under test.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockito::{Matcher, Server};

use talkback::Result;
use talkback::config::VoiceConfig;
use talkback::speak::{Play, Speaker, SynthesizedSpeaker};

/// Records the length of every buffer it is asked to play
struct ScriptedSink {
    played: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl Play for ScriptedSink {
    async fn play(&mut self, samples: Vec<f32>) -> Result<()> {
        self.played.lock().unwrap().push(samples.len());
        Ok(())
    }
}

fn scripted_speaker(
    tts_url: &str,
    telemetry_url: &str,
) -> (SynthesizedSpeaker, Arc<Mutex<Vec<usize>>>) {
    let played = Arc::new(Mutex::new(Vec::new()));
    let voice = VoiceConfig {
        tts_url: tts_url.to_string(),
        telemetry_url: telemetry_url.to_string(),
        ..VoiceConfig::default()
    };

    let speaker = SynthesizedSpeaker::with_output(
        "test-key".to_string(),
        "ro".to_string(),
        voice,
        Box::new(ScriptedSink {
            played: Arc::clone(&played),
        }),
    )
    .expect("speaker construction failed");

    (speaker, played)
}

// port 9 (discard) refuses connections immediately
const DEAD_SINK: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn tts_server_error_renders_false() {
    let mut server = Server::new_async().await;
    let tts = server
        .mock("POST", "/pNInz6obpgDQGcFmaJgB")
        .with_status(500)
        .with_body("quota exceeded")
        .create_async()
        .await;

    let (mut speaker, played) = scripted_speaker(&server.url(), DEAD_SINK);

    assert!(
        !speaker.render("salut").await,
        "a failed synthesis must render false, not propagate"
    );
    assert!(
        played.lock().unwrap().is_empty(),
        "nothing should reach the output device"
    );
    tts.assert_async().await;
}

#[tokio::test]
async fn dead_telemetry_sink_does_not_abort_speech() {
    let mut server = Server::new_async().await;
    let tts = server
        .mock("POST", "/pNInz6obpgDQGcFmaJgB")
        .match_header("xi-api-key", "test-key")
        .with_status(200)
        .with_body("not an mpeg stream")
        .create_async()
        .await;

    let (mut speaker, played) = scripted_speaker(&server.url(), DEAD_SINK);

    assert!(
        speaker.render("salut").await,
        "an unreachable telemetry sink must not fail rendering"
    );
    assert_eq!(played.lock().unwrap().len(), 1, "playback still happens");
    tts.assert_async().await;
}

#[tokio::test]
async fn duration_report_carries_clip_length() {
    let mut server = Server::new_async().await;
    let tts = server
        .mock("POST", "/pNInz6obpgDQGcFmaJgB")
        .with_status(200)
        .with_body("not an mpeg stream")
        .create_async()
        .await;
    // the junk body decodes to zero samples, so zero length is reported
    let telemetry = server
        .mock("POST", "/")
        .match_body(Matcher::Json(serde_json::json!({
            "audio_length_ms": 0,
            "audio_length_sec": 0.0,
        })))
        .with_status(200)
        .create_async()
        .await;

    let (mut speaker, _played) = scripted_speaker(&server.url(), &server.url());

    assert!(speaker.render("salut").await);
    tts.assert_async().await;
    telemetry.assert_async().await;
}

#[test]
fn empty_api_key_is_rejected() {
    let result = SynthesizedSpeaker::with_output(
        String::new(),
        "ro".to_string(),
        VoiceConfig::default(),
        Box::new(ScriptedSink {
            played: Arc::new(Mutex::new(Vec::new())),
        }),
    );
    assert!(result.is_err());
}
