//! Scripted session loop tests
//!
//! Drives the full state machine with scripted stages, no audio hardware
//! or network required.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use talkback::audio::AudioClip;
use talkback::chat::ChatResult;
use talkback::session::{Complete, Record, SessionLoop, Transcribe};
use talkback::speak::Speaker;
use talkback::{Error, Result};

fn scripted_clip() -> AudioClip {
    AudioClip::from_samples(&[0.0f32; 1600], 16_000, Duration::from_millis(100))
        .expect("failed to write scripted clip")
}

/// Produces silent clips and counts how often it was asked
struct ScriptedMic {
    recordings: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Record for ScriptedMic {
    async fn record(&mut self) -> Result<AudioClip> {
        self.recordings.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Audio("microphone unavailable".to_string()));
        }
        Ok(scripted_clip())
    }
}

/// Returns a fixed transcript and remembers the clip's backing path
struct ScriptedEars {
    transcript: String,
    clip_path: Arc<Mutex<Option<PathBuf>>>,
}

#[async_trait]
impl Transcribe for ScriptedEars {
    async fn transcribe(&mut self, clip: AudioClip) -> Result<String> {
        *self.clip_path.lock().unwrap() = Some(clip.path().to_path_buf());
        Ok(self.transcript.clone())
    }
}

/// Returns a fixed ChatResult and checks the transcript it was given
struct ScriptedChat {
    expect_transcript: String,
    result: ChatResult,
}

#[async_trait]
impl Complete for ScriptedChat {
    async fn complete(&mut self, transcript: &str) -> ChatResult {
        assert_eq!(transcript, self.expect_transcript);
        self.result.clone()
    }
}

/// Records rendered texts; optionally simulates rendering failure
struct RecordingSpeaker {
    rendered: Arc<Mutex<Vec<String>>>,
    ok: bool,
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn render(&mut self, text: &str) -> bool {
        self.rendered.lock().unwrap().push(text.to_string());
        self.ok
    }
}

struct Harness {
    recordings: Arc<AtomicUsize>,
    rendered: Arc<Mutex<Vec<String>>>,
    clip_path: Arc<Mutex<Option<PathBuf>>>,
}

fn scripted_loop(
    transcript: &str,
    result: ChatResult,
    mic_fails: bool,
    speaker_ok: bool,
) -> (
    SessionLoop<ScriptedMic, ScriptedEars, ScriptedChat>,
    Harness,
) {
    let harness = Harness {
        recordings: Arc::new(AtomicUsize::new(0)),
        rendered: Arc::new(Mutex::new(Vec::new())),
        clip_path: Arc::new(Mutex::new(None)),
    };

    let session = SessionLoop::new(
        ScriptedMic {
            recordings: Arc::clone(&harness.recordings),
            fail: mic_fails,
        },
        ScriptedEars {
            transcript: transcript.to_string(),
            clip_path: Arc::clone(&harness.clip_path),
        },
        ScriptedChat {
            expect_transcript: transcript.to_string(),
            result,
        },
        Box::new(RecordingSpeaker {
            rendered: Arc::clone(&harness.rendered),
            ok: speaker_ok,
        }),
        "exit".to_string(),
        Duration::from_millis(0),
    );

    (session, harness)
}

#[tokio::test]
async fn exit_reply_terminates_within_one_iteration() {
    let (mut session, harness) = scripted_loop(
        "exit please",
        ChatResult::Reply("Okay, Exiting program. Goodbye!".to_string()),
        false,
        true,
    );

    assert!(session.utterance().await, "loop should terminate");
    assert_eq!(harness.recordings.load(Ordering::SeqCst), 1);

    let rendered = harness.rendered.lock().unwrap();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].to_lowercase().contains("exit"));
}

#[tokio::test]
async fn clip_backing_file_is_released_within_the_iteration() {
    let (mut session, harness) = scripted_loop(
        "salut",
        ChatResult::Reply("Salut!".to_string()),
        false,
        true,
    );

    assert!(!session.utterance().await);

    let path = harness
        .clip_path
        .lock()
        .unwrap()
        .clone()
        .expect("transcriber never saw a clip");
    assert!(!path.exists(), "clip file leaked past the iteration");
}

#[tokio::test]
async fn chat_failure_is_rendered_as_error_message() {
    let (mut session, harness) = scripted_loop(
        "salut",
        ChatResult::Failure("chat request failed: connection refused".to_string()),
        false,
        true,
    );

    assert!(!session.utterance().await, "failure must not terminate");

    let rendered = harness.rendered.lock().unwrap();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].starts_with("Error:"));
    assert!(rendered[0].contains("connection refused"));
}

#[tokio::test]
async fn speaker_failure_does_not_stop_the_loop() {
    let (mut session, harness) = scripted_loop(
        "salut",
        ChatResult::Reply("Salut!".to_string()),
        false,
        false, // every render fails
    );

    assert!(!session.utterance().await);
    // the next iteration records again despite the rendering failure
    assert!(!session.utterance().await);
    assert_eq!(harness.recordings.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_transcript_still_reaches_the_endpoint() {
    let (mut session, harness) =
        scripted_loop("", ChatResult::Reply("Nu am auzit nimic.".to_string()), false, true);

    assert!(!session.utterance().await);
    // ScriptedChat asserted it was called with the empty transcript
    assert_eq!(harness.rendered.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn device_error_is_contained_and_loop_recovers() {
    let (mut session, harness) = scripted_loop(
        "unused",
        ChatResult::Reply("unused".to_string()),
        true, // recording always fails
        true,
    );

    assert!(!session.utterance().await, "device error must not terminate");
    assert!(!session.utterance().await);
    assert_eq!(harness.recordings.load(Ordering::SeqCst), 2);
    // nothing was rendered for the abandoned iterations
    assert!(harness.rendered.lock().unwrap().is_empty());
}
