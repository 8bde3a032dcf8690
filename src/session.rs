//! The conversational session loop
//!
//! Drives one utterance at a time through a fixed state machine:
//! record, transcribe, request, render, check for the exit keyword. Stage
//! failures are contained per iteration; only the exit keyword or an
//! interrupt terminates the loop.

use std::time::Duration;

use async_trait::async_trait;

use crate::audio::{AudioCapture, AudioClip};
use crate::chat::{ChatClient, ChatResult};
use crate::speak::Speaker;
use crate::stt::Transcriber;
use crate::Result;

/// Records one utterance worth of audio
#[async_trait]
pub trait Record: Send {
    /// Capture a clip from the input device
    async fn record(&mut self) -> Result<AudioClip>;
}

/// Turns a recorded clip into text, consuming the clip
#[async_trait]
pub trait Transcribe: Send {
    /// Produce the best-effort text hypothesis (possibly empty)
    async fn transcribe(&mut self, clip: AudioClip) -> Result<String>;
}

/// Produces a chat reply, or a contained failure, for one transcript
#[async_trait]
pub trait Complete: Send {
    /// Request a completion; failures come back as data
    async fn complete(&mut self, transcript: &str) -> ChatResult;
}

#[async_trait]
impl Record for AudioCapture {
    async fn record(&mut self) -> Result<AudioClip> {
        Self::record(self)
    }
}

#[async_trait]
impl Transcribe for Transcriber {
    async fn transcribe(&mut self, clip: AudioClip) -> Result<String> {
        Self::transcribe(self, clip)
    }
}

#[async_trait]
impl Complete for ChatClient {
    async fn complete(&mut self, transcript: &str) -> ChatResult {
        Self::complete(self, transcript).await
    }
}

/// One position in the per-utterance state machine
///
/// Intermediate artifacts travel as state payloads, so nothing outlives
/// the iteration that created it.
pub enum LoopState {
    /// Between iterations
    Idle,
    /// Capturing the next clip
    Recording,
    /// Clip ready, running inference
    Transcribing(AudioClip),
    /// Transcript ready (possibly empty), calling the chat endpoint
    Requesting(String),
    /// Reply or failure ready, rendering it
    Rendering(ChatResult),
    /// Rendered text ready, looking for the exit keyword
    CheckExit(String),
    /// Exit keyword observed
    Terminated,
}

impl LoopState {
    /// State name for logging
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Transcribing(_) => "transcribing",
            Self::Requesting(_) => "requesting",
            Self::Rendering(_) => "rendering",
            Self::CheckExit(_) => "check-exit",
            Self::Terminated => "terminated",
        }
    }
}

/// True when the lowercase form of the reply contains the exit keyword
#[must_use]
pub fn contains_exit_keyword(reply: &str, keyword: &str) -> bool {
    reply.to_lowercase().contains(&keyword.to_lowercase())
}

/// The orchestrator: record, transcribe, request, render, repeat
pub struct SessionLoop<R, T, C> {
    recorder: R,
    transcriber: T,
    chat: C,
    speaker: Box<dyn Speaker>,
    exit_keyword: String,
    pause: Duration,
}

impl<R: Record, T: Transcribe, C: Complete> SessionLoop<R, T, C> {
    /// Assemble a loop from its four stages
    pub fn new(
        recorder: R,
        transcriber: T,
        chat: C,
        speaker: Box<dyn Speaker>,
        exit_keyword: String,
        pause: Duration,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            chat,
            speaker,
            exit_keyword,
            pause,
        }
    }

    /// Perform exactly one state transition
    async fn advance(&mut self, state: LoopState) -> Result<LoopState> {
        tracing::debug!(state = state.name(), "advancing");

        Ok(match state {
            LoopState::Idle => LoopState::Recording,

            LoopState::Recording => LoopState::Transcribing(self.recorder.record().await?),

            LoopState::Transcribing(clip) => {
                let transcript = self.transcriber.transcribe(clip).await?;
                println!("You said: {transcript}");
                // an empty transcript still goes to the endpoint
                LoopState::Requesting(transcript)
            }

            LoopState::Requesting(transcript) => {
                println!("Getting response...");
                LoopState::Rendering(self.chat.complete(&transcript).await)
            }

            LoopState::Rendering(result) => {
                let text = match result {
                    ChatResult::Reply(reply) => reply,
                    // a failed call is narrated, never silently dropped
                    ChatResult::Failure(desc) => format!("Error: {desc}"),
                };
                if !self.speaker.render(&text).await {
                    tracing::warn!("speaker failed to render reply");
                }
                LoopState::CheckExit(text)
            }

            LoopState::CheckExit(text) => {
                if contains_exit_keyword(&text, &self.exit_keyword) {
                    LoopState::Terminated
                } else {
                    LoopState::Idle
                }
            }

            LoopState::Terminated => LoopState::Terminated,
        })
    }

    /// Drive one full utterance from recording to exit check
    ///
    /// Returns true when the loop should terminate. A stage error abandons
    /// the iteration: it is logged, narrated, and the loop goes back to
    /// listening.
    pub async fn utterance(&mut self) -> bool {
        let mut state = LoopState::Recording;
        loop {
            match self.advance(state).await {
                Ok(LoopState::Terminated) => return true,
                Ok(LoopState::Idle) => return false,
                Ok(next) => state = next,
                Err(e) => {
                    tracing::error!(error = %e, "utterance abandoned");
                    println!("An error occurred: {e}");
                    return false;
                }
            }
        }
    }

    /// Run utterances until the exit keyword or ctrl-c
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for fatal setup
    /// failures surfaced by future stages
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("\nProgram interrupted by user. Exiting...");
                    return Ok(());
                }
                done = self.utterance() => {
                    if done {
                        println!("Exiting program. Goodbye!");
                        return Ok(());
                    }
                    tokio::time::sleep(self.pause).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_keyword_is_case_insensitive_substring() {
        assert!(contains_exit_keyword("Exiting program", "exit"));
        assert!(contains_exit_keyword("EXIT", "exit"));
        assert!(contains_exit_keyword("please exit now", "exit"));
        assert!(contains_exit_keyword("exit", "EXIT"));
        assert!(!contains_exit_keyword("Hello there", "exit"));
        assert!(!contains_exit_keyword("", "exit"));
    }

    #[test]
    fn state_names_are_stable() {
        assert_eq!(LoopState::Idle.name(), "idle");
        assert_eq!(LoopState::Recording.name(), "recording");
        assert_eq!(LoopState::Terminated.name(), "terminated");
        assert_eq!(
            LoopState::Requesting(String::new()).name(),
            "requesting"
        );
    }
}
