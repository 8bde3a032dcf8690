//! Talkback - voice-driven conversational assistant loop
//!
//! One utterance at a time, fully synchronous:
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌────────────┐   ┌───────────┐
//! │ AudioCapture│──▶│ Transcriber │──▶│ ChatClient │──▶│  Speaker  │
//! │  (cpal/wav) │   │ (whisper)   │   │  (HTTP)    │   │ text/TTS  │
//! └────────────┘   └─────────────┘   └────────────┘   └───────────┘
//!         ▲                                                 │
//!         └──────────────── SessionLoop ◀───────────────────┘
//! ```
//!
//! The session loop owns sequencing and error containment: a failed stage
//! abandons the iteration and the loop keeps listening. Only the exit
//! keyword in a reply, or an interrupt, terminates the process.

pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod session;
pub mod speak;
pub mod stt;

pub use audio::{AudioCapture, AudioClip, AudioPlayback};
pub use chat::{ChatClient, ChatResult};
pub use config::{Config, VoiceConfig};
pub use error::{Error, Result};
pub use session::{LoopState, SessionLoop, contains_exit_keyword};
pub use speak::{Play, Speaker, SynthesizedSpeaker, TextSpeaker};
pub use stt::Transcriber;
