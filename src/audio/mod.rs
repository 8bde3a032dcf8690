//! Audio capture, transient clips, and playback
//!
//! One [`AudioClip`] is live at a time: recorded by [`AudioCapture`],
//! consumed (and deleted) by the transcription stage.

mod capture;
mod clip;
mod playback;

pub use capture::{AudioCapture, DEFAULT_SAMPLE_RATE};
pub use clip::AudioClip;
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
