//! Speech-to-text via a locally loaded Whisper model

use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::AudioClip;
use crate::{Error, Result};

/// Transcribes recorded clips with whisper.cpp
///
/// The model is identified by a size tag ("tiny", "base", "small", ...)
/// resolved to `ggml-<size>.bin` under the model directory. The context is
/// loaded on first use and reused for the life of the transcriber.
pub struct Transcriber {
    model_dir: PathBuf,
    model_size: String,
    language: String,
    ctx: Option<WhisperContext>,
}

impl Transcriber {
    /// Create a transcriber for a fixed model size and target language
    #[must_use]
    pub fn new(model_dir: &Path, model_size: &str, language: &str) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            model_size: model_size.to_string(),
            language: language.to_string(),
            ctx: None,
        }
    }

    fn model_path(&self) -> PathBuf {
        self.model_dir.join(format!("ggml-{}.bin", self.model_size))
    }

    fn context(&mut self) -> Result<&WhisperContext> {
        if self.ctx.is_none() {
            let path = self.model_path();
            if !path.exists() {
                return Err(Error::Stt(format!(
                    "model file not found: {} (download a ggml whisper model for size '{}')",
                    path.display(),
                    self.model_size
                )));
            }

            tracing::info!(size = %self.model_size, path = %path.display(), "loading whisper model");

            let path_str = path
                .to_str()
                .ok_or_else(|| Error::Stt(format!("invalid model path: {}", path.display())))?;
            let ctx =
                WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
                    .map_err(|e| Error::Stt(format!("failed to load model: {e:?}")))?;
            self.ctx = Some(ctx);
        }

        self.ctx
            .as_ref()
            .ok_or_else(|| Error::Stt("model context unavailable".to_string()))
    }

    /// Transcribe one clip, consuming it
    ///
    /// Inference runs greedy sampling in the fixed target language; no
    /// auto-detection, no translation. An empty string is a valid result
    /// when no speech is present. Taking the clip by value means its
    /// backing file is deleted on every path out of this function, whether
    /// inference succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns error if the model cannot be loaded, the clip cannot be
    /// read back, or inference fails
    pub fn transcribe(&mut self, clip: AudioClip) -> Result<String> {
        let samples = clip.read_samples()?;
        let language = self.language.clone();
        let ctx = self.context()?;

        let mut state = ctx
            .create_state()
            .map_err(|e| Error::Stt(format!("failed to create whisper state: {e:?}")))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&language));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| Error::Stt(format!("inference failed: {e:?}")))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| Error::Stt(format!("failed to read segments: {e:?}")))?;

        let mut text = String::new();
        for i in 0..num_segments {
            match state.full_get_segment_text(i) {
                Ok(piece) => text.push_str(&piece),
                Err(e) => tracing::warn!(segment = i, error = ?e, "unreadable segment skipped"),
            }
        }

        let text = text.trim().to_string();
        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}
