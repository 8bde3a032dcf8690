//! Transient recorded audio resource

use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::Result;

/// One recorded utterance, backed by a uniquely named temporary WAV file
///
/// The backing file lives exactly as long as the clip value: dropping the
/// clip removes the file on every exit path, so no recording leaks across
/// iterations.
pub struct AudioClip {
    file: NamedTempFile,
    sample_rate: u32,
    duration: Duration,
}

impl AudioClip {
    /// Serialize mono f32 samples into a fresh temporary WAV file
    ///
    /// The container is written as 16-bit signed PCM at the given rate.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or WAV encoding fails
    pub fn from_samples(samples: &[f32], sample_rate: u32, duration: Duration) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("talkback-")
            .suffix(".wav")
            .tempfile()?;

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(file.path(), spec)?;
        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(sample_i16)?;
        }
        writer.finalize()?;

        tracing::debug!(
            path = %file.path().display(),
            samples = samples.len(),
            sample_rate,
            "clip written"
        );

        Ok(Self {
            file,
            sample_rate,
            duration,
        })
    }

    /// Path of the backing WAV file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Capture sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Nominal duration of the recording
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Decode the backing WAV back into mono f32 samples
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or is not valid WAV
    pub fn read_samples(&self) -> Result<Vec<f32>> {
        let mut reader = hound::WavReader::open(self.file.path())?;
        let samples = reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(samples)
    }
}
