//! Audio capture from microphone

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};

use crate::audio::AudioClip;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Samples requested from the device per read block
const BLOCK_SIZE: u32 = 1024;

/// Poll interval while waiting for the buffer to fill
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Records fixed-duration clips from the default input device
pub struct AudioCapture {
    duration: Duration,
    sample_rate: u32,
}

impl AudioCapture {
    /// Create a capture instance for clips of the given length
    #[must_use]
    pub const fn new(duration: Duration, sample_rate: u32) -> Self {
        Self {
            duration,
            sample_rate,
        }
    }

    /// Record one clip and serialize it to a transient WAV file
    ///
    /// Blocks until a full clip's worth of samples is collected. The input
    /// stream is a local value, so the device handle is released on every
    /// path out of this function, including capture errors.
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened, does not support
    /// the requested format, or stops delivering samples
    pub fn record(&mut self) -> Result<AudioClip> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(self.sample_rate)
                    && c.max_sample_rate() >= SampleRate(self.sample_rate)
            })
            .ok_or_else(|| {
                Error::Audio(format!(
                    "input device does not support mono {} Hz",
                    self.sample_rate
                ))
            })?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(self.sample_rate),
            buffer_size: BufferSize::Fixed(BLOCK_SIZE),
        };

        #[allow(clippy::cast_possible_truncation)]
        let wanted = (self.duration.as_secs_f64() * f64::from(self.sample_rate)) as usize;

        let buffer = Arc::new(Mutex::new(Vec::<f32>::with_capacity(wanted)));
        let sink = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = self.sample_rate,
            wanted,
            "recording"
        );
        println!("Listening for {} seconds...", self.duration.as_secs());

        // The device owes us `wanted` samples within the clip duration; a
        // stalled stream fails the iteration instead of hanging it.
        let deadline = Instant::now() + self.duration + Duration::from_secs(2);
        loop {
            let collected = buffer.lock().map(|b| b.len()).unwrap_or(0);
            if collected >= wanted {
                break;
            }
            if Instant::now() > deadline {
                return Err(Error::Audio("capture timed out".to_string()));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        // Stop and release the device before touching the filesystem
        drop(stream);

        println!("Processing...");

        let mut samples = buffer
            .lock()
            .map(|mut b| std::mem::take(&mut *b))
            .unwrap_or_default();
        samples.truncate(wanted);

        AudioClip::from_samples(&samples, self.sample_rate, self.duration)
    }
}
