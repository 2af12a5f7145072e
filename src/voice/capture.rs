//! Microphone capture for the live mentor session
//!
//! Capture runs on the audio hardware clock and hands off fixed-size
//! frames through a bounded channel. Capture never waits on the network:
//! if the session falls behind, frames are dropped with a log line.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use tokio::sync::mpsc;

use super::pcm::INPUT_SAMPLE_RATE;
use crate::{Error, Result};

/// Samples per realtime input unit
pub const FRAME_SAMPLES: usize = 4096;

/// Captures microphone audio into fixed-size frames
pub struct AudioCapture {
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device at the speech input rate
    ///
    /// # Errors
    ///
    /// Returns a media error if no input device or config is available
    /// (treated as permission denied / no device by callers)
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Media("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Media(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(INPUT_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(INPUT_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Media("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(INPUT_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = INPUT_SAMPLE_RATE,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            stream: None,
        })
    }

    /// Start capturing; complete frames are pushed into `frames`
    ///
    /// # Errors
    ///
    /// Returns a media error if the input stream cannot be built
    pub fn start(&mut self, frames: mpsc::Sender<Vec<f32>>) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Media("no input device".to_string()))?;

        let pending = Arc::new(Mutex::new(Vec::with_capacity(FRAME_SAMPLES)));
        let config = self.config.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let Ok(mut buf) = pending.lock() else { return };
                    buf.extend_from_slice(data);
                    while buf.len() >= FRAME_SAMPLES {
                        let frame: Vec<f32> = buf.drain(..FRAME_SAMPLES).collect();
                        // Fire-and-forget: never block the hardware callback
                        if frames.try_send(frame).is_err() {
                            tracing::warn!("capture frame dropped, session lagging");
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Media(e.to_string()))?;

        stream.play().map_err(|e| Error::Media(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing; repeated calls are no-ops
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
