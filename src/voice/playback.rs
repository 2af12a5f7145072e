//! Gapless streaming playback
//!
//! `FrameScheduler` is the pure core: a monotonically advancing cursor
//! places each arriving frame at `max(cursor, now)` so frames play back to
//! back with no gap and no overlap, and an interrupt drops the whole
//! timeline. `AudioPlayback` wires the scheduler to a cpal output stream
//! through a shared sample queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::pcm::OUTPUT_SAMPLE_RATE;
use crate::{Error, Result};

/// A frame currently scheduled or playing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledFrame {
    pub id: u64,
    pub start: f64,
    pub duration: f64,
}

/// Pure playback scheduler: monotonic cursor plus the live set of
/// in-flight frames
#[derive(Debug, Default)]
pub struct FrameScheduler {
    cursor: Option<f64>,
    live: Vec<ScheduledFrame>,
    next_id: u64,
}

impl FrameScheduler {
    /// Create an empty scheduler with an unset cursor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a frame of `duration` seconds against the output clock
    /// reading `now`. Starts immediately on underrun or first frame,
    /// otherwise immediately after the previously scheduled frame.
    pub fn schedule(&mut self, duration: f64, now: f64) -> ScheduledFrame {
        let start = match self.cursor {
            Some(cursor) => cursor.max(now),
            None => now,
        };
        self.cursor = Some(start + duration);

        let frame = ScheduledFrame {
            id: self.next_id,
            start,
            duration,
        };
        self.next_id += 1;
        self.live.push(frame);
        frame
    }

    /// Remove a frame from the live set on its natural completion
    pub fn complete(&mut self, id: u64) {
        self.live.retain(|f| f.id != id);
    }

    /// Remove every frame whose scheduled end has passed
    pub fn complete_elapsed(&mut self, now: f64) {
        self.live.retain(|f| f.start + f.duration > now);
    }

    /// Hard interrupt: drop every live frame and reset the cursor so the
    /// next frame starts fresh. Safe to call when nothing is playing.
    /// Returns the ids that were stopped.
    pub fn interrupt(&mut self) -> Vec<u64> {
        self.cursor = None;
        self.live.drain(..).map(|f| f.id).collect()
    }

    /// Number of frames currently scheduled or playing
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// True when nothing is scheduled and the cursor is unset
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.live.is_empty() && self.cursor.is_none()
    }

    /// Current cursor position, if set
    #[must_use]
    pub fn cursor(&self) -> Option<f64> {
        self.cursor
    }
}

/// Playback operations the mentor session needs; implemented by the cpal
/// sink and by test fakes
pub trait MentorAudioOut {
    /// Queue one decoded frame for gapless playback
    fn play_frame(&mut self, samples: &[f32]);

    /// Stop everything scheduled and reset the timeline
    fn interrupt(&mut self);

    /// Stop playback and release the output device; repeated calls are
    /// no-ops
    fn teardown(&mut self);
}

struct SinkShared {
    queue: VecDeque<f32>,
    consumed: u64,
}

/// cpal-backed playback sink; the output callback drains a shared sample
/// queue and plays silence on underrun
pub struct AudioPlayback {
    shared: Arc<Mutex<SinkShared>>,
    scheduler: Arc<Mutex<FrameScheduler>>,
    stream: Option<Stream>,
}

impl AudioPlayback {
    /// Open the default output device at the model's output rate and start
    /// the stream
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device or config exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(OUTPUT_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(OUTPUT_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: stereo output, samples duplicated per channel
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(OUTPUT_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(OUTPUT_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(OUTPUT_SAMPLE_RATE))
            .config();
        let channels = config.channels as usize;

        let shared = Arc::new(Mutex::new(SinkShared {
            queue: VecDeque::new(),
            consumed: 0,
        }));
        let scheduler = Arc::new(Mutex::new(FrameScheduler::new()));

        let cb_shared = Arc::clone(&shared);
        let cb_scheduler = Arc::clone(&scheduler);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut shared) = cb_shared.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let sample = shared.queue.pop_front().unwrap_or(0.0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                        shared.consumed += 1;
                    }
                    let now = clock_secs(shared.consumed);
                    drop(shared);

                    if let Ok(mut scheduler) = cb_scheduler.lock() {
                        scheduler.complete_elapsed(now);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = OUTPUT_SAMPLE_RATE,
            channels,
            "audio playback initialized"
        );

        Ok(Self {
            shared,
            scheduler,
            stream: Some(stream),
        })
    }

    /// True when the live set is empty and the queue has drained
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let queue_empty = self.shared.lock().map(|s| s.queue.is_empty()).unwrap_or(true);
        let live_empty = self.scheduler.lock().map(|s| s.live_count() == 0).unwrap_or(true);
        queue_empty && live_empty
    }

    /// Block until the queue drains (used by the one-shot answer podcast)
    pub fn drain_blocking(&self) {
        loop {
            if self.is_idle() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        // Let the device flush its last buffer
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
}

#[allow(clippy::cast_precision_loss)]
fn clock_secs(samples: u64) -> f64 {
    samples as f64 / f64::from(OUTPUT_SAMPLE_RATE)
}

impl MentorAudioOut for AudioPlayback {
    fn play_frame(&mut self, samples: &[f32]) {
        let Ok(mut shared) = self.shared.lock() else {
            return;
        };
        let now = clock_secs(shared.consumed);
        shared.queue.extend(samples.iter().copied());
        drop(shared);

        #[allow(clippy::cast_precision_loss)]
        let duration = samples.len() as f64 / f64::from(OUTPUT_SAMPLE_RATE);
        if let Ok(mut scheduler) = self.scheduler.lock() {
            let frame = scheduler.schedule(duration, now);
            tracing::trace!(id = frame.id, start = frame.start, duration, "frame scheduled");
        }
    }

    fn interrupt(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.queue.clear();
        }
        if let Ok(mut scheduler) = self.scheduler.lock() {
            let stopped = scheduler.interrupt();
            if !stopped.is_empty() {
                tracing::debug!(count = stopped.len(), "playback interrupted");
            }
        }
    }

    fn teardown(&mut self) {
        self.interrupt();
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio playback released");
        }
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        self.teardown();
    }
}
