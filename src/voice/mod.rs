//! Voice processing: PCM plumbing, gapless playback, microphone capture
//! and the live mentor session

mod capture;
mod live;
mod pcm;
mod playback;
mod session;

pub use capture::{AudioCapture, FRAME_SAMPLES};
pub use live::{GeminiLive, LiveConfig};
pub use pcm::{
    decode_frame, encode_frame, pcm16_to_samples, samples_to_pcm16, samples_to_wav,
    INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE,
};
pub use playback::{AudioPlayback, FrameScheduler, MentorAudioOut, ScheduledFrame};
pub use session::{LiveTransport, MentorSession, ServerEvent, SessionState};
