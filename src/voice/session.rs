//! Live mentor session state machine
//!
//! `Idle → Connecting → Active → (Closed | Errored)`. Transport callbacks
//! are flattened into an event stream consumed by a single loop, so shared
//! playback state is only ever touched from one place. Teardown runs
//! exactly once no matter which path triggers it.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Duration;

use super::pcm::{decode_frame, encode_frame};
use super::playback::MentorAudioOut;
use crate::{Error, Result};

/// How long the session may sit in `Connecting` before giving up
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Session lifecycle states; `Closed` and `Errored` are terminal and both
/// guarantee full resource release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closed,
    Errored,
}

/// Events arriving from the remote voice endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Session establishment confirmed
    Opened,
    /// One base64 PCM audio frame of model speech
    Audio(String),
    /// The remote party started speaking; cancel queued output
    Interrupted,
    /// Remote-initiated close
    Closed,
    /// Transport failure
    TransportError(String),
}

/// Bidirectional live session transport
#[async_trait]
pub trait LiveTransport: Send {
    /// Send one base64 PCM realtime input unit; fire-and-forget relative
    /// to capture
    async fn send_realtime_input(&mut self, base64_frame: String) -> Result<()>;

    /// Next event from the remote endpoint; `None` when the stream ended
    async fn next_event(&mut self) -> Option<ServerEvent>;

    /// Close the remote session handle; already-closed errors are ignored
    async fn close(&mut self);
}

/// The live mentor session: owns the transport and the playback sink
pub struct MentorSession<T: LiveTransport, A: MentorAudioOut> {
    transport: T,
    audio: A,
    state: SessionState,
    torn_down: bool,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl<T: LiveTransport, A: MentorAudioOut> MentorSession<T, A> {
    /// Create a session in `Idle`
    pub fn new(transport: T, audio: A) -> Self {
        Self {
            transport,
            audio,
            state: SessionState::Idle,
            torn_down: false,
            on_close: None,
        }
    }

    /// Register the caller's close/cancel callback; invoked exactly once
    /// when the session reaches a terminal state
    #[must_use]
    pub fn with_close_callback(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Abort before or during connection on a media failure (microphone
    /// permission denied, no device). Transitions straight to `Errored`
    /// and releases everything.
    pub async fn abort_media(&mut self, error: &Error) {
        tracing::error!(%error, "media failure, aborting mentor session");
        self.state = SessionState::Errored;
        self.teardown().await;
    }

    /// Drive the session to a terminal state.
    ///
    /// `frames` carries captured microphone frames; `shutdown` delivers the
    /// explicit user-initiated end.
    ///
    /// # Errors
    ///
    /// Returns error when the session ends in `Errored`; resources are
    /// released either way.
    pub async fn run(
        &mut self,
        frames: &mut mpsc::Receiver<Vec<f32>>,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> Result<SessionState> {
        self.state = SessionState::Connecting;
        tracing::info!("mentor session connecting");

        match tokio::time::timeout(CONNECT_TIMEOUT, self.transport.next_event()).await {
            Ok(Some(ServerEvent::Opened)) => {
                self.state = SessionState::Active;
                tracing::info!("mentor session active");
            }
            Ok(Some(ServerEvent::TransportError(e))) => {
                return self.fail(format!("connect failed: {e}")).await;
            }
            Ok(_) | Err(_) => {
                return self.fail("connect timed out or stream ended".to_string()).await;
            }
        }

        loop {
            tokio::select! {
                frame = frames.recv() => {
                    let Some(samples) = frame else {
                        // Capture side went away; treat as user end
                        return self.finish().await;
                    };
                    let encoded = encode_frame(&samples);
                    if let Err(e) = self.transport.send_realtime_input(encoded).await {
                        return self.fail(format!("send failed: {e}")).await;
                    }
                }

                event = self.transport.next_event() => {
                    match event {
                        Some(ServerEvent::Audio(frame)) => {
                            match decode_frame(&frame) {
                                Ok(samples) => self.audio.play_frame(&samples),
                                Err(e) => {
                                    tracing::warn!(error = %e, "dropping undecodable frame");
                                }
                            }
                        }
                        Some(ServerEvent::Interrupted) => {
                            self.audio.interrupt();
                        }
                        Some(ServerEvent::Opened) => {}
                        Some(ServerEvent::Closed) | None => {
                            return self.finish().await;
                        }
                        Some(ServerEvent::TransportError(e)) => {
                            return self.fail(e).await;
                        }
                    }
                }

                _ = shutdown.recv() => {
                    return self.finish().await;
                }
            }
        }
    }

    async fn finish(&mut self) -> Result<SessionState> {
        self.state = SessionState::Closed;
        self.teardown().await;
        tracing::info!("mentor session closed");
        Ok(SessionState::Closed)
    }

    async fn fail(&mut self, reason: String) -> Result<SessionState> {
        self.state = SessionState::Errored;
        self.teardown().await;
        tracing::error!(reason, "mentor session errored");
        Err(Error::Session(reason))
    }

    /// Release everything in order: playback, remote handle, close
    /// callback. Runs at most once even when multiple close paths race.
    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.audio.teardown();
        self.transport.close().await;

        if let Some(callback) = self.on_close.take() {
            callback();
        }
    }
}
