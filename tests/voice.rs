//! Mentor session state-machine tests with fake transport and audio
//!
//! No audio hardware and no network: the transport is scripted through a
//! channel and the audio sink records every call it receives.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use mentor_gateway::voice::{
    encode_frame, pcm16_to_samples, samples_to_pcm16, GeminiLive, LiveConfig, LiveTransport,
    MentorAudioOut, MentorSession, ServerEvent, SessionState,
};
use mentor_gateway::{Error, Result};

/// Transport whose server events are scripted by the test and whose
/// outbound frames are recorded
struct FakeTransport {
    events: mpsc::Receiver<ServerEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

struct TransportHandle {
    events: mpsc::Sender<ServerEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

fn fake_transport() -> (FakeTransport, TransportHandle) {
    let (events_tx, events_rx) = mpsc::channel(16);
    let sent = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));
    (
        FakeTransport {
            events: events_rx,
            sent: sent.clone(),
            closed: closed.clone(),
        },
        TransportHandle {
            events: events_tx,
            sent,
            closed,
        },
    )
}

#[async_trait]
impl LiveTransport for FakeTransport {
    async fn send_realtime_input(&mut self, base64_frame: String) -> Result<()> {
        self.sent.lock().unwrap().push(base64_frame);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct AudioLog {
    frames: Vec<Vec<f32>>,
    interrupts: usize,
    teardowns: usize,
}

/// Audio sink that records every call; cloneable so the test keeps a handle
#[derive(Clone, Default)]
struct FakeAudio {
    log: Arc<Mutex<AudioLog>>,
}

impl MentorAudioOut for FakeAudio {
    fn play_frame(&mut self, samples: &[f32]) {
        self.log.lock().unwrap().frames.push(samples.to_vec());
    }

    fn interrupt(&mut self) {
        self.log.lock().unwrap().interrupts += 1;
    }

    fn teardown(&mut self) {
        self.log.lock().unwrap().teardowns += 1;
    }
}

fn channels() -> (
    mpsc::Sender<Vec<f32>>,
    mpsc::Receiver<Vec<f32>>,
    mpsc::Sender<()>,
    mpsc::Receiver<()>,
) {
    let (frames_tx, frames_rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    (frames_tx, frames_rx, shutdown_tx, shutdown_rx)
}

#[tokio::test]
async fn remote_close_ends_session_cleanly() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());
    assert_eq!(session.state(), SessionState::Idle);

    handle.events.send(ServerEvent::Opened).await.unwrap();
    handle.events.send(ServerEvent::Closed).await.unwrap();

    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    let result = session.run(&mut frames_rx, &mut shutdown_rx).await;

    assert_eq!(result.unwrap(), SessionState::Closed);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(handle.closed.load(Ordering::SeqCst));
    assert_eq!(audio.log.lock().unwrap().teardowns, 1);
}

#[tokio::test]
async fn model_audio_reaches_playback_in_order() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    let first = vec![0.1_f32, -0.2, 0.3];
    let second = vec![-0.4_f32, 0.5];

    handle.events.send(ServerEvent::Opened).await.unwrap();
    handle.events.send(ServerEvent::Audio(encode_frame(&first))).await.unwrap();
    handle.events.send(ServerEvent::Audio(encode_frame(&second))).await.unwrap();
    handle.events.send(ServerEvent::Closed).await.unwrap();

    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    session.run(&mut frames_rx, &mut shutdown_rx).await.unwrap();

    let log = audio.log.lock().unwrap();
    assert_eq!(log.frames.len(), 2);
    // Frames round-trip through 16-bit PCM, so compare after quantization
    assert_eq!(log.frames[0], pcm16_to_samples(&samples_to_pcm16(&first)));
    assert_eq!(log.frames[1], pcm16_to_samples(&samples_to_pcm16(&second)));
}

#[tokio::test]
async fn interruption_cancels_queued_playback() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    handle.events.send(ServerEvent::Opened).await.unwrap();
    handle.events.send(ServerEvent::Audio(encode_frame(&[0.1, 0.2]))).await.unwrap();
    handle.events.send(ServerEvent::Interrupted).await.unwrap();
    handle.events.send(ServerEvent::Closed).await.unwrap();

    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    session.run(&mut frames_rx, &mut shutdown_rx).await.unwrap();

    let log = audio.log.lock().unwrap();
    assert_eq!(log.frames.len(), 1);
    assert_eq!(log.interrupts, 1);
}

#[tokio::test]
async fn undecodable_frame_is_dropped_not_fatal() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    handle.events.send(ServerEvent::Opened).await.unwrap();
    handle.events.send(ServerEvent::Audio("not base64!".to_string())).await.unwrap();
    handle.events.send(ServerEvent::Audio(encode_frame(&[0.5]))).await.unwrap();
    handle.events.send(ServerEvent::Closed).await.unwrap();

    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    let result = session.run(&mut frames_rx, &mut shutdown_rx).await;

    assert!(result.is_ok());
    assert_eq!(audio.log.lock().unwrap().frames.len(), 1);
}

#[tokio::test]
async fn transport_error_ends_in_errored_with_resources_released() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    handle.events.send(ServerEvent::Opened).await.unwrap();
    handle
        .events
        .send(ServerEvent::TransportError("socket reset".to_string()))
        .await
        .unwrap();

    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    let result = session.run(&mut frames_rx, &mut shutdown_rx).await;

    assert!(matches!(result, Err(Error::Session(_))));
    assert_eq!(session.state(), SessionState::Errored);
    assert!(handle.closed.load(Ordering::SeqCst));
    assert_eq!(audio.log.lock().unwrap().teardowns, 1);
}

#[tokio::test]
async fn stream_ending_before_open_is_a_connect_failure() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    drop(handle.events);

    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    let result = session.run(&mut frames_rx, &mut shutdown_rx).await;

    assert!(result.is_err());
    assert_eq!(session.state(), SessionState::Errored);
    assert_eq!(audio.log.lock().unwrap().teardowns, 1);
}

#[tokio::test(start_paused = true)]
async fn connect_timeout_fails_the_session() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    // Sender stays alive but never speaks; paused time skips the wait
    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    let result = session.run(&mut frames_rx, &mut shutdown_rx).await;

    assert!(result.is_err());
    assert_eq!(session.state(), SessionState::Errored);
    drop(handle);
}

#[tokio::test(start_paused = true)]
async fn dial_to_unresponsive_endpoint_times_out() {
    // Accepts the TCP connection but never answers the upgrade handshake
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = LiveConfig::mentor(&format!("ws://{addr}"), "some-model", "Voice");
    let result = GeminiLive::connect(config).await;

    assert!(matches!(result, Err(Error::Session(_))));
    drop(listener);
}

#[tokio::test]
async fn user_shutdown_closes_the_session() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    handle.events.send(ServerEvent::Opened).await.unwrap();

    let (_frames_tx, mut frames_rx, shutdown_tx, mut shutdown_rx) = channels();
    shutdown_tx.send(()).await.unwrap();

    let result = session.run(&mut frames_rx, &mut shutdown_rx).await;

    assert_eq!(result.unwrap(), SessionState::Closed);
    assert!(handle.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn captured_frames_are_forwarded_to_the_transport() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    handle.events.send(ServerEvent::Opened).await.unwrap();

    let (frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    let spoken = vec![0.25_f32, -0.25, 0.5];
    frames_tx.send(spoken.clone()).await.unwrap();
    // Capture side ends, which ends the session after the frame drains
    drop(frames_tx);

    session.run(&mut frames_rx, &mut shutdown_rx).await.unwrap();

    let sent = handle.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], encode_frame(&spoken));
}

#[tokio::test]
async fn teardown_runs_exactly_once_across_close_paths() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();

    let mut session = MentorSession::new(transport, audio.clone())
        .with_close_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    handle.events.send(ServerEvent::Opened).await.unwrap();
    handle.events.send(ServerEvent::Closed).await.unwrap();

    let (_frames_tx, mut frames_rx, _shutdown_tx, mut shutdown_rx) = channels();
    session.run(&mut frames_rx, &mut shutdown_rx).await.unwrap();

    // A late media abort must not tear down or notify a second time
    session.abort_media(&Error::Media("mic unplugged".to_string())).await;

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(audio.log.lock().unwrap().teardowns, 1);
}

#[tokio::test]
async fn media_failure_before_connect_releases_everything() {
    let (transport, handle) = fake_transport();
    let audio = FakeAudio::default();
    let mut session = MentorSession::new(transport, audio.clone());

    session.abort_media(&Error::Media("permission denied".to_string())).await;

    assert_eq!(session.state(), SessionState::Errored);
    assert!(handle.closed.load(Ordering::SeqCst));
    assert_eq!(audio.log.lock().unwrap().teardowns, 1);
}
