//! WebSocket transport for the live voice endpoint
//!
//! One manager task owns the socket and bridges it to channels: outbound
//! realtime input units go out as JSON text frames, inbound server content
//! is flattened into `ServerEvent`s for the session's consumer loop.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use super::session::{LiveTransport, ServerEvent, CONNECT_TIMEOUT};
use crate::{Error, Result};

/// Live session configuration
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub url: String,
    pub model: String,
    pub system_instruction: String,
    pub voice: String,
}

impl LiveConfig {
    /// The mock-interview mentor persona
    #[must_use]
    pub fn mentor(url: &str, model: &str, voice: &str) -> Self {
        Self {
            url: url.to_string(),
            model: model.to_string(),
            system_instruction: "You are a professional Angular Mentor. Conduct a mock \
                                 interview. Be encouraging, technical, and concise. No \
                                 transcripts, focus on audio conversation."
                .to_string(),
            voice: voice.to_string(),
        }
    }
}

/// WebSocket-backed live session handle
pub struct GeminiLive {
    outbound_tx: mpsc::Sender<String>,
    events_rx: mpsc::Receiver<ServerEvent>,
    closed: bool,
}

impl GeminiLive {
    /// Connect and send the session setup message; the returned transport
    /// emits `Opened` once the endpoint confirms establishment. The dial
    /// and setup send share the session's connect deadline, so an endpoint
    /// that accepts but never answers cannot hang the caller.
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be opened or setup cannot be sent
    /// within the connect deadline
    pub async fn connect(config: LiveConfig) -> Result<Self> {
        let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&config.url))
            .await
            .map_err(|_| Error::Session("live connect timed out".to_string()))?
            .map_err(|e| Error::Session(format!("live connect failed: {e}")))?;
        let (mut write, mut read) = ws_stream.split();

        let setup = serde_json::json!({
            "setup": {
                "model": format!("models/{}", config.model),
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {
                            "prebuiltVoiceConfig": { "voiceName": config.voice }
                        }
                    }
                },
                "systemInstruction": {
                    "parts": [{ "text": config.system_instruction }]
                }
            }
        });
        tokio::time::timeout(CONNECT_TIMEOUT, write.send(Message::Text(setup.to_string())))
            .await
            .map_err(|_| Error::Session("setup send timed out".to_string()))?
            .map_err(|e| Error::Session(format!("setup send failed: {e}")))?;

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(64);
        let (events_tx, events_rx) = mpsc::channel::<ServerEvent>(64);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(frame) => {
                                let input = serde_json::json!({
                                    "realtimeInput": {
                                        "mediaChunks": [{
                                            "data": frame,
                                            "mimeType": "audio/pcm;rate=16000",
                                        }]
                                    }
                                });
                                if let Err(e) = write.send(Message::Text(input.to_string())).await {
                                    let _ = events_tx
                                        .send(ServerEvent::TransportError(e.to_string()))
                                        .await;
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(Message::Close(None)).await;
                                break;
                            }
                        }
                    }

                    inbound = read.next() => {
                        match inbound {
                            Some(Ok(Message::Text(text))) => {
                                for event in parse_server_message(&text) {
                                    if events_tx.send(event).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Some(Ok(Message::Binary(bytes))) => {
                                if let Ok(text) = String::from_utf8(bytes) {
                                    for event in parse_server_message(&text) {
                                        if events_tx.send(event).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                if write.send(Message::Pong(payload)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                let _ = events_tx.send(ServerEvent::Closed).await;
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                let _ = events_tx
                                    .send(ServerEvent::TransportError(e.to_string()))
                                    .await;
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            outbound_tx,
            events_rx,
            closed: false,
        })
    }
}

/// Flatten one server JSON message into session events
fn parse_server_message(text: &str) -> Vec<ServerEvent> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        tracing::warn!("unparseable server message");
        return Vec::new();
    };

    let mut events = Vec::new();

    if value.get("setupComplete").is_some() {
        events.push(ServerEvent::Opened);
    }

    if let Some(content) = value.get("serverContent") {
        if let Some(parts) = content
            .pointer("/modelTurn/parts")
            .and_then(serde_json::Value::as_array)
        {
            for part in parts {
                if let Some(data) = part
                    .pointer("/inlineData/data")
                    .and_then(serde_json::Value::as_str)
                {
                    events.push(ServerEvent::Audio(data.to_string()));
                }
            }
        }

        if content
            .get("interrupted")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            events.push(ServerEvent::Interrupted);
        }
    }

    events
}

#[async_trait]
impl LiveTransport for GeminiLive {
    async fn send_realtime_input(&mut self, base64_frame: String) -> Result<()> {
        self.outbound_tx
            .send(base64_frame)
            .await
            .map_err(|_| Error::Session("live session closed".to_string()))
    }

    async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events_rx.recv().await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Dropping the sender makes the manager task send a Close frame
        let (replacement, _) = mpsc::channel(1);
        let _ = std::mem::replace(&mut self.outbound_tx, replacement);
    }
}
