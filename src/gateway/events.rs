//! deCONZ websocket event stream.
//!
//! The gateway pushes one JSON object per change on its websocket port. The
//! stream decodes them into [`ChangeEvent`]s and forwards them, in arrival
//! order, to a channel consumed by a single dispatch task.
//!
//! The first connection is made by [`EventStream::connect`] and its failure is
//! fatal. Once running, dropped connections are re-established with
//! exponential backoff; after `failure_alert` consecutive failed attempts the
//! stream is reported as degraded at error level.

use super::ValueMap;
use crate::config::EventStreamConfig;
use crate::error::{BridgeError, Result};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Added,
    Changed,
    Deleted,
    #[serde(rename = "scene-called")]
    SceneCalled,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Lights,
    Sensors,
    Groups,
    Scenes,
    #[serde(other)]
    Other,
}

/// One gateway change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Message type, always `event` for change notifications
    #[serde(rename = "t", default)]
    pub message_type: String,
    #[serde(rename = "e")]
    pub event: EventType,
    #[serde(rename = "r")]
    pub resource: ResourceType,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "uniqueid", default)]
    pub unique_id: Option<String>,
    #[serde(rename = "gid", default)]
    pub group_id: Option<String>,
    #[serde(rename = "scid", default)]
    pub scene_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<ValueMap>,
    #[serde(default)]
    pub config: Option<ValueMap>,
}

/// Decode one websocket text frame.
pub fn decode(text: &str) -> Result<ChangeEvent> {
    Ok(serde_json::from_str(text)?)
}

/// Reconnect delays: `initial`, doubled per failed attempt, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            attempts: 0,
        }
    }

    pub fn from_config(config: &EventStreamConfig) -> Self {
        Self::new(
            Duration::from_millis(config.reconnect_initial_ms),
            Duration::from_millis(config.reconnect_max_ms),
        )
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempts).unwrap_or(u32::MAX);
        self.attempts = self.attempts.saturating_add(1);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Attempts made since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

enum ReadOutcome {
    Cancelled,
    ReceiverClosed,
    Disconnected(String),
}

/// Connected gateway event stream.
pub struct EventStream {
    url: String,
    config: EventStreamConfig,
    socket: Option<Socket>,
}

impl EventStream {
    /// Open the websocket at `url` (e.g. `ws://10.0.0.2:443`).
    pub async fn connect(url: impl Into<String>, config: EventStreamConfig) -> Result<Self> {
        let url = url.into();
        let (socket, _) = connect_async(url.as_str()).await?;
        info!("[Events] Connected to {}", url);
        Ok(Self {
            url,
            config,
            socket: Some(socket),
        })
    }

    /// Forward events to `tx` until cancelled.
    ///
    /// Returns [`BridgeError::EventStreamClosed`] if the receiving side goes away.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<ChangeEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut backoff = Backoff::from_config(&self.config);

        loop {
            let socket = match self.socket.take() {
                Some(socket) => socket,
                None => {
                    let delay = backoff.next_delay();
                    debug!("[Events] Reconnecting in {:?}", delay);
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(delay) => {}
                    }

                    match connect_async(self.url.as_str()).await {
                        Ok((socket, _)) => {
                            info!(
                                "[Events] Reconnected after {} attempt(s)",
                                backoff.attempts()
                            );
                            backoff.reset();
                            socket
                        }
                        Err(e) => {
                            if backoff.attempts() >= self.config.failure_alert {
                                error!(
                                    "[Events] Event stream degraded, {} reconnect attempts failed: {}",
                                    backoff.attempts(),
                                    e
                                );
                            } else {
                                warn!("[Events] Reconnect failed: {}", e);
                            }
                            continue;
                        }
                    }
                }
            };

            match read_frames(socket, &tx, &cancel).await {
                ReadOutcome::Cancelled => {
                    info!("[Events] Event stream stopped");
                    return Ok(());
                }
                ReadOutcome::ReceiverClosed => {
                    error!("[Events] Event channel closed");
                    return Err(BridgeError::EventStreamClosed);
                }
                ReadOutcome::Disconnected(reason) => {
                    warn!("[Events] Connection lost: {}", reason);
                }
            }
        }
    }
}

async fn read_frames(
    mut socket: Socket,
    tx: &mpsc::Sender<ChangeEvent>,
    cancel: &CancellationToken,
) -> ReadOutcome {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = socket.close(None).await;
                return ReadOutcome::Cancelled;
            }
            frame = socket.next() => frame,
        };

        match frame {
            None => return ReadOutcome::Disconnected("stream ended".to_string()),
            Some(Err(e)) => return ReadOutcome::Disconnected(e.to_string()),
            Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        return ReadOutcome::ReceiverClosed;
                    }
                }
                Err(e) => warn!("[Events] Ignoring malformed event: {}", e),
            },
            Some(Ok(Message::Close(_))) => {
                return ReadOutcome::Disconnected("closed by gateway".to_string());
            }
            Some(Ok(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_light_change() {
        let event = decode(
            r#"{"t":"event","e":"changed","r":"lights","id":"3",
                "uniqueid":"00:17:88:01:02:03:04:05-0b","state":{"on":true,"bri":128}}"#,
        )
        .unwrap();

        assert_eq!(event.event, EventType::Changed);
        assert_eq!(event.resource, ResourceType::Lights);
        assert_eq!(event.unique_id.as_deref(), Some("00:17:88:01:02:03:04:05-0b"));
        let state = event.state.unwrap();
        assert_eq!(state.get_i64("bri"), Some(128));
        assert!(event.config.is_none());
    }

    #[test]
    fn test_decode_scene_and_unknown_kinds() {
        let event =
            decode(r#"{"t":"event","e":"scene-called","r":"scenes","gid":"1","scid":"2"}"#)
                .unwrap();
        assert_eq!(event.event, EventType::SceneCalled);
        assert_eq!(event.resource, ResourceType::Scenes);
        assert_eq!(event.scene_id.as_deref(), Some("2"));

        let event = decode(r#"{"t":"event","e":"rotated","r":"alarmsystems","id":"1"}"#).unwrap();
        assert_eq!(event.event, EventType::Other);
        assert_eq!(event.resource, ResourceType::Other);
        assert!(event.unique_id.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"t":"event"}"#).is_err());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        assert_eq!(backoff.attempts(), 5);

        // Many attempts must not overflow
        for _ in 0..100 {
            assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        }

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_from_config() {
        let config = EventStreamConfig {
            reconnect_initial_ms: 250,
            reconnect_max_ms: 1_000,
            failure_alert: 3,
        };
        let mut backoff = Backoff::from_config(&config);
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1_000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let config = EventStreamConfig {
            reconnect_initial_ms: 10,
            reconnect_max_ms: 10,
            failure_alert: 1,
        };
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = EventStream::connect(format!("ws://127.0.0.1:{}", port), config).await;
        assert!(matches!(result, Err(BridgeError::WebSocket(_))));
    }
}
