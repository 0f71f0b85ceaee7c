//! A thin websocket wrapper: connects, paces outbound SUBSCRIBE/UNSUBSCRIBE control frames to
//! stay under the venue's rate limit, and answers pings so the connection survives idle periods.

use crate::config::{MAX_TOPICS_PER_FRAME, MIN_CONTROL_FRAME_SPACING};
use crate::error::AdapterError;
use crate::wire::ControlRequestFrame;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    last_control_frame: Option<tokio::time::Instant>,
}

impl WsConnection {
    pub async fn connect(url: &Url, handshake_timeout: Duration) -> Result<Self, AdapterError> {
        let (stream, _response) = tokio::time::timeout(handshake_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| AdapterError::Unavailable(format!("websocket handshake timed out connecting to {url}")))?
            .map_err(AdapterError::Transport)?;
        Ok(Self {
            stream,
            last_control_frame: None,
        })
    }

    async fn pace(&mut self) {
        if let Some(last) = self.last_control_frame {
            let elapsed = last.elapsed();
            if elapsed < MIN_CONTROL_FRAME_SPACING {
                tokio::time::sleep(MIN_CONTROL_FRAME_SPACING - elapsed).await;
            }
        }
        self.last_control_frame = Some(tokio::time::Instant::now());
    }

    async fn send_control(&mut self, method: &str, topics: &[String]) -> Result<(), AdapterError> {
        for chunk in topics.chunks(MAX_TOPICS_PER_FRAME) {
            self.pace().await;
            let frame = ControlRequestFrame {
                method,
                params: chunk.to_vec(),
                id: next_request_id(),
            };
            let text = serde_json::to_string(&frame).map_err(AdapterError::Decode)?;
            self.stream.send(Message::Text(text.into())).await.map_err(AdapterError::Transport)?;
        }
        Ok(())
    }

    pub async fn subscribe(&mut self, topics: &[String]) -> Result<(), AdapterError> {
        if topics.is_empty() {
            return Ok(());
        }
        self.send_control("SUBSCRIBE", topics).await
    }

    pub async fn unsubscribe(&mut self, topics: &[String]) -> Result<(), AdapterError> {
        if topics.is_empty() {
            return Ok(());
        }
        self.send_control("UNSUBSCRIBE", topics).await
    }

    /// Read the next text payload, transparently answering pings. Returns `Ok(None)` once the
    /// venue closes the connection.
    pub async fn next_text(&mut self) -> Result<Option<String>, AdapterError> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(err)) => return Err(AdapterError::Transport(err)),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Ping(payload))) => {
                    self.stream.send(Message::Pong(payload)).await.map_err(AdapterError::Transport)?;
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(_)) => continue,
            }
        }
    }
}
