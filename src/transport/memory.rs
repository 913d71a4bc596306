//! In-memory transport
//!
//! [`pair`] returns the client-side halves plus a [`RemoteEnd`] that plays
//! the part of the player: it sees every request the client sends and can
//! push raw frames back.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::{MessageSink, MessageSource};
use crate::error::ClientError;
use crate::protocol::{InboundMessage, OutboundRequest, RESULT_NAMESPACE};

pub struct MemorySink {
    tx: mpsc::Sender<OutboundRequest>,
}

pub struct MemorySource {
    rx: mpsc::Receiver<String>,
}

/// The player's side of an in-memory connection
pub struct RemoteEnd {
    requests: mpsc::Receiver<OutboundRequest>,
    frames: Option<mpsc::Sender<String>>,
}

/// Create a connected pair. `capacity` bounds both directions.
pub fn pair(capacity: usize) -> (MemorySink, MemorySource, RemoteEnd) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (frame_tx, frame_rx) = mpsc::channel(capacity);
    (
        MemorySink { tx: request_tx },
        MemorySource { rx: frame_rx },
        RemoteEnd {
            requests: request_rx,
            frames: Some(frame_tx),
        },
    )
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&mut self, request: &OutboundRequest) -> Result<(), ClientError> {
        // Round-trip through the encoder so encoding failures surface here too
        request.encode()?;
        self.tx
            .send(request.clone())
            .await
            .map_err(|_| ClientError::closed("by the remote end"))
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn receive(&mut self) -> Result<InboundMessage, ClientError> {
        match self.rx.recv().await {
            Some(text) => InboundMessage::decode(&text),
            None => Err(ClientError::closed("by the remote end")),
        }
    }
}

impl RemoteEnd {
    /// Push a raw text frame.
    pub async fn push_raw(&self, text: impl Into<String>) {
        if let Some(frames) = &self.frames {
            // Receiver gone means the router already exited; nothing to do.
            let _ = frames.send(text.into()).await;
        }
    }

    pub async fn push(&self, frame: Value) {
        self.push_raw(frame.to_string()).await;
    }

    /// `{channel, payload}` update
    pub async fn push_channel(&self, channel: &str, payload: Value) {
        self.push(json!({"channel": channel, "payload": payload})).await;
    }

    /// `{namespace: "result", ...}` frame
    pub async fn push_result(&self, request_id: i64) {
        self.push(json!({
            "namespace": RESULT_NAMESPACE,
            "type": "return",
            "value": null,
            "requestID": request_id
        }))
        .await;
    }

    /// Push one update on every tracked channel, as the player does right
    /// after a connection is opened.
    pub async fn push_initial_state(&self, playing: bool) {
        self.push_channel("API_VERSION", json!("1.1.0")).await;
        self.push_channel("playState", json!(playing)).await;
        self.push_channel("volume", json!(50)).await;
        self.push_channel("shuffle", json!("NO_SHUFFLE")).await;
        self.push_channel("repeat", json!("NO_REPEAT")).await;
        self.push_channel(
            "track",
            json!({"title": "Paranoid Android", "artist": "Radiohead", "album": "OK Computer"}),
        )
        .await;
        self.push_channel("rating", json!({"liked": false, "disliked": false}))
            .await;
        self.push_channel("time", json!({"current": 83456, "total": 387000}))
            .await;
    }

    /// Next request sent by the client, or `None` once the client side is
    /// dropped.
    pub async fn next_request(&mut self) -> Option<OutboundRequest> {
        self.requests.recv().await
    }

    /// Request already sent, without waiting
    pub fn try_next_request(&mut self) -> Option<OutboundRequest> {
        self.requests.try_recv().ok()
    }

    /// Simulate the player dropping the socket.
    pub fn disconnect(&mut self) {
        self.frames = None;
    }
}
