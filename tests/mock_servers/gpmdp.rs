#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Mock GPMDP player for testing
//!
//! Speaks the JSON websocket API: pushes the full player state on connect,
//! answers playback requests with a result frame and plays the PIN
//! handshake on the `connect` channel.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Mock player state
#[derive(Debug, Clone)]
pub struct MockGpmdpState {
    pub playing: bool,
    pub shuffle: String,
    pub repeat: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub current_ms: i64,
    pub total_ms: i64,
    /// PIN the player "displays" during the handshake
    pub pin: String,
    /// Credential handed out for the right PIN
    pub token: String,
    /// Skip the initial state burst
    pub silent: bool,
    /// Close the connection instead of answering playback requests
    pub hang_up_on_playback: bool,
}

impl Default for MockGpmdpState {
    fn default() -> Self {
        Self {
            playing: true,
            shuffle: "NO_SHUFFLE".to_string(),
            repeat: "NO_REPEAT".to_string(),
            title: "Paranoid Android".to_string(),
            artist: "Radiohead".to_string(),
            album: "OK Computer".to_string(),
            current_ms: 83456,
            total_ms: 387000,
            pin: "4321".to_string(),
            token: "mock-token".to_string(),
            silent: false,
            hang_up_on_playback: false,
        }
    }
}

/// Mock GPMDP websocket server
pub struct MockGpmdpServer {
    addr: SocketAddr,
    state: Arc<RwLock<MockGpmdpState>>,
    requests: Arc<RwLock<Vec<Value>>>,
    handle: JoinHandle<()>,
}

impl MockGpmdpServer {
    /// Start a mock player on a random port
    pub async fn start(initial: MockGpmdpState) -> Self {
        let state = Arc::new(RwLock::new(initial));
        let requests = Arc::new(RwLock::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state_clone = state.clone();
        let requests_clone = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = state_clone.clone();
                let requests = requests_clone.clone();
                tokio::spawn(async move {
                    handle_connection(stream, state, requests).await;
                });
            }
        });

        Self {
            addr,
            state,
            requests,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn state(&self) -> MockGpmdpState {
        self.state.read().await.clone()
    }

    /// Every request received so far, in order
    pub async fn requests(&self) -> Vec<Value> {
        self.requests.read().await.clone()
    }

    /// Wait until at least `count` requests have arrived.
    pub async fn wait_for_requests(&self, count: usize) -> Vec<Value> {
        for _ in 0..200 {
            let seen = self.requests().await;
            if seen.len() >= count {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("mock player never received {} requests", count);
    }

    /// Stop the mock server
    pub async fn stop(self) {
        self.handle.abort();
    }
}

fn channel_frame(channel: &str, payload: Value) -> Message {
    Message::Text(json!({"channel": channel, "payload": payload}).to_string())
}

fn result_frame(request_id: &Value) -> Message {
    Message::Text(
        json!({
            "namespace": "result",
            "type": "return",
            "value": null,
            "requestID": request_id
        })
        .to_string(),
    )
}

fn initial_frames(state: &MockGpmdpState) -> Vec<Message> {
    vec![
        channel_frame("API_VERSION", json!("1.1.0")),
        channel_frame("playState", json!(state.playing)),
        channel_frame("volume", json!(100)),
        channel_frame("shuffle", json!(state.shuffle)),
        channel_frame("repeat", json!(state.repeat)),
        channel_frame(
            "track",
            json!({"title": state.title, "artist": state.artist, "album": state.album}),
        ),
        channel_frame("rating", json!({"liked": false, "disliked": false})),
        channel_frame("queue", json!([])),
        channel_frame(
            "time",
            json!({"current": state.current_ms, "total": state.total_ms}),
        ),
    ]
}

/// Handle a single websocket connection
async fn handle_connection(
    stream: TcpStream,
    state: Arc<RwLock<MockGpmdpState>>,
    requests: Arc<RwLock<Vec<Value>>>,
) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut writer, mut reader) = ws.split();

    let snapshot = state.read().await.clone();
    if !snapshot.silent {
        for frame in initial_frames(&snapshot) {
            if writer.send(frame).await.is_err() {
                return;
            }
        }
    }

    while let Some(Ok(message)) = reader.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        requests.write().await.push(request.clone());

        let replies = process_request(&request, &state).await;
        let Some(replies) = replies else {
            let _ = writer.close().await;
            return;
        };
        for reply in replies {
            if writer.send(reply).await.is_err() {
                return;
            }
        }
    }
}

/// Work out the frames to send back, or `None` to hang up.
async fn process_request(
    request: &Value,
    state: &Arc<RwLock<MockGpmdpState>>,
) -> Option<Vec<Message>> {
    let namespace = request["namespace"].as_str().unwrap_or_default();
    let method = request["method"].as_str().unwrap_or_default();
    let arguments = request["arguments"].as_array().cloned().unwrap_or_default();
    let request_id = request["requestID"].clone();

    let mut state = state.write().await;

    match (namespace, method) {
        ("playback", _) if state.hang_up_on_playback => None,
        ("playback", "playPause") => {
            state.playing = !state.playing;
            Some(vec![
                channel_frame("playState", json!(state.playing)),
                result_frame(&request_id),
            ])
        }
        ("playback", "toggleShuffle") => {
            state.shuffle = if state.shuffle == "NO_SHUFFLE" {
                "ALL_SHUFFLE".to_string()
            } else {
                "NO_SHUFFLE".to_string()
            };
            Some(vec![
                channel_frame("shuffle", json!(state.shuffle)),
                result_frame(&request_id),
            ])
        }
        ("playback", "toggleRepeat") => {
            state.repeat = match state.repeat.as_str() {
                "NO_REPEAT" => "LIST_REPEAT",
                "LIST_REPEAT" => "SINGLE_REPEAT",
                _ => "NO_REPEAT",
            }
            .to_string();
            Some(vec![
                channel_frame("repeat", json!(state.repeat)),
                result_frame(&request_id),
            ])
        }
        ("playback", "forward" | "rewind") => Some(vec![result_frame(&request_id)]),
        ("connect", "connect") => match arguments.get(1).and_then(Value::as_str) {
            // Phase one: show the PIN
            None => Some(vec![channel_frame("connect", json!("CODE_REQUIRED"))]),
            // Stored credential: accepted silently
            Some(secret) if secret == state.token => Some(vec![]),
            Some(secret) if secret == state.pin => {
                Some(vec![channel_frame("connect", json!(state.token))])
            }
            Some(_) => Some(vec![channel_frame("connect", json!("CODE_REQUIRED"))]),
        },
        _ => Some(vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    #[tokio::test]
    async fn mock_gpmdp_starts_and_stops() {
        let server = MockGpmdpServer::start(MockGpmdpState::default()).await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.stop().await;
    }

    #[tokio::test]
    async fn mock_gpmdp_pushes_state_on_connect() {
        let server = MockGpmdpServer::start(MockGpmdpState::default()).await;
        let (mut ws, _) = connect_async(server.url()).await.unwrap();

        let first = ws.next().await.unwrap().unwrap();
        let frame: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert_eq!(frame["channel"], "API_VERSION");

        server.stop().await;
    }
}
