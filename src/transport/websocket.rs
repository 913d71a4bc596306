//! WebSocket transport (tokio-tungstenite)

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use super::{MessageSink, MessageSource};
use crate::error::ClientError;
use crate::protocol::{InboundMessage, OutboundRequest};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

pub struct WsSource {
    inner: SplitStream<WsStream>,
}

/// Dial the player. No timeout and no retry: failure here ends the process
/// before any command runs.
pub async fn connect(url: &str) -> Result<(WsSink, WsSource), ClientError> {
    let (stream, response) =
        connect_async(url)
            .await
            .map_err(|e| ClientError::Connection {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
    info!("Connected to {} (HTTP {})", url, response.status());

    let (write, read) = stream.split();
    Ok((WsSink { inner: write }, WsSource { inner: read }))
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send(&mut self, request: &OutboundRequest) -> Result<(), ClientError> {
        let text = request.encode()?;
        debug!("-> {}", text);
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| ClientError::Transport(format!("write failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.inner
            .close()
            .await
            .map_err(|e| ClientError::Transport(format!("close failed: {}", e)))
    }
}

#[async_trait]
impl MessageSource for WsSource {
    async fn receive(&mut self) -> Result<InboundMessage, ClientError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!("<- {}", text);
                    return InboundMessage::decode(&text);
                }
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8(data).map_err(|e| {
                        ClientError::Transport(format!("malformed frame: {}", e))
                    })?;
                    return InboundMessage::decode(&text);
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Player closed connection: {:?}", frame);
                    return Err(ClientError::closed("by the player"));
                }
                // Pings are answered by tungstenite on the next read/write
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(ClientError::Transport(format!("read failed: {}", e)));
                }
                None => return Err(ClientError::closed("by the player")),
            }
        }
    }
}
