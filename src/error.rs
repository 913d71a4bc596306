//! Error kinds surfaced by the protocol client

use serde_json::Value;
use thiserror::Error;

/// Every failure the client core can report.
///
/// None of these are retried locally. Connection and transport errors are
/// fatal for the process; the rest are surfaced to the caller of the command
/// that hit them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The websocket could not be established.
    #[error("couldn't connect to gpmdp at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// Read or write failure on an established connection, including a
    /// malformed inbound frame or the peer closing the socket.
    #[error("transport error: {0}")]
    Transport(String),

    /// An outbound request could not be serialized.
    #[error("failed to encode request: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The player answered the PIN handshake with CODE_REQUIRED.
    #[error("invalid PIN entered")]
    InvalidPin,

    /// A connect event carried something other than a credential string.
    #[error("invalid response received: {0}")]
    UnexpectedAuthResponse(Value),

    /// Status was requested before every tracked channel had been seen.
    #[error("never initialized: player state has not been fully received")]
    NotInitialized,

    /// A second playback command was issued while one is still waiting.
    #[error("another command is still waiting for its result")]
    CallInFlight,

    /// The operator PIN could not be read.
    #[error("failed to read PIN: {0}")]
    Prompt(#[source] std::io::Error),
}

impl ClientError {
    pub(crate) fn closed(context: &str) -> Self {
        ClientError::Transport(format!("connection closed {}", context))
    }

    /// Whether this error means the connection itself is gone.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Connection { .. } | ClientError::Transport(_)
        )
    }
}
