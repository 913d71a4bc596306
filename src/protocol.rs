//! GPMDP websocket wire format
//!
//! Outbound frames are `{namespace, method, arguments, requestID}`. Inbound
//! frames are either channel updates `{channel, payload}` or call results
//! `{namespace: "result", type, value, requestID}`; there is no discriminant
//! field, so [`Route::classify`] decides which one a frame is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ClientError;

/// Default GPMDP control endpoint
pub const DEFAULT_URL: &str = "ws://localhost:5672";

/// Namespace the player uses for call results
pub const RESULT_NAMESPACE: &str = "result";

/// Channel carrying authentication handshake events
pub const CONNECT_CHANNEL: &str = "connect";

/// Token the player sends back while a valid PIN is still required
pub const CODE_REQUIRED: &str = "CODE_REQUIRED";

/// Request IDs used by this client. The player does not echo them reliably,
/// so they are never used for correlation.
pub const ANONYMOUS_CONNECT_ID: i64 = 0;
pub const STORED_CREDENTIAL_ID: i64 = 1;
pub const COMMAND_REQUEST_ID: i64 = 2;

/// Channels with no bearing on player state
pub const IGNORED_CHANNELS: &[&str] = &[
    "library",
    "lyrics",
    "playlists",
    "queue",
    "search-results",
    "settings:theme",
    "settings:themeColor",
    "settings:themeType",
];

/// State channels tracked by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    ApiVersion,
    PlayState,
    Volume,
    Shuffle,
    Repeat,
    Track,
    Rating,
    Time,
}

impl Channel {
    pub const ALL: [Channel; 8] = [
        Channel::ApiVersion,
        Channel::PlayState,
        Channel::Volume,
        Channel::Shuffle,
        Channel::Repeat,
        Channel::Track,
        Channel::Rating,
        Channel::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::ApiVersion => "API_VERSION",
            Channel::PlayState => "playState",
            Channel::Volume => "volume",
            Channel::Shuffle => "shuffle",
            Channel::Repeat => "repeat",
            Channel::Track => "track",
            Channel::Rating => "rating",
            Channel::Time => "time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded inbound frame.
///
/// Both shapes share one struct because the player never tags them; absent
/// fields come through as `None` / `Value::Null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "requestID", default)]
    pub request_id: Option<i64>,
}

impl InboundMessage {
    /// Decode a text frame. A frame that is not a JSON object is a transport
    /// failure, not something to skip.
    pub fn decode(text: &str) -> Result<Self, ClientError> {
        serde_json::from_str(text)
            .map_err(|e| ClientError::Transport(format!("malformed frame: {}", e)))
    }
}

/// Where the router sends an inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Completion of the outstanding playback call
    CallResult { request_id: Option<i64> },
    /// Full replacement of one cached field group
    State { channel: Channel, payload: Value },
    /// Handshake event for the authenticator
    Connect { payload: Value },
    /// Known channel with no state relevance
    Ignored(String),
    /// Anything else (logged)
    Unhandled(String),
}

impl Route {
    pub fn classify(message: InboundMessage) -> Self {
        if message.namespace.as_deref() == Some(RESULT_NAMESPACE) {
            return Route::CallResult {
                request_id: message.request_id,
            };
        }

        let name = message.channel.unwrap_or_default();
        if let Some(channel) = Channel::from_name(&name) {
            return Route::State {
                channel,
                payload: message.payload,
            };
        }
        if name == CONNECT_CHANNEL {
            return Route::Connect {
                payload: message.payload,
            };
        }
        if IGNORED_CHANNELS.contains(&name.as_str()) {
            return Route::Ignored(name);
        }
        Route::Unhandled(name)
    }
}

/// Playback methods this client invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMethod {
    PlayPause,
    ToggleShuffle,
    ToggleRepeat,
    Forward,
    Rewind,
}

impl PlaybackMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMethod::PlayPause => "playPause",
            PlaybackMethod::ToggleShuffle => "toggleShuffle",
            PlaybackMethod::ToggleRepeat => "toggleRepeat",
            PlaybackMethod::Forward => "forward",
            PlaybackMethod::Rewind => "rewind",
        }
    }
}

/// Outbound method call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub namespace: String,
    pub method: String,
    pub arguments: Vec<Value>,
    #[serde(rename = "requestID")]
    pub request_id: i64,
}

impl OutboundRequest {
    /// `playback/<method>` with no arguments
    pub fn playback(method: PlaybackMethod) -> Self {
        Self {
            namespace: "playback".to_string(),
            method: method.as_str().to_string(),
            arguments: Vec::new(),
            request_id: COMMAND_REQUEST_ID,
        }
    }

    /// `connect/connect`; arguments are the client name followed by an
    /// optional PIN or credential.
    pub fn connect(client_name: &str, secret: Option<&str>, request_id: i64) -> Self {
        let mut arguments = vec![Value::String(client_name.to_string())];
        if let Some(secret) = secret {
            arguments.push(Value::String(secret.to_string()));
        }
        Self {
            namespace: "connect".to_string(),
            method: "connect".to_string(),
            arguments,
            request_id,
        }
    }

    pub fn encode(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(ClientError::Encoding)
    }
}
