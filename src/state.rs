//! Cached player state and the readiness gate
//!
//! The router is the only writer. Readers get cloned snapshots so no lock is
//! ever held outside this module.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::{watch, RwLock};

use crate::error::ClientError;
use crate::protocol::Channel;

/// Number of distinct tracked channels that must be seen before the cache is
/// considered warm.
pub const READY_THRESHOLD: usize = 8;

/// Thumbs up / thumbs down
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rating {
    pub liked: bool,
    pub disliked: bool,
}

/// Playback position, milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Time {
    pub current: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    #[serde(deserialize_with = "null_as_default")]
    pub album: String,
    #[serde(deserialize_with = "null_as_default")]
    pub artist: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
}

/// Snapshot of remote player state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub api_version: String,
    pub play_state: bool,
    pub rating: Rating,
    /// Opaque repeat mode, e.g. "NO_REPEAT"
    pub repeat: String,
    /// Opaque shuffle mode, e.g. "NO_SHUFFLE"
    pub shuffle: String,
    pub time: Time,
    pub track: Track,
    pub volume: i64,
}

// The player sends `null` for track fields when nothing is loaded.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PlayerState {
    /// Replace the field group behind `channel` with `payload`.
    ///
    /// Nothing is modified when the payload does not decode. The API version
    /// is kept from its first arrival.
    pub fn apply(&mut self, channel: Channel, payload: Value) -> Result<(), serde_json::Error> {
        match channel {
            Channel::ApiVersion => {
                let version: String = serde_json::from_value(payload)?;
                if self.api_version.is_empty() {
                    self.api_version = version;
                }
            }
            Channel::PlayState => self.play_state = serde_json::from_value(payload)?,
            Channel::Volume => self.volume = serde_json::from_value(payload)?,
            Channel::Shuffle => self.shuffle = serde_json::from_value(payload)?,
            Channel::Repeat => self.repeat = serde_json::from_value(payload)?,
            Channel::Track => self.track = serde_json::from_value(payload)?,
            Channel::Rating => self.rating = serde_json::from_value(payload)?,
            Channel::Time => self.time = serde_json::from_value(payload)?,
        }
        Ok(())
    }
}

/// Result of applying one state update
#[derive(Debug)]
pub struct ApplyOutcome {
    /// This update completed the readiness set
    pub became_ready: bool,
    /// The payload did not fit its field group; the group was left as it was
    pub decode_error: Option<serde_json::Error>,
}

/// Lock-guarded player state plus the signals derived from it: the set of
/// channels seen so far, `alive` (an API_VERSION frame arrived) and
/// `initialized` (all tracked channels arrived).
pub struct StateCache {
    inner: RwLock<PlayerState>,
    seen: watch::Sender<HashSet<Channel>>,
    alive: watch::Sender<bool>,
    initialized: watch::Sender<bool>,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(PlayerState::default()),
            seen: watch::Sender::new(HashSet::new()),
            alive: watch::Sender::new(false),
            initialized: watch::Sender::new(false),
        }
    }

    /// Apply one channel update.
    ///
    /// The channel counts as seen even when its payload does not decode, so a
    /// drifted field type cannot hold the readiness gate shut.
    pub async fn apply(&self, channel: Channel, payload: Value) -> ApplyOutcome {
        let decode_error = {
            let mut inner = self.inner.write().await;
            inner.apply(channel, payload).err()
        };

        let mut complete = false;
        self.seen.send_if_modified(|seen| {
            let inserted = seen.insert(channel);
            complete = seen.len() >= READY_THRESHOLD;
            inserted
        });

        if channel == Channel::ApiVersion {
            self.alive.send_replace(true);
        }

        let became_ready = complete
            && self.initialized.send_if_modified(|ready| {
                if *ready {
                    false
                } else {
                    *ready = true;
                    true
                }
            });

        ApplyOutcome {
            became_ready,
            decode_error,
        }
    }

    pub async fn snapshot(&self) -> PlayerState {
        self.inner.read().await.clone()
    }

    /// Snapshot for status reporting; refuses until the cache is warm.
    pub async fn status_snapshot(&self) -> Result<PlayerState, ClientError> {
        if !self.is_initialized() {
            return Err(ClientError::NotInitialized);
        }
        Ok(self.snapshot().await)
    }

    pub async fn play_state(&self) -> bool {
        self.inner.read().await.play_state
    }

    pub fn seen_count(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    /// Resolves once the first API_VERSION frame has been applied.
    pub async fn wait_alive(&self) {
        let mut rx = self.alive.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|alive| *alive).await;
    }

    /// Resolves once `channel` has been applied at least once.
    pub async fn wait_seen(&self, channel: Channel) {
        let mut rx = self.seen.subscribe();
        let _ = rx.wait_for(|seen| seen.contains(&channel)).await;
    }

    /// Resolves once every tracked channel has been applied.
    pub async fn wait_initialized(&self) {
        let mut rx = self.initialized.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
