//! GPMDP client: connection setup and playback commands
//!
//! The client owns the sending half of the connection. The router task owns
//! the receiving half and feeds the state cache, the pending-call slot and the
//! event bus that the client reads from.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{Authenticator, PinPrompt};
use crate::bus::{create_bus, SharedBus};
use crate::config::Config;
use crate::error::ClientError;
use crate::protocol::{Channel, OutboundRequest, PlaybackMethod};
use crate::rendezvous::PendingCall;
use crate::router::{Router, RouterTask};
use crate::state::{PlayerState, StateCache};
use crate::transport::{websocket, BoxedSink, MessageSink, MessageSource};

pub struct GpmdpClient {
    sink: Mutex<BoxedSink>,
    cache: Arc<StateCache>,
    pending: Arc<PendingCall>,
    bus: SharedBus,
    client_name: String,
    credential: Option<String>,
    shutdown: CancellationToken,
    closed: CancellationToken,
}

impl GpmdpClient {
    /// Wire a client to an already-open transport and start its router.
    /// Must be called inside a tokio runtime.
    pub fn from_transport<K, S>(sink: K, source: S, config: &Config) -> (Self, RouterTask)
    where
        K: MessageSink + 'static,
        S: MessageSource + 'static,
    {
        let cache = Arc::new(StateCache::new());
        let pending = Arc::new(PendingCall::new());
        let bus = create_bus();
        let shutdown = CancellationToken::new();
        let closed = CancellationToken::new();

        let router = Router::new(
            Box::new(source),
            cache.clone(),
            pending.clone(),
            bus.clone(),
            shutdown.clone(),
            closed.clone(),
        )
        .spawn();

        let client = Self {
            sink: Mutex::new(Box::new(sink)),
            cache,
            pending,
            bus,
            client_name: config.client_name.clone(),
            credential: config.stored_credential().map(str::to_string),
            shutdown,
            closed,
        };
        (client, router)
    }

    /// Dial the player and start the router.
    pub async fn connect(config: &Config) -> Result<(Self, RouterTask), ClientError> {
        let (sink, source) = websocket::connect(&config.url).await?;
        Ok(Self::from_transport(sink, source, config))
    }

    /// Dial the player and wait until the first state frame proves the stream
    /// is alive.
    pub async fn connect_and_warm_up(config: &Config) -> Result<(Self, RouterTask), ClientError> {
        let (client, router) = Self::connect(config).await?;
        client.wait_stream_alive().await?;
        Ok((client, router))
    }

    pub async fn wait_stream_alive(&self) -> Result<(), ClientError> {
        tokio::select! {
            biased;
            _ = self.cache.wait_alive() => Ok(()),
            _ = self.closed.cancelled() => Err(ClientError::closed("before any state arrived")),
        }
    }

    /// Wait until every tracked channel has been seen.
    pub async fn wait_initialized(&self) -> Result<(), ClientError> {
        tokio::select! {
            biased;
            _ = self.cache.wait_initialized() => Ok(()),
            _ = self.closed.cancelled() => Err(ClientError::closed("before the player state was complete")),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cache.is_initialized()
    }

    /// Cached state, or `NotInitialized` until the readiness gate has fired
    pub async fn current_status_snapshot(&self) -> Result<PlayerState, ClientError> {
        self.cache.status_snapshot().await
    }

    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub(crate) fn closed_token(&self) -> &CancellationToken {
        &self.closed
    }

    pub(crate) async fn send(&self, request: &OutboundRequest) -> Result<(), ClientError> {
        let mut sink_guard = self.sink.lock().await;
        sink_guard.send(request).await
    }

    /// Send a request and wait for the next result frame.
    async fn call(&self, request: OutboundRequest) -> Result<(), ClientError> {
        let waiter = self.pending.begin()?;
        self.send(&request).await?;
        debug!("{}/{} sent, waiting for result", request.namespace, request.method);
        waiter.wait().await
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn authenticator(&self) -> Authenticator<'_> {
        Authenticator::new(self)
    }

    pub fn has_stored_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Re-assert the stored credential. No-op when there is none.
    pub async fn authenticate_with_stored_credential(&self) -> Result<()> {
        match &self.credential {
            Some(credential) => self
                .authenticator()
                .reassert(credential)
                .await
                .context("authenticate: connect"),
            None => Ok(()),
        }
    }

    /// Run the PIN handshake and return the new credential.
    pub async fn run_interactive_auth(&self, prompt: &dyn PinPrompt) -> Result<String> {
        self.authenticator().run_interactive(prompt).await
    }

    // =========================================================================
    // Playback commands
    // =========================================================================

    pub async fn pause(&self) -> Result<()> {
        if !self.known_play_state().await.context("pause")? {
            // nothing to pause; it's already paused or no music is playing
            debug!("pause: not playing");
            return Ok(());
        }
        self.toggle_play_state().await.context("pause")
    }

    pub async fn play(&self) -> Result<()> {
        if self.known_play_state().await.context("play")? {
            debug!("play: already playing");
            return Ok(());
        }
        self.toggle_play_state().await.context("play")
    }

    /// Play state as reported by the player. Warm-up only guarantees
    /// API_VERSION, so wait for the playState channel before trusting the
    /// cached flag.
    async fn known_play_state(&self) -> Result<bool, ClientError> {
        tokio::select! {
            biased;
            _ = self.cache.wait_seen(Channel::PlayState) => {}
            _ = self.closed.cancelled() => {
                return Err(ClientError::closed("before the play state arrived"));
            }
        }
        Ok(self.cache.play_state().await)
    }

    async fn toggle_play_state(&self) -> Result<()> {
        self.call(OutboundRequest::playback(PlaybackMethod::PlayPause))
            .await
            .context("togglePlayState")
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.call(OutboundRequest::playback(PlaybackMethod::ToggleShuffle))
            .await
            .context("toggleShuffle")
    }

    pub async fn toggle_repeat(&self) -> Result<()> {
        self.call(OutboundRequest::playback(PlaybackMethod::ToggleRepeat))
            .await
            .context("toggleRepeat")
    }

    pub async fn next(&self) -> Result<()> {
        self.call(OutboundRequest::playback(PlaybackMethod::Forward))
            .await
            .context("next")
    }

    pub async fn prev(&self) -> Result<()> {
        self.call(OutboundRequest::playback(PlaybackMethod::Rewind))
            .await
            .context("prev")
    }

    /// Stop the router and close the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        info!("Closing connection");
        self.shutdown.cancel();
        let mut sink_guard = self.sink.lock().await;
        sink_guard.close().await
    }
}
