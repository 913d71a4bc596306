//! Message router: the single reader of the connection
//!
//! Every inbound frame goes to exactly one place: the pending-call slot, the
//! state cache, or the bus (handshake events). The router only ever waits on
//! the transport; all signals it emits are fire-and-forget.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::bus::{ClientEvent, SharedBus};
use crate::error::ClientError;
use crate::protocol::Route;
use crate::rendezvous::PendingCall;
use crate::state::StateCache;
use crate::transport::BoxedSource;

/// Router task handle. Resolves with the transport error that stopped it, or
/// `Ok(())` after a requested shutdown.
pub type RouterTask = JoinHandle<Result<(), ClientError>>;

pub struct Router {
    source: BoxedSource,
    cache: Arc<StateCache>,
    pending: Arc<PendingCall>,
    bus: SharedBus,
    /// Requested stop
    shutdown: CancellationToken,
    /// Cancelled by the router when it stops, for whatever reason
    closed: CancellationToken,
}

impl Router {
    pub fn new(
        source: BoxedSource,
        cache: Arc<StateCache>,
        pending: Arc<PendingCall>,
        bus: SharedBus,
        shutdown: CancellationToken,
        closed: CancellationToken,
    ) -> Self {
        Self {
            source,
            cache,
            pending,
            bus,
            shutdown,
            closed,
        }
    }

    pub fn spawn(self) -> RouterTask {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> Result<(), ClientError> {
        info!("Message router started");

        let result = loop {
            let message = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break Ok(()),
                message = self.source.receive() => message,
            };

            match message {
                Ok(message) => self.route(Route::classify(message)).await,
                Err(e) => {
                    error!("listen err: {}", e);
                    break Err(e);
                }
            }
        };

        self.pending.abandon();
        self.bus.publish(ClientEvent::Disconnected {
            reason: match &result {
                Ok(()) => "shutdown".to_string(),
                Err(e) => e.to_string(),
            },
        });
        self.closed.cancel();
        info!("Message router stopped");
        result
    }

    async fn route(&self, route: Route) {
        match route {
            Route::CallResult { request_id } => {
                debug!("Call result (requestID {:?})", request_id);
                self.pending.complete();
            }
            Route::State { channel, payload } => {
                let outcome = self.cache.apply(channel, payload).await;
                if let Some(e) = outcome.decode_error {
                    warn!("Ignoring undecodable {} payload: {}", channel, e);
                } else {
                    trace!("Applied {} update", channel);
                }
                if outcome.became_ready {
                    info!("Player state initialized");
                }
            }
            Route::Connect { payload } => {
                debug!("Connect event: {}", payload);
                self.bus.publish(ClientEvent::Connect { payload });
            }
            Route::Ignored(channel) => trace!("Ignoring channel {}", channel),
            Route::Unhandled(channel) => warn!("unhandled channel: {}", channel),
        }
    }
}
