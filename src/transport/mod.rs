//! Duplex message transport
//!
//! The connection is split into a sending half owned by the client and a
//! receiving half owned by the router. The websocket implementation talks to
//! a real player; the in-memory one drives the client from tests.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::protocol::{InboundMessage, OutboundRequest};

pub mod memory;
pub mod websocket;

/// Sending half of the connection
#[async_trait]
pub trait MessageSink: Send {
    /// Encode and write one request.
    async fn send(&mut self, request: &OutboundRequest) -> Result<(), ClientError>;

    /// Close the connection politely. Default: nothing to do.
    async fn close(&mut self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Receiving half of the connection
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next decoded frame, in arrival order. Any error is final.
    async fn receive(&mut self) -> Result<InboundMessage, ClientError>;
}

pub type BoxedSink = Box<dyn MessageSink>;
pub type BoxedSource = Box<dyn MessageSource>;
