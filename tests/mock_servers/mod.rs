//! Mock servers for integration testing
//!
//! Simulates the GPMDP websocket API so the client can be exercised end to
//! end without a running player.

pub mod gpmdp;

pub use gpmdp::{MockGpmdpServer, MockGpmdpState};
