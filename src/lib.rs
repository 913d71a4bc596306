//! GPMDP Remote - Rust Implementation
//!
//! Command-line remote control for Google Play Music Desktop Player over its
//! JSON websocket API.
//!
//! This library provides:
//! - A websocket transport and a message router that keeps a local copy of
//!   the player state
//! - Playback commands that wait for the player's result frame
//! - The PIN authentication handshake
//! - Configuration and status rendering for the `gpmdp` binary

pub mod auth;
pub mod bus;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod rendezvous;
pub mod router;
pub mod state;
pub mod status;
pub mod transport;

pub use client::GpmdpClient;
pub use error::ClientError;
pub use state::PlayerState;
