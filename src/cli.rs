//! Command-line interface

use clap::{Parser, Subcommand};

const LONG_VERSION: &str = concat!(env!("GPMDP_VERSION"), " (", env!("GPMDP_GIT_SHA"), ")");

#[derive(Debug, Parser)]
#[command(
    name = "gpmdp",
    version = env!("GPMDP_VERSION"),
    long_version = LONG_VERSION,
    about = "Remote control for Google Play Music Desktop Player"
)]
pub struct Cli {
    /// Player websocket endpoint (overrides config)
    #[arg(long, global = true, env = "GPMDP_URL")]
    pub url: Option<String>,

    /// Log protocol traffic to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// authenticates app so it can control GPMDP
    Auth,
    /// advance to the next song
    Next,
    /// pauses playback
    Pause,
    /// resumes playback
    Play,
    /// return to the previous song
    Prev,
    /// shows currently playing track
    Status,
    /// toggles repeat mode
    #[command(name = "togglerepeat")]
    ToggleRepeat,
    /// toggles shuffle mode
    #[command(name = "toggleshuffle")]
    ToggleShuffle,
}

impl Command {
    /// Whether a stored credential should be re-asserted before running
    pub fn needs_stored_credential(&self) -> bool {
        !matches!(self, Command::Auth)
    }
}
