//! GPMDP Remote - Rust Implementation
//!
//! Command-line remote control for Google Play Music Desktop Player.

use gpmdp_remote::auth::TerminalPrompt;
use gpmdp_remote::cli::{Cli, Command};
use gpmdp_remote::config::{self, AUTH_KEY_ENV};
use gpmdp_remote::status::render_status;
use gpmdp_remote::{ClientError, GpmdpClient};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code when the connection drops while a command is running
const EXIT_CONNECTION_LOST: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging (stderr, quiet unless asked)
    let default_filter = if cli.verbose {
        "gpmdp_remote=debug"
    } else {
        "gpmdp_remote=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            println!("{:#}", e);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = config::load_config().context("failed to load configuration")?;
    if let Some(url) = cli.url {
        config.url = url;
    }
    tracing::debug!("Configuration loaded, url: {}", config.url);

    let (client, mut router) = GpmdpClient::connect_and_warm_up(&config)
        .await
        .context("couldn't connect to gpmdp")?;

    if client.has_stored_credential() && cli.command.needs_stored_credential() {
        client.authenticate_with_stored_credential().await?;
    }

    // A dropped connection ends the process no matter what the command is
    // waiting on.
    tokio::select! {
        result = execute(&client, cli.command, &config) => {
            match result {
                Ok(()) => Ok(ExitCode::SUCCESS),
                // The waiter can see the drop before the router task finishes
                Err(e) if connection_lost(&e) => {
                    tracing::error!("connection lost: {:#}", e);
                    Ok(ExitCode::from(EXIT_CONNECTION_LOST))
                }
                Err(e) => Err(e),
            }
        }
        router_result = &mut router => {
            match router_result {
                Ok(Err(e)) => tracing::error!("connection lost: {}", e),
                Ok(Ok(())) => tracing::error!("message router stopped"),
                Err(e) => tracing::error!("message router panicked: {}", e),
            }
            Ok(ExitCode::from(EXIT_CONNECTION_LOST))
        }
    }
}

async fn execute(client: &GpmdpClient, command: Command, config: &config::Config) -> Result<()> {
    match command {
        Command::Auth => {
            let token = client.run_interactive_auth(&TerminalPrompt).await?;
            println!("{}={}", AUTH_KEY_ENV, token);
        }
        Command::Pause => client.pause().await?,
        Command::Play => client.play().await?,
        Command::ToggleShuffle => client.toggle_shuffle().await?,
        Command::ToggleRepeat => client.toggle_repeat().await?,
        Command::Next => client.next().await?,
        Command::Prev => client.prev().await?,
        Command::Status => {
            // The player pushes its full state right after connecting
            let _ = tokio::time::timeout(config.status_grace(), client.wait_initialized()).await;
            let state = client.current_status_snapshot().await.context("status")?;
            print!("{}", render_status(&state));
        }
    }
    Ok(())
}

fn connection_lost(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ClientError>()
        .is_some_and(ClientError::is_fatal)
}

fn print_usage() {
    let _ = Cli::command().print_help();
    println!();
}
