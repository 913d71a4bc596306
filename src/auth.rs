//! Two-phase PIN handshake
//!
//! 1. `connect/connect [client]`: the player shows a PIN and answers on the
//!    `connect` channel (payload ignored).
//! 2. `connect/connect [client, pin]`: the player answers with either a
//!    credential string or `CODE_REQUIRED` when the PIN was wrong.
//!
//! A credential from an earlier run is re-asserted with a single
//! `connect/connect [client, credential]` and no wait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::{self, Write};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::bus::ClientEvent;
use crate::client::GpmdpClient;
use crate::error::ClientError;
use crate::protocol::{
    OutboundRequest, ANONYMOUS_CONNECT_ID, CODE_REQUIRED, COMMAND_REQUEST_ID,
    STORED_CREDENTIAL_ID,
};

/// Source of the PIN the player displays
#[async_trait]
pub trait PinPrompt: Send + Sync {
    async fn read_pin(&self) -> Result<String, ClientError>;
}

/// Prompts on stdout and reads one line from stdin
pub struct TerminalPrompt;

#[async_trait]
impl PinPrompt for TerminalPrompt {
    async fn read_pin(&self) -> Result<String, ClientError> {
        tokio::task::spawn_blocking(|| -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(stdout, "Enter a PIN: ")?;
            stdout.flush()?;

            let mut line = String::new();
            if io::stdin().read_line(&mut line)? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no PIN entered"));
            }
            let pin = line.trim();
            if pin.is_empty() {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "no PIN entered"));
            }
            Ok(pin.to_string())
        })
        .await
        .map_err(|e| ClientError::Prompt(io::Error::other(e)))?
        .map_err(ClientError::Prompt)
    }
}

/// Fixed PIN, for scripted use
pub struct StaticPin(pub String);

#[async_trait]
impl PinPrompt for StaticPin {
    async fn read_pin(&self) -> Result<String, ClientError> {
        Ok(self.0.clone())
    }
}

pub struct Authenticator<'a> {
    client: &'a GpmdpClient,
}

impl<'a> Authenticator<'a> {
    pub fn new(client: &'a GpmdpClient) -> Self {
        Self { client }
    }

    pub async fn run_interactive(&self, prompt: &dyn PinPrompt) -> Result<String> {
        let name = self.client.client_name();
        // Subscribe before sending so a fast reply is not missed
        let mut events = self.client.bus().subscribe();

        self.client
            .send(&OutboundRequest::connect(name, None, ANONYMOUS_CONNECT_ID))
            .await
            .context("auth: connect")?;
        let _ = self
            .next_connect_event(&mut events)
            .await
            .context("auth: connect")?;
        debug!("Player is showing a PIN");

        let pin = prompt.read_pin().await.context("auth: get pin")?;

        self.client
            .send(&OutboundRequest::connect(name, Some(&pin), COMMAND_REQUEST_ID))
            .await
            .context("auth: confirm pin")?;
        let response = self
            .next_connect_event(&mut events)
            .await
            .context("auth: confirm pin")?;

        let token = interpret_auth_response(response)?;
        info!("Authenticated as {}", name);
        Ok(token)
    }

    /// Fire-and-forget re-assertion of a stored credential.
    pub async fn reassert(&self, credential: &str) -> Result<(), ClientError> {
        debug!("Re-asserting stored credential");
        self.client
            .send(&OutboundRequest::connect(
                self.client.client_name(),
                Some(credential),
                STORED_CREDENTIAL_ID,
            ))
            .await
    }

    async fn next_connect_event(
        &self,
        events: &mut broadcast::Receiver<ClientEvent>,
    ) -> Result<Value, ClientError> {
        loop {
            let event = tokio::select! {
                biased;
                event = events.recv() => event,
                _ = self.client.closed_token().cancelled() => {
                    return Err(ClientError::closed("during authentication"));
                }
            };
            match event {
                Ok(ClientEvent::Connect { payload }) => return Ok(payload),
                Ok(ClientEvent::Disconnected { reason }) => {
                    return Err(ClientError::Transport(format!(
                        "disconnected during authentication: {}",
                        reason
                    )));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Auth listener lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return Err(ClientError::closed("during authentication")),
            }
        }
    }
}

/// Turn the phase-two payload into a credential.
pub fn interpret_auth_response(response: Value) -> Result<String, ClientError> {
    match response {
        Value::String(token) if token == CODE_REQUIRED => Err(ClientError::InvalidPin),
        Value::String(token) => Ok(token),
        other => Err(ClientError::UnexpectedAuthResponse(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transport::memory::{self, RemoteEnd};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn client() -> (GpmdpClient, RemoteEnd) {
        let (sink, source, remote) = memory::pair(64);
        let (client, _router) = GpmdpClient::from_transport(sink, source, &Config::default());
        (client, remote)
    }

    /// Plays the player's side of the handshake and returns both requests.
    async fn player(
        remote: &mut RemoteEnd,
        final_payload: Value,
    ) -> (OutboundRequest, OutboundRequest) {
        let first = remote.next_request().await.unwrap();
        remote.push_channel("connect", json!("CODE_REQUIRED")).await;
        let second = remote.next_request().await.unwrap();
        remote.push_channel("connect", final_payload).await;
        (first, second)
    }

    #[tokio::test]
    async fn wrong_pin_is_invalid_pin_error() {
        let (client, mut remote) = client();
        let prompt = StaticPin("1234".to_string());

        let (result, _) = tokio::join!(
            client.run_interactive_auth(&prompt),
            player(&mut remote, json!("CODE_REQUIRED"))
        );

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::InvalidPin)
        ));
    }

    #[tokio::test]
    async fn correct_pin_returns_token() {
        let (client, mut remote) = client();
        let prompt = StaticPin("1234".to_string());

        let (result, (first, second)) = tokio::join!(
            client.run_interactive_auth(&prompt),
            player(&mut remote, json!("abc123token"))
        );

        assert_eq!(result.unwrap(), "abc123token");
        assert_eq!(first.namespace, "connect");
        assert_eq!(first.method, "connect");
        assert_eq!(first.arguments, vec![json!("Applescript Invoker")]);
        assert_eq!(
            second.arguments,
            vec![json!("Applescript Invoker"), json!("1234")]
        );
        assert_eq!(second.request_id, 2);
    }

    #[tokio::test]
    async fn non_string_response_is_unexpected() {
        let (client, mut remote) = client();
        let prompt = StaticPin("1234".to_string());

        let (result, _) = tokio::join!(
            client.run_interactive_auth(&prompt),
            player(&mut remote, json!({"token": "abc"}))
        );

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::UnexpectedAuthResponse(_))
        ));
    }

    #[tokio::test]
    async fn state_frames_between_phases_are_skipped() {
        let (client, mut remote) = client();
        let prompt = StaticPin("0000".to_string());

        let (result, _) = tokio::join!(client.run_interactive_auth(&prompt), async {
            remote.next_request().await.unwrap();
            remote.push_initial_state(false).await;
            remote.push_channel("connect", json!("CODE_REQUIRED")).await;
            remote.next_request().await.unwrap();
            remote.push_channel("lyrics", json!("la la")).await;
            remote.push_result(2).await;
            remote.push_channel("connect", json!("tok")).await;
        });

        assert_eq!(result.unwrap(), "tok");
    }

    #[tokio::test]
    async fn disconnect_during_handshake_fails() {
        let (client, mut remote) = client();
        let prompt = StaticPin("1234".to_string());

        let (result, _) = timeout(Duration::from_secs(1), async {
            tokio::join!(client.run_interactive_auth(&prompt), async {
                remote.next_request().await.unwrap();
                remote.disconnect();
            })
        })
        .await
        .expect("handshake should fail instead of hanging");

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn stored_credential_is_sent_without_waiting() {
        let (sink, source, mut remote) = memory::pair(64);
        let config = Config {
            auth_key: Some("stored-key".to_string()),
            ..Config::default()
        };
        let (client, _router) = GpmdpClient::from_transport(sink, source, &config);
        assert!(client.has_stored_credential());

        timeout(
            Duration::from_secs(1),
            client.authenticate_with_stored_credential(),
        )
        .await
        .expect("must not wait for a reply")
        .unwrap();

        let request = remote.try_next_request().unwrap();
        assert_eq!(
            request,
            OutboundRequest::connect("Applescript Invoker", Some("stored-key"), 1)
        );
        assert!(remote.try_next_request().is_none());
    }

    #[tokio::test]
    async fn no_stored_credential_is_a_no_op() {
        let (client, mut remote) = client();
        assert!(!client.has_stored_credential());
        client.authenticate_with_stored_credential().await.unwrap();
        assert!(remote.try_next_request().is_none());
    }

    #[test]
    fn interpret_responses() {
        assert!(matches!(
            interpret_auth_response(json!("CODE_REQUIRED")),
            Err(ClientError::InvalidPin)
        ));
        assert_eq!(interpret_auth_response(json!("t0k")).unwrap(), "t0k");
        assert!(matches!(
            interpret_auth_response(Value::Null),
            Err(ClientError::UnexpectedAuthResponse(Value::Null))
        ));
    }
}
