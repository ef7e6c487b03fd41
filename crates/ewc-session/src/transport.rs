//! Byte transports for interactive CLI sessions

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::SessionError;
use crate::session::{SessionOptions, SessionTarget};

/// Terminal type requested for the interactive shell
const TERMINAL_TYPE: &str = "vt100";

/// Bidirectional byte stream to a remote shell
#[async_trait]
pub trait Transport: Send {
    /// Write raw bytes to the remote shell
    async fn send(&mut self, data: &[u8]) -> Result<(), SessionError>;

    /// Wait for the next chunk of output. `Ok(None)` means the remote side
    /// closed the channel.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, SessionError>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// russh client callbacks
struct ClientHandler {
    host: String,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // Controllers are addressed by configuration, host keys are not pinned
        debug!(host = %self.host, "Accepting controller host key");
        Ok(true)
    }
}

/// SSH transport running an interactive PTY shell
pub struct SshTransport {
    handle: Handle<ClientHandler>,
    channel: Channel<client::Msg>,
}

impl SshTransport {
    /// Connect, authenticate with a password and open an interactive shell
    pub async fn connect(
        target: &SessionTarget,
        options: &SessionOptions,
    ) -> Result<Self, SessionError> {
        let failed = |reason: String| SessionError::ConnectionFailed {
            host: target.host.clone(),
            port: target.port,
            reason,
        };

        let config = Arc::new(client::Config::default());
        let handler = ClientHandler {
            host: target.host.clone(),
        };

        debug!(host = %target.host, port = target.port, "Opening SSH connection");

        let connect = client::connect(config, (target.host.as_str(), target.port), handler);
        let mut handle = timeout(options.connect_timeout(), connect)
            .await
            .map_err(|_| failed(format!("timed out after {:?}", options.connect_timeout())))?
            .map_err(|e| failed(e.to_string()))?;

        let authenticated = handle
            .authenticate_password(target.username.as_str(), target.password.as_str())
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !authenticated {
            return Err(failed(format!(
                "authentication rejected for user {}",
                target.username
            )));
        }

        debug!(host = %target.host, user = %target.username, "SSH authentication succeeded");

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| failed(e.to_string()))?;
        channel
            .request_pty(false, TERMINAL_TYPE, options.terminal_width, 24, 0, 0, &[])
            .await
            .map_err(|e| failed(e.to_string()))?;
        channel
            .request_shell(false)
            .await
            .map_err(|e| failed(e.to_string()))?;

        Ok(Self { handle, channel })
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        trace!(bytes = data.len(), "Sending to shell");
        self.channel
            .data(data)
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    trace!(bytes = data.len(), "Received shell output");
                    return Ok(Some(data.to_vec()));
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    trace!(bytes = data.len(), "Received shell stderr");
                    return Ok(Some(data.to_vec()));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(other) => trace!(msg = ?other, "Ignoring channel message"),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        // The remote side may already have torn the channel down
        let _ = self.channel.eof().await;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))
    }
}
