//! Prompt-synchronised CLI session
//!
//! Lifecycle: `connect` yields an `Authenticated` session, then
//! `PromptDetected -> Ready -> Closed`. Any failure closes the session and
//! keeps the error. Output is buffered as bytes and decoded once per command.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace};

use crate::error::SessionError;
use crate::prompt::PromptPattern;
use crate::transport::{SshTransport, Transport};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Disables output pagination for the rest of the session
pub const TERMINAL_LENGTH_ZERO: &str = "terminal length 0";

/// Lower bound on each banner read, so a zero settle period cannot spin
const MIN_SETTLE: Duration = Duration::from_millis(10);

/// Where and as whom to log in
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl SessionTarget {
    /// Validate and build a target. The password may be empty.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let host = host.into();
        let username = username.into();

        if host.trim().is_empty() {
            return Err(SessionError::InvalidTarget("host is empty".to_string()));
        }
        if port == 0 {
            return Err(SessionError::InvalidTarget("port must be 1-65535".to_string()));
        }
        if username.trim().is_empty() {
            return Err(SessionError::InvalidTarget("username is empty".to_string()));
        }

        Ok(Self {
            host,
            port,
            username,
            password: password.into(),
        })
    }
}

impl fmt::Debug for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Wait policy for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// TCP connect + SSH handshake limit in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// How long to wait for the prompt after a command, in seconds
    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout_secs: u64,
    /// Quiet period that ends banner capture after login, in milliseconds
    #[serde(default = "default_login_settle")]
    pub login_settle_ms: u64,
    /// PTY width; wide enough that table rows do not wrap
    #[serde(default = "default_terminal_width")]
    pub terminal_width: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            prompt_timeout_secs: default_prompt_timeout(),
            login_settle_ms: default_login_settle(),
            terminal_width: default_terminal_width(),
        }
    }
}

impl SessionOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_prompt_timeout() -> u64 {
    10
}

fn default_login_settle() -> u64 {
    750
}

fn default_terminal_width() -> u32 {
    200
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    PromptDetected,
    Ready,
    Closed,
}

impl SessionState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::PromptDetected => "prompt-detected",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

/// Interactive CLI session over a [`Transport`]
pub struct CliSession<T: Transport> {
    transport: Option<T>,
    options: SessionOptions,
    state: SessionState,
    prompt: Option<PromptPattern>,
    buffer: Vec<u8>,
    error: Option<SessionError>,
}

impl CliSession<SshTransport> {
    /// Open an SSH session and log in
    pub async fn connect(
        target: &SessionTarget,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        debug!(host = %target.host, port = target.port, "Connecting");
        let transport = SshTransport::connect(target, &options).await?;
        Ok(Self::from_transport(transport, options))
    }
}

impl<T: Transport> CliSession<T> {
    /// Wrap a transport that has already been authenticated
    pub fn from_transport(transport: T, options: SessionOptions) -> Self {
        Self {
            transport: Some(transport),
            options,
            state: SessionState::Authenticated,
            prompt: None,
            buffer: Vec::new(),
            error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn prompt(&self) -> Option<&PromptPattern> {
        self.prompt.as_ref()
    }

    /// Error that closed the session, if any
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Capture the banner sent after login and derive the prompt from it.
    ///
    /// Capture ends once the remote side has been quiet for the login settle
    /// period. Fails if nothing arrives within the prompt timeout.
    pub async fn detect_prompt(&mut self) -> Result<PromptPattern, SessionError> {
        if self.state != SessionState::Authenticated {
            return Err(SessionError::NotReady(self.state.as_str()));
        }

        let result = self.capture_banner().await;
        let banner = match result {
            Ok(banner) => banner,
            Err(e) => return Err(self.fail(e).await),
        };

        match PromptPattern::from_banner(&banner) {
            Ok(prompt) => {
                debug!(hostname = %prompt.hostname(), "Detected router prompt");
                self.prompt = Some(prompt.clone());
                self.state = SessionState::PromptDetected;
                Ok(prompt)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Disable pagination so long tables arrive in one capture
    pub async fn configure(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::PromptDetected {
            return Err(SessionError::NotReady(self.state.as_str()));
        }

        self.exchange(TERMINAL_LENGTH_ZERO).await?;
        self.state = SessionState::Ready;
        debug!("Pagination disabled");
        Ok(())
    }

    /// Send a command and return everything printed before the next prompt
    pub async fn run_command(&mut self, command: &str) -> Result<String, SessionError> {
        if self.state != SessionState::Ready {
            return Err(SessionError::NotReady(self.state.as_str()));
        }

        self.exchange(command).await
    }

    /// Release the transport. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!(error = %e, "Error while closing session transport");
            }
        }
        self.state = SessionState::Closed;
    }

    async fn exchange(&mut self, command: &str) -> Result<String, SessionError> {
        let sent = match self.transport.as_mut() {
            Some(transport) => transport.send(format!("{}\n", command).as_bytes()).await,
            None => Err(SessionError::NotReady(SessionState::Closed.as_str())),
        };
        if let Err(e) = sent {
            return Err(self.fail(e).await);
        }

        match self.read_until_prompt(command).await {
            Ok(output) => Ok(output),
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn capture_banner(&mut self) -> Result<String, SessionError> {
        let deadline = Instant::now() + self.options.prompt_timeout();
        let settle = self.options.login_settle().max(MIN_SETTLE);

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = settle.min(deadline - now);

            match timeout(wait, self.recv_chunk()).await {
                Ok(Ok(Some(chunk))) => self.buffer.extend_from_slice(&chunk),
                Ok(Ok(None)) => {
                    return Err(SessionError::Protocol(
                        "channel closed during login".to_string(),
                    ))
                }
                Ok(Err(e)) => return Err(e),
                // Quiet period elapsed
                Err(_) if !self.buffer.is_empty() => break,
                Err(_) => {}
            }
        }

        if self.buffer.is_empty() {
            return Err(SessionError::CommandTimeout {
                command: "<login>".to_string(),
                waited: self.options.prompt_timeout(),
            });
        }

        let banner = String::from_utf8_lossy(&std::mem::take(&mut self.buffer)).into_owned();
        trace!(banner = %banner, "Captured login banner");
        Ok(banner)
    }

    async fn read_until_prompt(&mut self, command: &str) -> Result<String, SessionError> {
        let prompt = self
            .prompt
            .clone()
            .ok_or(SessionError::NotReady(self.state.as_str()))?;
        let waited = self.options.prompt_timeout();
        let deadline = Instant::now() + waited;

        loop {
            if let Some((start, end)) = prompt.find(&self.buffer) {
                let output = String::from_utf8_lossy(&self.buffer[..start]).into_owned();
                self.buffer = self.buffer.split_off(end);
                trace!(command = %command, bytes = output.len(), "Prompt matched");
                return Ok(output);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.recv_chunk()).await {
                Ok(Ok(Some(chunk))) => self.buffer.extend_from_slice(&chunk),
                Ok(Ok(None)) => {
                    return Err(SessionError::Protocol(format!(
                        "channel closed while waiting for prompt after `{}`",
                        command
                    )))
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(SessionError::CommandTimeout {
                        command: command.to_string(),
                        waited,
                    })
                }
            }
        }
    }

    async fn recv_chunk(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(SessionError::NotReady(SessionState::Closed.as_str()))?;

        transport.recv().await
    }

    /// Close on failure, keeping the error for later inspection
    async fn fail(&mut self, error: SessionError) -> SessionError {
        debug!(error = %error, state = self.state.as_str(), "Session failed");
        self.close().await;
        self.error = Some(error.clone());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replies to known command lines, otherwise stays silent
    struct ScriptedTransport {
        pending: VecDeque<Vec<u8>>,
        replies: Vec<(String, String)>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
        hang_when_idle: bool,
    }

    impl ScriptedTransport {
        fn new(banner: &str) -> Self {
            Self {
                pending: VecDeque::from(vec![banner.as_bytes().to_vec()]),
                replies: Vec::new(),
                sent: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(false)),
                hang_when_idle: true,
            }
        }

        fn reply(mut self, command: &str, output: &str) -> Self {
            self.replies.push((format!("{}\n", command), output.to_string()));
            self
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
            let line = String::from_utf8_lossy(data).into_owned();
            self.sent.lock().unwrap().push(line.clone());
            if let Some((_, output)) = self.replies.iter().find(|(cmd, _)| *cmd == line) {
                self.pending.push_back(output.as_bytes().to_vec());
            }
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
            match self.pending.pop_front() {
                Some(chunk) => Ok(Some(chunk)),
                None if self.hang_when_idle => std::future::pending().await,
                None => Ok(None),
            }
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn fast_options() -> SessionOptions {
        SessionOptions {
            connect_timeout_secs: 1,
            prompt_timeout_secs: 1,
            login_settle_ms: 20,
            terminal_width: 200,
        }
    }

    #[test]
    fn test_target_validation() {
        assert!(SessionTarget::new("wlc", 22, "admin", "").is_ok());
        assert!(matches!(
            SessionTarget::new("", 22, "admin", "pw"),
            Err(SessionError::InvalidTarget(_))
        ));
        assert!(matches!(
            SessionTarget::new("wlc", 0, "admin", "pw"),
            Err(SessionError::InvalidTarget(_))
        ));
        assert!(matches!(
            SessionTarget::new("wlc", 22, " ", "pw"),
            Err(SessionError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_target_debug_hides_password() {
        let target = SessionTarget::new("wlc", 22, "admin", "hunter2").unwrap();
        let debug = format!("{:?}", target);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("admin"));
    }

    #[tokio::test]
    async fn test_full_command_cycle() {
        let transport = ScriptedTransport::new("\r\nAuthorized users only\r\n\r\nWLC1>")
            .reply("terminal length 0", "terminal length 0\r\nWLC1>")
            .reply(
                "show wireless client summary",
                "show wireless client summary\r\nNumber of Clients: 1\r\n001d.ec02.07ab AP1 WLAN 1 Run 11ac None Local\r\n\r\nWLC1>",
            );
        let sent = transport.sent.clone();
        let closed = transport.closed.clone();

        let mut session = CliSession::from_transport(transport, fast_options());
        assert_eq!(session.state(), SessionState::Authenticated);

        let prompt = session.detect_prompt().await.unwrap();
        assert_eq!(prompt.hostname(), "WLC1");
        assert_eq!(session.state(), SessionState::PromptDetected);

        session.configure().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        let output = session.run_command("show wireless client summary").await.unwrap();
        assert_eq!(
            output,
            "show wireless client summary\r\nNumber of Clients: 1\r\n001d.ec02.07ab AP1 WLAN 1 Run 11ac None Local\r\n\r\n"
        );

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(*closed.lock().unwrap());
        assert_eq!(
            *sent.lock().unwrap(),
            vec!["terminal length 0\n", "show wireless client summary\n"]
        );
    }

    #[tokio::test]
    async fn test_prompt_split_across_chunks() {
        let transport = ScriptedTransport::new("wlc1>");
        let mut session = CliSession::from_transport(transport, fast_options());
        session.detect_prompt().await.unwrap();

        // Feed the reply in fragments that split the prompt itself
        if let Some(t) = session.transport.as_mut() {
            t.pending.extend([
                b"terminal length 0\r\nWL".to_vec(),
                b"C1".to_vec(),
                b">".to_vec(),
            ]);
        }
        session.configure().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_privileged_prompt_session() {
        let transport = ScriptedTransport::new("\r\newc#")
            .reply("terminal length 0", "terminal length 0\r\newc#")
            .reply(
                "show wireless client summary",
                "show wireless client summary\r\nNumber of Clients: 0\r\newc#",
            );

        let mut session = CliSession::from_transport(transport, fast_options());
        let prompt = session.detect_prompt().await.unwrap();
        assert_eq!(prompt.marker(), '#');

        session.configure().await.unwrap();
        let output = session.run_command("show wireless client summary").await.unwrap();
        assert_eq!(output, "show wireless client summary\r\nNumber of Clients: 0\r\n");
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        let transport = ScriptedTransport::new("WLC1>")
            .reply("terminal length 0", "terminal length 0\r\nWLC1>");
        let mut session = CliSession::from_transport(transport, fast_options());
        session.detect_prompt().await.unwrap();
        session.configure().await.unwrap();

        let row = "é AP WLAN 1 Run x y z\r\nWLC1>".as_bytes();
        if let Some(t) = session.transport.as_mut() {
            t.pending.extend([row[..1].to_vec(), row[1..].to_vec()]);
        }

        let output = session.run_command("show wireless client summary").await.unwrap();
        assert_eq!(output, "é AP WLAN 1 Run x y z\r\n");
    }

    #[tokio::test]
    async fn test_zero_settle_still_waits_for_banner() {
        let mut transport = ScriptedTransport::new("");
        transport.pending.clear();

        let options = SessionOptions {
            login_settle_ms: 0,
            ..fast_options()
        };
        let started = Instant::now();
        let mut session = CliSession::from_transport(transport, options);

        let err = session.detect_prompt().await.unwrap_err();
        assert!(matches!(err, SessionError::CommandTimeout { .. }));
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_command_timeout_closes_session() {
        let transport = ScriptedTransport::new("WLC1>")
            .reply("terminal length 0", "terminal length 0\r\nWLC1>");
        let closed = transport.closed.clone();

        let mut session = CliSession::from_transport(transport, fast_options());
        session.detect_prompt().await.unwrap();
        session.configure().await.unwrap();

        // No scripted reply: the prompt never comes back
        let err = session.run_command("show wireless client summary").await.unwrap_err();
        assert!(matches!(err, SessionError::CommandTimeout { ref command, .. } if command == "show wireless client summary"));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.error(), Some(&err));
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_channel_closed_is_protocol_error() {
        let mut transport = ScriptedTransport::new("WLC1>");
        transport.hang_when_idle = false;

        let mut session = CliSession::from_transport(transport, fast_options());
        // Banner arrives, then the channel reports EOF before going quiet
        let err = session.detect_prompt().await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_silent_login_times_out() {
        let mut transport = ScriptedTransport::new("");
        transport.pending.clear();

        let mut session = CliSession::from_transport(transport, fast_options());
        let err = session.detect_prompt().await.unwrap_err();
        assert!(matches!(err, SessionError::CommandTimeout { .. }));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_blank_banner_has_no_prompt() {
        let transport = ScriptedTransport::new("\r\n   \r\n");
        let mut session = CliSession::from_transport(transport, fast_options());
        assert_eq!(
            session.detect_prompt().await.unwrap_err(),
            SessionError::PromptNotDetected
        );
    }

    #[tokio::test]
    async fn test_commands_require_ready_state() {
        let transport = ScriptedTransport::new("WLC1>");
        let mut session = CliSession::from_transport(transport, fast_options());

        assert!(matches!(
            session.run_command("show version").await,
            Err(SessionError::NotReady(_))
        ));
        assert!(matches!(session.configure().await, Err(SessionError::NotReady(_))));

        session.close().await;
        assert!(matches!(
            session.detect_prompt().await,
            Err(SessionError::NotReady("closed"))
        ));
    }
}
