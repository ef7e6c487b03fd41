//! Raw client summary retrieval

use async_trait::async_trait;
use ewc_session::{CliSession, SessionError, SessionOptions, SessionTarget, Transport};
use tracing::debug;

/// Lists every wireless client known to the controller
pub const SHOW_WIRELESS_CLIENT_SUMMARY: &str = "show wireless client summary";

/// Produces the raw text of the client summary command
#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn fetch_client_summary(&self, target: &SessionTarget) -> Result<String, SessionError>;
}

/// Fetches the summary over a fresh SSH session per call
#[derive(Debug, Clone, Default)]
pub struct SshSummarySource {
    options: SessionOptions,
}

impl SshSummarySource {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SummarySource for SshSummarySource {
    async fn fetch_client_summary(&self, target: &SessionTarget) -> Result<String, SessionError> {
        let mut session = CliSession::connect(target, self.options.clone()).await?;

        let result = collect_client_summary(&mut session).await;
        session.close().await;

        debug!(host = %target.host, ok = result.is_ok(), "Session closed");
        result
    }
}

/// Run the command sequence on a logged-in session: detect the prompt,
/// disable paging, then capture the client summary.
pub async fn collect_client_summary<T: Transport>(
    session: &mut CliSession<T>,
) -> Result<String, SessionError> {
    session.detect_prompt().await?;
    session.configure().await?;
    session.run_command(SHOW_WIRELESS_CLIENT_SUMMARY).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ewc_session::SessionState;
    use std::collections::VecDeque;

    /// Emits the banner, then one canned reply per line sent
    struct CannedShell {
        output: VecDeque<Vec<u8>>,
        replies: VecDeque<&'static str>,
    }

    #[async_trait]
    impl Transport for CannedShell {
        async fn send(&mut self, _data: &[u8]) -> Result<(), SessionError> {
            if let Some(reply) = self.replies.pop_front() {
                self.output.push_back(reply.as_bytes().to_vec());
            }
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
            match self.output.pop_front() {
                Some(chunk) => Ok(Some(chunk)),
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn options() -> SessionOptions {
        SessionOptions {
            prompt_timeout_secs: 1,
            login_settle_ms: 20,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_collect_client_summary() {
        let shell = CannedShell {
            output: VecDeque::from(vec![b"\r\newc-9800>".to_vec()]),
            replies: VecDeque::from(vec![
                "terminal length 0\r\newc-9800>",
                "show wireless client summary\r\nd34d.b33f.caff APname WLAN 1 Run 2.4GHz None Local\r\nEWC-9800>",
            ]),
        };

        let mut session = CliSession::from_transport(shell, options());
        let output = collect_client_summary(&mut session).await.unwrap();

        assert_eq!(
            ewc_core::active_client_macs(&output),
            vec!["D3:4D:B3:3F:CA:FF"]
        );
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_collect_stops_at_first_failure() {
        let shell = CannedShell {
            output: VecDeque::from(vec![b"ewc>".to_vec()]),
            replies: VecDeque::new(),
        };

        let mut session = CliSession::from_transport(shell, options());
        let err = collect_client_summary(&mut session).await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::CommandTimeout { ref command, .. } if command == "terminal length 0"
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }
}
