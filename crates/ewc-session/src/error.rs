//! Session error kinds

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid session target: {0}")]
    InvalidTarget(String),
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectionFailed {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("Prompt not seen within {waited:?} after `{command}`")]
    CommandTimeout { command: String, waited: Duration },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Could not detect router prompt from login banner")]
    PromptNotDetected,
    #[error("Session not ready for commands (state: {0})")]
    NotReady(&'static str),
}
