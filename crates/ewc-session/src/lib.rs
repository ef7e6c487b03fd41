//! EWC Session - Interactive SSH shell sessions for Cisco controllers
//!
//! This crate drives a prompt-synchronised CLI session:
//! - SSH transport with password login and an interactive PTY shell
//! - Dynamic prompt detection from the post-login banner
//! - Pagination disabling and command capture up to the next prompt

pub mod error;
pub mod prompt;
pub mod session;
pub mod transport;

pub use error::SessionError;
pub use prompt::PromptPattern;
pub use session::{
    CliSession, SessionOptions, SessionState, SessionTarget, DEFAULT_SSH_PORT,
    TERMINAL_LENGTH_ZERO,
};
pub use transport::{SshTransport, Transport};
