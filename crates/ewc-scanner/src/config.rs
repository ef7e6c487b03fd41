//! Scanner configuration

use ewc_session::{SessionTarget, DEFAULT_SSH_PORT};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Controller host is empty")]
    EmptyHost,
    #[error("Username is empty")]
    EmptyUsername,
    #[error("Port must be between 1 and 65535")]
    InvalidPort,
}

/// Controller login settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Controller hostname or IP address
    pub host: String,
    /// Login user
    pub username: String,
    /// Login password; some controllers accept an empty one
    #[serde(default)]
    pub password: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl ScannerConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: String::new(),
            port: DEFAULT_SSH_PORT,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Check the login constraints: host and username set, non-zero port.
    /// The password may be empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }

    /// Validate and convert to a session target
    pub fn target(&self) -> Result<SessionTarget, ConfigError> {
        self.validate()?;
        Ok(SessionTarget {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

impl fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}
