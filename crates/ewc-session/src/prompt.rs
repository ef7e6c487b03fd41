//! Router prompt detection
//!
//! The controller prompt is `<hostname>>` and the hostname is not known before
//! login. The last non-empty line of the banner text received after login is
//! taken as the hostname and compiled into a case-insensitive, line-anchored
//! pattern that is reused for every prompt wait in the session.
//!
//! A banner that ends in the privileged marker (`ewc#`) yields `^<hostname>#`
//! instead, so sessions that log straight into enable mode still synchronise.
//! Matching runs on raw bytes so output is only decoded once it is complete.

use regex::bytes::{Regex, RegexBuilder};
use std::fmt;

use crate::error::SessionError;

/// User EXEC prompt marker
pub const USER_MARKER: char = '>';

/// Privileged EXEC prompt marker
pub const PRIVILEGED_MARKER: char = '#';

/// Compiled prompt matcher for one session
#[derive(Clone)]
pub struct PromptPattern {
    hostname: String,
    marker: char,
    regex: Regex,
}

impl PromptPattern {
    /// Build the `^<hostname>>` matcher for a known hostname
    pub fn from_hostname(hostname: &str) -> Result<Self, SessionError> {
        Self::with_marker(hostname, USER_MARKER)
    }

    /// Build `^<hostname><marker>` for an explicit prompt marker
    pub fn with_marker(hostname: &str, marker: char) -> Result<Self, SessionError> {
        let hostname = hostname.trim();
        if hostname.is_empty() {
            return Err(SessionError::PromptNotDetected);
        }

        let pattern = format!(
            "^{}{}",
            regex::escape(hostname),
            regex::escape(&marker.to_string())
        );
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|e| SessionError::Protocol(format!("invalid prompt pattern: {}", e)))?;

        Ok(Self {
            hostname: hostname.to_string(),
            marker,
            regex,
        })
    }

    /// Derive the prompt from text received right after login
    pub fn from_banner(banner: &str) -> Result<Self, SessionError> {
        let last_line = banner
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or(SessionError::PromptNotDetected)?;

        // The banner usually ends in the prompt itself ("WLC1>" or "WLC1#")
        let marker = if last_line.ends_with(PRIVILEGED_MARKER) {
            PRIVILEGED_MARKER
        } else {
            USER_MARKER
        };
        let hostname = last_line.trim_end_matches([USER_MARKER, PRIVILEGED_MARKER]);
        Self::with_marker(hostname, marker)
    }

    /// Hostname the prompt was built from
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Marker the prompt ends in
    pub fn marker(&self) -> char {
        self.marker
    }

    /// Locate the first prompt in `data`, returning its byte range
    pub fn find(&self, data: &[u8]) -> Option<(usize, usize)> {
        self.regex.find(data).map(|m| (m.start(), m.end()))
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Debug for PromptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptPattern")
            .field("hostname", &self.hostname)
            .field("pattern", &self.regex.as_str())
            .finish()
    }
}
