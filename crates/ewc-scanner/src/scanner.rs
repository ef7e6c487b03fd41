//! Controller scanner with a cached result set

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ewc_core::active_client_macs;
use ewc_session::{SessionError, SessionOptions, SessionTarget};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::config::ScannerConfig;
use crate::source::{SshSummarySource, SummarySource};

/// Why a scan cycle produced no result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Controller returned no client data")]
    EmptyOutput,
}

/// Most recent failed cycle
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub error: ScanError,
    pub at: DateTime<Utc>,
}

/// Interface the host uses to poll a device tracker backend
#[async_trait]
pub trait DeviceScanner: Send {
    /// Refresh and return the identifiers of all present devices
    async fn scan_devices(&mut self) -> Vec<String>;

    /// Human-readable name for a device, if the backend knows one
    fn device_name(&self, device: &str) -> Option<String>;
}

/// Scanner for a Cisco embedded wireless controller
pub struct ControllerScanner<S = SshSummarySource> {
    config: ScannerConfig,
    target: SessionTarget,
    source: S,
    last_results: Vec<String>,
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<ScanFailure>,
    span: Span,
}

impl ControllerScanner<SshSummarySource> {
    /// Build a scanner that talks SSH to the controller
    pub async fn connect(config: ScannerConfig, options: SessionOptions) -> Option<Self> {
        Self::initialize(config, SshSummarySource::new(options)).await
    }
}

impl<S: SummarySource> ControllerScanner<S> {
    /// Create the scanner and run the first cycle.
    ///
    /// Returns `None` if the configuration is invalid or the first cycle
    /// fails, so the host never keeps a scanner it cannot reach.
    pub async fn initialize(config: ScannerConfig, source: S) -> Option<Self> {
        let target = match config.target() {
            Ok(target) => target,
            Err(e) => {
                error!(error = %e, "Invalid Cisco EWC scanner configuration");
                return None;
            }
        };

        let span = info_span!("ewc_scanner", host = %target.host, port = target.port);
        let mut scanner = Self {
            config,
            target,
            source,
            last_results: Vec::new(),
            last_success: None,
            last_failure: None,
            span,
        };

        if !scanner.update_info().await {
            return None;
        }

        scanner
            .span
            .in_scope(|| info!(clients = scanner.last_results.len(), "Initialized Cisco EWC scanner"));
        Some(scanner)
    }

    /// Run a scan cycle and return the current result set.
    ///
    /// A failed cycle leaves the previous results in place.
    pub async fn scan(&mut self) -> &[String] {
        self.update_info().await;
        &self.last_results
    }

    /// Results of the last successful cycle, in table order
    pub fn last_results(&self) -> &[String] {
        &self.last_results
    }

    /// The controller does not keep client names
    pub fn device_name(&self, _device: &str) -> Option<String> {
        None
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Time of the last successful cycle
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    /// The last failed cycle, cleared by the next success
    pub fn last_failure(&self) -> Option<&ScanFailure> {
        self.last_failure.as_ref()
    }

    /// Refresh the cached results, returning whether the cycle succeeded
    async fn update_info(&mut self) -> bool {
        let span = self.span.clone();

        async {
            match self.fetch_active_clients().await {
                Ok(macs) => {
                    debug!(clients = macs.len(), "Scan cycle complete");
                    self.last_results = macs;
                    self.last_success = Some(Utc::now());
                    self.last_failure = None;
                    true
                }
                Err(e) => {
                    match &e {
                        ScanError::Session(SessionError::ConnectionFailed { .. }) => {
                            error!(error = %e, "Failed to log in to controller")
                        }
                        _ => warn!(error = %e, "Scan cycle failed, keeping previous results"),
                    }
                    self.last_failure = Some(ScanFailure {
                        error: e,
                        at: Utc::now(),
                    });
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_active_clients(&self) -> Result<Vec<String>, ScanError> {
        let output = self.source.fetch_client_summary(&self.target).await?;
        if output.is_empty() {
            return Err(ScanError::EmptyOutput);
        }
        Ok(active_client_macs(&output))
    }
}

#[async_trait]
impl<S: SummarySource> DeviceScanner for ControllerScanner<S> {
    async fn scan_devices(&mut self) -> Vec<String> {
        self.scan().await.to_vec()
    }

    fn device_name(&self, device: &str) -> Option<String> {
        ControllerScanner::device_name(self, device)
    }
}
