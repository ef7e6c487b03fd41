//! EWC Scanner - Active wireless client discovery for Cisco controllers
//!
//! One scan cycle logs into the controller, lists wireless clients and keeps
//! the MACs of those in the `Run` state as the current result set.

pub mod config;
pub mod scanner;
pub mod source;

pub use config::{ConfigError, ScannerConfig};
pub use scanner::{ControllerScanner, DeviceScanner, ScanError, ScanFailure};
pub use source::{
    collect_client_summary, SshSummarySource, SummarySource, SHOW_WIRELESS_CLIENT_SUMMARY,
};
