//! EWC Core - MAC normalization and client summary parsing
//!
//! This crate holds the pure data handling of the tracker:
//! - Conversion of Cisco dotted-nibble hardware addresses to canonical MACs
//! - The row model for `show wireless client summary` output
//! - Extraction of active (`Run` state) clients from raw command output

pub mod mac;
pub mod summary;

pub use mac::normalize_cisco_mac;
pub use summary::{active_client_macs, parse_client_summary, ClientRecord, RUN_STATE};
