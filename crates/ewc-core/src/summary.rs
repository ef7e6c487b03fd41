//! Parsing of `show wireless client summary` output
//!
//! The controller prints a banner, a header and a separator before the client
//! table. Data rows are recognised purely by shape: exactly eight
//! whitespace-separated fields.

use tracing::{debug, trace};

use crate::mac::normalize_cisco_mac;

/// Number of fields in a client table row
pub const SUMMARY_FIELD_COUNT: usize = 8;

/// Client state reported for associated, authorized clients
pub const RUN_STATE: &str = "Run";

/// One row of the wireless client table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord<'a> {
    /// Hardware address in Cisco dotted-nibble form
    pub mac: &'a str,
    /// Access point the client is associated with
    pub ap_name: &'a str,
    /// Connection type (e.g. "WLAN")
    pub wlan: &'a str,
    /// WLAN identifier
    pub wlan_id: &'a str,
    /// Client state (e.g. "Run", "Idle", "Authenticating")
    pub state: &'a str,
    /// Radio protocol / band
    pub protocol: &'a str,
    /// Authentication method
    pub method: &'a str,
    /// Client role
    pub role: &'a str,
}

impl<'a> ClientRecord<'a> {
    /// Parse a single line of output, returning `None` for anything that is
    /// not a data row (headers, banners, separators, blank lines).
    pub fn parse_row(line: &'a str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != SUMMARY_FIELD_COUNT {
            return None;
        }

        Some(Self {
            mac: parts[0],
            ap_name: parts[1],
            wlan: parts[2],
            wlan_id: parts[3],
            state: parts[4],
            protocol: parts[5],
            method: parts[6],
            role: parts[7],
        })
    }

    /// Whether the client is in the `Run` state (case-sensitive)
    pub fn is_running(&self) -> bool {
        self.state == RUN_STATE
    }

    /// Canonical MAC of this client
    pub fn normalized_mac(&self) -> String {
        normalize_cisco_mac(self.mac)
    }
}

/// Parse every data row out of raw command output, in source order
pub fn parse_client_summary(output: &str) -> Vec<ClientRecord<'_>> {
    output
        .lines()
        .filter_map(|line| {
            let record = ClientRecord::parse_row(line);
            if record.is_none() && !line.trim().is_empty() {
                trace!(line = %line.trim(), "Skipping non-row line");
            }
            record
        })
        .collect()
}

/// Extract canonical MACs of all running clients, preserving row order.
///
/// Duplicates are passed through as-is.
pub fn active_client_macs(output: &str) -> Vec<String> {
    let records = parse_client_summary(output);
    let total = records.len();

    let macs: Vec<String> = records
        .iter()
        .filter(|record| record.is_running())
        .map(ClientRecord::normalized_mac)
        .collect();

    debug!(rows = total, active = macs.len(), "Parsed client summary");
    macs
}
