// Connection and acquisition status models
use serde::Deserialize;

/// Lifecycle state of the duplex connection. Owned exclusively by the
/// connection manager; everything else only observes transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }
}

/// Canonical displayed acquisition status.
///
/// The same wire shape arrives on both the push channel (a `type: "status"`
/// frame) and the poll endpoint (`GET api/status`). Older server variants
/// omit `connected` and `run_number`, so every field defaults rather than
/// failing the decode. Each update fully replaces the previous status; no
/// per-field merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct DisplayStatus {
    #[serde(default)]
    pub measuring: bool,
    #[serde(default)]
    pub recording: bool,
    #[serde(default, rename = "connected")]
    pub instrument_connected: bool,
    #[serde(default)]
    pub run_number: i64,
}
