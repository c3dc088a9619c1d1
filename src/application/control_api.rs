// Control API trait - seam in front of the acquisition server's endpoints
use crate::domain::status::DisplayStatus;
use async_trait::async_trait;
use serde::Deserialize;

/// Acknowledgement shape the acquisition server replies with on control
/// actions, e.g. `{"status": "started", "message": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Request/response collaborator owning the acquisition control endpoints.
///
/// Every call maps to one HTTP request; a non-2xx reply or a transport
/// failure surfaces as an error and is never retried by the engine.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Configure the instrument for a measurement run.
    async fn configure(&self) -> anyhow::Result<ControlAck>;

    /// Set the acquisition timer interval, in seconds.
    async fn set_timer(&self, timer_secs: u32) -> anyhow::Result<ControlAck>;

    /// Start the measurement loop.
    async fn start(&self) -> anyhow::Result<ControlAck>;

    /// Stop the measurement loop (also stops recording server-side).
    async fn stop(&self) -> anyhow::Result<ControlAck>;

    /// Start recording readings server-side.
    async fn record_start(&self) -> anyhow::Result<ControlAck>;

    /// Stop recording and flush the server-side record buffer.
    async fn record_stop(&self) -> anyhow::Result<ControlAck>;

    /// Ask the server to export recorded data. Opaque delegated action.
    async fn export(&self) -> anyhow::Result<ControlAck>;

    /// Pull the current acquisition status (the poll half of status
    /// reconciliation).
    async fn fetch_status(&self) -> anyhow::Result<DisplayStatus>;
}
