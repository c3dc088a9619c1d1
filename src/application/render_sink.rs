// Render sink interface - how the engine pushes updates outward
use crate::domain::channel::ChannelId;
use crate::domain::status::DisplayStatus;

/// One channel's full series, handed out on rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub channel: ChannelId,
    pub values: Vec<Option<f64>>,
}

/// External collaborator receiving push notifications from the engine.
///
/// A sink owns no engine state and is never called with a half-updated
/// buffer: every notification happens after the corresponding mutation has
/// completed. Implementations are expected to be cheap; the engine calls
/// them from its event loop.
pub trait RenderSink: Send + Sync {
    /// The channel set changed (or a manual reset occurred); all series
    /// were discarded and re-created in the given order.
    fn on_series_rebuilt(&self, labels: &[String], series: &[SeriesSnapshot]);

    /// One batch was appended: one new label tick plus one value per
    /// registered channel, positionally matching the last rebuild's order.
    fn on_series_appended(&self, label: &str, values: &[Option<f64>]);

    /// Latest scalar value for one channel, `None` when the server reported
    /// the channel without a valid measurement.
    fn on_channel_scalar(&self, channel: ChannelId, value: Option<f64>);

    /// The duplex connection went up or down.
    fn on_connection_status(&self, connected: bool);

    /// A new canonical acquisition status was adopted.
    fn on_display_status(&self, status: &DisplayStatus);
}
