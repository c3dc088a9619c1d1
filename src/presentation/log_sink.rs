// Log-backed render sink - renders engine updates as tracing events
use crate::application::render_sink::{RenderSink, SeriesSnapshot};
use crate::domain::channel::ChannelId;
use crate::domain::status::DisplayStatus;

/// RenderSink that writes every update to the log. The binary's stand-in
/// for a chart and status display; a UI embeds the engine with its own
/// sink instead.
#[derive(Debug, Default)]
pub struct LogSink;

impl RenderSink for LogSink {
    fn on_series_rebuilt(&self, _labels: &[String], series: &[SeriesSnapshot]) {
        let channels: Vec<String> = series.iter().map(|s| s.channel.to_string()).collect();
        tracing::info!(channels = ?channels, "series rebuilt");
    }

    fn on_series_appended(&self, label: &str, values: &[Option<f64>]) {
        tracing::debug!(label, ?values, "batch appended");
    }

    fn on_channel_scalar(&self, channel: ChannelId, value: Option<f64>) {
        match value {
            Some(value) => tracing::debug!(%channel, value, "channel reading"),
            None => tracing::debug!(%channel, "channel reported without value"),
        }
    }

    fn on_connection_status(&self, connected: bool) {
        if connected {
            tracing::info!("stream connected");
        } else {
            tracing::warn!("stream disconnected");
        }
    }

    fn on_display_status(&self, status: &DisplayStatus) {
        tracing::info!(
            measuring = status.measuring,
            recording = status.recording,
            instrument_connected = status.instrument_connected,
            run_number = status.run_number,
            "acquisition status"
        );
    }
}
