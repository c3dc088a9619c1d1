// Dashboard synchronization engine - the single-task event loop
use crate::application::control_api::ControlApi;
use crate::application::render_sink::{RenderSink, SeriesSnapshot};
use crate::application::status_service::StatusReconciler;
use crate::domain::channel::{ChannelId, ChannelRegistry, Reading};
use crate::domain::series::SeriesBuffer;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::decoder::{InboundEvent, decode_frame};
use crate::infrastructure::ws_client::{ConnectionManager, WsStream};
use chrono::Local;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// External control surface of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Reset the buffer and run configure -> timer -> start against the
    /// control API. The reset is optimistic and not rolled back if a
    /// control call fails.
    Start { timer_secs: u32 },
    Stop,
    RecordStart,
    RecordStop,
    /// Delegate an export of recorded data to the server.
    Export,
    /// Deliberate shutdown: close the socket, cancel any pending
    /// reconnect, return from `run`.
    Shutdown,
}

/// Cloneable handle for sending commands into a running engine.
#[derive(Clone)]
pub struct SyncEngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl SyncEngineHandle {
    pub async fn send(&self, command: EngineCommand) -> anyhow::Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("sync engine is no longer running"))
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send(EngineCommand::Shutdown).await
    }
}

/// Owns every piece of mutable dashboard state and keeps it in sync with
/// the acquisition server.
///
/// All work happens on one task, driven by a `select!` over the socket,
/// the status-poll timer, the reconnect backoff and the command channel.
/// Each trigger runs to completion before the next is taken, so the
/// registry, buffer and status never need locking and a sink never
/// observes a half-applied update.
pub struct SyncEngine {
    connection: ConnectionManager,
    registry: ChannelRegistry,
    buffer: SeriesBuffer,
    reconciler: StatusReconciler,
    control: Arc<dyn ControlApi>,
    sink: Arc<dyn RenderSink>,
    commands: mpsc::Receiver<EngineCommand>,
    poll_interval: Duration,
}

impl SyncEngine {
    pub fn new(
        config: &EngineConfig,
        control: Arc<dyn ControlApi>,
        sink: Arc<dyn RenderSink>,
    ) -> (Self, SyncEngineHandle) {
        let (tx, rx) = mpsc::channel(16);
        let engine = Self {
            connection: ConnectionManager::new(
                config.connection.ws_url.clone(),
                config.connection.backoff_base(),
                config.connection.backoff_cap(),
            ),
            registry: ChannelRegistry::new(),
            buffer: SeriesBuffer::new(config.buffer.capacity),
            reconciler: StatusReconciler::new(config.control.poll_interval()),
            control,
            sink,
            commands: rx,
            poll_interval: config.control.poll_interval(),
        };
        (engine, SyncEngineHandle { tx })
    }

    /// Run until a shutdown command arrives. Never returns on transport
    /// trouble; the engine always degrades to "disconnected, retrying".
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            match self.connection.connect().await {
                Ok(stream) => {
                    self.sink.on_connection_status(true);
                    let keep_running = self.pump(stream, &mut poll).await;
                    self.sink.on_connection_status(false);
                    if !keep_running {
                        tracing::info!("sync engine shut down");
                        return Ok(());
                    }
                }
                Err(err) => {
                    tracing::warn!("connect failed: {}", err);
                    self.sink.on_connection_status(false);
                }
            }

            let delay = self.connection.schedule_reconnect();
            if !self.wait_for_reconnect(delay, &mut poll).await {
                tracing::info!("sync engine shut down");
                return Ok(());
            }
        }
    }

    /// Drive one open connection. Returns false on deliberate shutdown,
    /// true when the connection ended and a reconnect should follow.
    async fn pump(&mut self, mut stream: WsStream, poll: &mut tokio::time::Interval) -> bool {
        loop {
            tokio::select! {
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => return true,
                    Some(Ok(_)) => {
                        // Binary/ping/pong frames carry nothing for us.
                    }
                    Some(Err(err)) => {
                        // A transport error only updates observable status;
                        // the close (or stream end) that follows schedules
                        // the reconnect, so the pair never schedules twice.
                        tracing::warn!("transport error: {}", err);
                        self.sink.on_connection_status(false);
                    }
                },
                _ = poll.tick() => self.poll_status().await,
                command = self.commands.recv() => match command {
                    Some(EngineCommand::Shutdown) | None => {
                        let _ = stream.close(None).await;
                        self.connection.mark_closed();
                        return false;
                    }
                    Some(command) => self.handle_command(command).await,
                },
            }
        }
    }

    /// Sit out the backoff delay. Commands stay live and the status poll
    /// keeps running while disconnected; a shutdown cancels the pending
    /// reconnect. Returns false on shutdown.
    async fn wait_for_reconnect(
        &mut self,
        delay: Duration,
        poll: &mut tokio::time::Interval,
    ) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                _ = poll.tick() => self.poll_status().await,
                command = self.commands.recv() => match command {
                    Some(EngineCommand::Shutdown) | None => return false,
                    Some(command) => self.handle_command(command).await,
                },
            }
        }
    }

    /// Decode one raw frame and route it. Malformed frames mutate nothing.
    fn handle_frame(&mut self, raw: &str) {
        match decode_frame(raw) {
            Some(InboundEvent::Data(batch)) => self.apply_batch(batch),
            Some(InboundEvent::Status(status)) => {
                let adopted = self.reconciler.apply_push(status, Instant::now());
                self.sink.on_display_status(adopted);
            }
            None => {}
        }
    }

    /// Feed one data batch through the registry and the buffer.
    ///
    /// A batch that changes the channel set only redefines the schema: the
    /// buffer is rebuilt and the batch's values are dropped, so series
    /// state is always reset before any value of the new schema is
    /// appended. Values flow again from the next batch on.
    fn apply_batch(&mut self, batch: Vec<(ChannelId, Option<f64>)>) {
        let captured_at = chrono::Utc::now();
        let mut readings: Vec<Reading> = batch
            .into_iter()
            .map(|(channel, value)| Reading::new(channel, value, captured_at))
            .collect();

        let keys: Vec<ChannelId> = readings.iter().map(|r| r.channel).collect();
        let diff = self.registry.observe(keys);
        if diff.changed {
            tracing::info!(channels = ?diff.keys, "channel set changed, rebuilding series");
            self.buffer.rebuild(&diff.keys);
            self.notify_rebuilt();
            return;
        }

        // Sorting by channel lines readings up with the registered order.
        readings.sort_by_key(|r| r.channel);
        let values: Vec<Option<f64>> = readings.iter().map(|r| r.value).collect();
        let label = captured_at
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string();

        if self.buffer.append(label.clone(), &values) {
            self.sink.on_series_appended(&label, &values);
            for (channel, value) in self.buffer.latest() {
                self.sink.on_channel_scalar(channel, value);
            }
        } else {
            tracing::debug!("dropped batch for a stale channel set");
        }
    }

    fn notify_rebuilt(&self) {
        let labels: Vec<String> = self.buffer.labels().iter().cloned().collect();
        let series: Vec<SeriesSnapshot> = self
            .buffer
            .channels()
            .iter()
            .zip(self.buffer.series())
            .map(|(&channel, values)| SeriesSnapshot {
                channel,
                values: values.iter().copied().collect(),
            })
            .collect();
        self.sink.on_series_rebuilt(&labels, &series);
    }

    async fn poll_status(&mut self) {
        match self.control.fetch_status().await {
            Ok(status) => {
                if let Some(adopted) = self.reconciler.apply_poll(status, Instant::now()) {
                    self.sink.on_display_status(adopted);
                }
            }
            Err(err) => {
                // The poll is a liveness fallback; a failed poll is not an
                // error the user needs to see.
                tracing::debug!("status poll failed: {}", err);
            }
        }
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Start { timer_secs } => {
                // Manual reset with the current channel set. Applied
                // optimistically; a failed control call leaves it in place.
                let keys = self.registry.active().to_vec();
                self.buffer.rebuild(&keys);
                self.notify_rebuilt();

                if let Err(err) = self.run_start_sequence(timer_secs).await {
                    tracing::error!("start sequence failed: {}", err);
                }
            }
            EngineCommand::Stop => match self.control.stop().await {
                Ok(ack) => tracing::info!(status = %ack.status, "acquisition stopped"),
                Err(err) => tracing::error!("stop failed: {}", err),
            },
            EngineCommand::RecordStart => match self.control.record_start().await {
                Ok(ack) => tracing::info!(status = %ack.status, "recording started"),
                Err(err) => tracing::error!("record start failed: {}", err),
            },
            EngineCommand::RecordStop => match self.control.record_stop().await {
                Ok(ack) => tracing::info!(status = %ack.status, "recording stopped"),
                Err(err) => tracing::error!("record stop failed: {}", err),
            },
            EngineCommand::Export => match self.control.export().await {
                Ok(ack) => tracing::info!(status = %ack.status, "export requested"),
                Err(err) => tracing::error!("export failed: {}", err),
            },
            // Handled by the callers of handle_command.
            EngineCommand::Shutdown => {}
        }
    }

    async fn run_start_sequence(&self, timer_secs: u32) -> anyhow::Result<()> {
        let ack = self.control.configure().await?;
        tracing::debug!(status = %ack.status, "configure acknowledged");
        let ack = self.control.set_timer(timer_secs).await?;
        tracing::debug!(status = %ack.status, "timer acknowledged");
        let ack = self.control.start().await?;
        tracing::info!(status = %ack.status, message = %ack.message, "acquisition started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::control_api::{ControlAck, ControlApi};
    use crate::domain::status::DisplayStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum SinkEvent {
        Rebuilt(Vec<ChannelId>, usize),
        Appended(Vec<Option<f64>>),
        Scalar(ChannelId, Option<f64>),
        Connection(bool),
        Status(DisplayStatus),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<SinkEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap().clone()
        }

        fn rebuild_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, SinkEvent::Rebuilt(..)))
                .count()
        }
    }

    impl RenderSink for RecordingSink {
        fn on_series_rebuilt(&self, labels: &[String], series: &[SeriesSnapshot]) {
            let channels = series.iter().map(|s| s.channel).collect();
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Rebuilt(channels, labels.len()));
        }

        fn on_series_appended(&self, _label: &str, values: &[Option<f64>]) {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Appended(values.to_vec()));
        }

        fn on_channel_scalar(&self, channel: ChannelId, value: Option<f64>) {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Scalar(channel, value));
        }

        fn on_connection_status(&self, connected: bool) {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Connection(connected));
        }

        fn on_display_status(&self, status: &DisplayStatus) {
            self.events.lock().unwrap().push(SinkEvent::Status(*status));
        }
    }

    struct NoopControl;

    #[async_trait]
    impl ControlApi for NoopControl {
        async fn configure(&self) -> anyhow::Result<ControlAck> {
            Ok(ack("configured"))
        }
        async fn set_timer(&self, _timer_secs: u32) -> anyhow::Result<ControlAck> {
            Ok(ack("ok"))
        }
        async fn start(&self) -> anyhow::Result<ControlAck> {
            Ok(ack("started"))
        }
        async fn stop(&self) -> anyhow::Result<ControlAck> {
            Ok(ack("stopped"))
        }
        async fn record_start(&self) -> anyhow::Result<ControlAck> {
            Ok(ack("recording_started"))
        }
        async fn record_stop(&self) -> anyhow::Result<ControlAck> {
            Ok(ack("recording_stopped"))
        }
        async fn export(&self) -> anyhow::Result<ControlAck> {
            Ok(ack("exported"))
        }
        async fn fetch_status(&self) -> anyhow::Result<DisplayStatus> {
            Ok(DisplayStatus::default())
        }
    }

    fn ack(status: &str) -> ControlAck {
        ControlAck {
            status: status.to_string(),
            message: String::new(),
        }
    }

    fn engine_with_sink() -> (SyncEngine, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let (engine, _handle) = SyncEngine::new(
            &EngineConfig::default(),
            Arc::new(NoopControl),
            sink.clone(),
        );
        (engine, sink)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (mut engine, sink) = engine_with_sink();

        // First batch: schema detected, rebuild, empty series.
        engine.handle_frame(r#"{"204": 21.883, "205": 22.1}"#);
        assert_eq!(
            sink.events(),
            vec![SinkEvent::Rebuilt(vec![ChannelId(204), ChannelId(205)], 0)]
        );
        assert!(engine.buffer.is_empty());

        // Same keys again: no rebuild, one tick appended.
        engine.handle_frame(r#"{"204": 21.9, "205": 22.0}"#);
        assert_eq!(sink.rebuild_count(), 1);
        assert_eq!(engine.buffer.len(), 1);
        let events = sink.events();
        assert_eq!(
            events[1],
            SinkEvent::Appended(vec![Some(21.9), Some(22.0)])
        );
        assert_eq!(events[2], SinkEvent::Scalar(ChannelId(204), Some(21.9)));
        assert_eq!(events[3], SinkEvent::Scalar(ChannelId(205), Some(22.0)));

        // Replaced channel: rebuild fires again, series reset to empty.
        engine.handle_frame(r#"{"204": 21.9, "206": 5.0}"#);
        assert_eq!(sink.rebuild_count(), 2);
        assert!(engine.buffer.is_empty());
        assert_eq!(
            engine.buffer.channels(),
            &[ChannelId(204), ChannelId(206)]
        );
    }

    #[test]
    fn test_value_changes_never_trigger_rebuild() {
        let (mut engine, sink) = engine_with_sink();
        engine.handle_frame(r#"{"204": 1.0, "205": 2.0}"#);
        for i in 0..5 {
            let frame = format!(r#"{{"205": {}.5, "204": {}.0}}"#, i, i);
            engine.handle_frame(&frame);
        }
        assert_eq!(sink.rebuild_count(), 1);
        assert_eq!(engine.buffer.len(), 5);
    }

    #[test]
    fn test_malformed_frames_mutate_nothing() {
        let (mut engine, sink) = engine_with_sink();
        engine.handle_frame(r#"{"204": 1.0}"#);
        engine.handle_frame(r#"{"204": 2.0}"#);
        let before = sink.events();

        engine.handle_frame("null");
        engine.handle_frame("[]");
        engine.handle_frame("garbage");
        engine.handle_frame(r#"{"data": "not an object"}"#);

        assert_eq!(sink.events(), before);
        assert_eq!(engine.buffer.len(), 1);
        assert_eq!(engine.registry.active(), &[ChannelId(204)]);
    }

    #[test]
    fn test_missing_value_is_placeholder_not_zero() {
        let (mut engine, sink) = engine_with_sink();
        engine.handle_frame(r#"{"204": 1.0, "205": 2.0}"#);
        engine.handle_frame(r#"{"204": null, "205": 2.5}"#);

        let events = sink.events();
        assert!(events.contains(&SinkEvent::Appended(vec![None, Some(2.5)])));
        assert!(events.contains(&SinkEvent::Scalar(ChannelId(204), None)));
    }

    #[test]
    fn test_status_push_reaches_sink() {
        let (mut engine, sink) = engine_with_sink();
        engine.handle_frame(
            r#"{"type": "status", "measuring": true, "recording": true, "connected": true, "run_number": 12}"#,
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let SinkEvent::Status(status) = &events[0] else {
            panic!("expected status event");
        };
        assert!(status.measuring && status.recording && status.instrument_connected);
        assert_eq!(status.run_number, 12);
    }

    #[tokio::test]
    async fn test_start_command_resets_buffer_with_current_channels() {
        let (mut engine, sink) = engine_with_sink();
        engine.handle_frame(r#"{"204": 1.0, "205": 2.0}"#);
        engine.handle_frame(r#"{"204": 1.1, "205": 2.1}"#);
        assert_eq!(engine.buffer.len(), 1);

        engine
            .handle_command(EngineCommand::Start { timer_secs: 1 })
            .await;

        assert!(engine.buffer.is_empty());
        assert_eq!(
            engine.buffer.channels(),
            &[ChannelId(204), ChannelId(205)]
        );
        assert_eq!(sink.rebuild_count(), 2);
    }
}
