// WebSocket connection management - lifecycle state and reconnect backoff
use crate::domain::status::ConnectionState;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Exponential reconnect backoff with a ceiling.
///
/// Delays double per consecutive failure, starting at `base` and clamped
/// at `cap`, with no attempt limit: a monitoring dashboard must eventually
/// recover without manual intervention. One successful open resets the
/// sequence to `base`.
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    /// Delay to wait before the next attempt, advancing the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(31));
        let delay = self.base.saturating_mul(factor).min(self.cap);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

/// Owns the duplex connection handle and its lifecycle state.
///
/// No other component opens or closes the socket; they observe state
/// transitions through the render sink and enqueue sends through the
/// engine. A transport error only updates observable status - the close
/// that follows it is what schedules the reconnect, so an error/close pair
/// never schedules twice.
pub struct ConnectionManager {
    url: String,
    state: ConnectionState,
    backoff: Backoff,
}

impl ConnectionManager {
    pub fn new(url: String, backoff_base: Duration, backoff_cap: Duration) -> Self {
        Self {
            url,
            state: ConnectionState::Closed,
            backoff: Backoff::new(backoff_base, backoff_cap),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Attempt to open the duplex connection. On success the state flips
    /// to `Open` and the backoff sequence resets.
    pub async fn connect(&mut self) -> Result<WsStream, tokio_tungstenite::tungstenite::Error> {
        self.state = ConnectionState::Connecting;
        tracing::debug!(url = %self.url, attempt = self.backoff.attempts(), "connecting");

        match connect_async(self.url.as_str()).await {
            Ok((stream, _response)) => {
                self.state = ConnectionState::Open;
                self.backoff.reset();
                tracing::info!(url = %self.url, "connection open");
                Ok(stream)
            }
            Err(err) => {
                self.state = ConnectionState::Closed;
                Err(err)
            }
        }
    }

    /// Record a confirmed close and return the delay before the next
    /// reconnect attempt.
    pub fn schedule_reconnect(&mut self) -> Duration {
        self.state = ConnectionState::Closed;
        let delay = self.backoff.next_delay();
        tracing::warn!(delay_ms = delay.as_millis() as u64, "connection closed, reconnect scheduled");
        delay
    }

    /// Mark a deliberate shutdown; no reconnect follows.
    pub fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
    }
}
