// Engine configuration loaded from config/engine.toml
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub control: ControlSettings,
    #[serde(default)]
    pub buffer: BufferSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionSettings {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControlSettings {
    #[serde(default = "default_control_base_url")]
    pub base_url: String,
    #[serde(default = "default_status_poll_secs")]
    pub status_poll_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BufferSettings {
    #[serde(default = "default_buffer_capacity")]
    pub capacity: usize,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/pt100/ws".to_string()
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_control_base_url() -> String {
    "http://localhost:8000/pt100".to_string()
}

fn default_status_poll_secs() -> u64 {
    5
}

fn default_buffer_capacity() -> usize {
    50
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
        }
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            base_url: default_control_base_url(),
            status_poll_secs: default_status_poll_secs(),
        }
    }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity: default_buffer_capacity(),
        }
    }
}

impl ConnectionSettings {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }
}

impl ControlSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_secs)
    }
}

pub fn load_engine_config() -> anyhow::Result<EngineConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/engine").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
