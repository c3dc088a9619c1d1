// HTTP control client - acquisition start/stop/configure endpoints
use crate::application::control_api::{ControlAck, ControlApi};
use crate::domain::status::DisplayStatus;
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("control request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("control endpoint {endpoint} returned {status}")]
    Rejected {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
}

/// Reqwest-backed implementation of the control API.
///
/// `base_url` is the server prefix, e.g. `http://localhost:8000/pt100`;
/// the measurement endpoints hang off `api/`, the export action off the
/// prefix itself. Failures are surfaced to the caller and never retried.
#[derive(Debug, Clone)]
pub struct HttpControlClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpControlClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn post(
        &self,
        endpoint: &'static str,
        body: Option<serde_json::Value>,
    ) -> Result<ControlAck, ControlError> {
        let mut request = self.client.post(self.endpoint_url(endpoint));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ControlError::Rejected {
                endpoint,
                status: response.status(),
            });
        }

        Ok(response.json::<ControlAck>().await?)
    }
}

#[async_trait]
impl ControlApi for HttpControlClient {
    async fn configure(&self) -> anyhow::Result<ControlAck> {
        Ok(self.post("api/configure", None).await?)
    }

    async fn set_timer(&self, timer_secs: u32) -> anyhow::Result<ControlAck> {
        Ok(self
            .post("api/state/timer", Some(json!({ "timer": timer_secs })))
            .await?)
    }

    async fn start(&self) -> anyhow::Result<ControlAck> {
        Ok(self.post("api/start", None).await?)
    }

    async fn stop(&self) -> anyhow::Result<ControlAck> {
        Ok(self.post("api/stop", None).await?)
    }

    async fn record_start(&self) -> anyhow::Result<ControlAck> {
        Ok(self.post("api/record/start", None).await?)
    }

    async fn record_stop(&self) -> anyhow::Result<ControlAck> {
        Ok(self.post("api/record/stop", None).await?)
    }

    async fn export(&self) -> anyhow::Result<ControlAck> {
        Ok(self.post("to_excel", None).await?)
    }

    async fn fetch_status(&self) -> anyhow::Result<DisplayStatus> {
        let response = self
            .client
            .get(self.endpoint_url("api/status"))
            .send()
            .await
            .map_err(ControlError::Transport)?;

        if !response.status().is_success() {
            return Err(ControlError::Rejected {
                endpoint: "api/status",
                status: response.status(),
            }
            .into());
        }

        Ok(response
            .json::<DisplayStatus>()
            .await
            .map_err(ControlError::Transport)?)
    }
}
