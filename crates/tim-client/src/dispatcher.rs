//! HTTP dispatcher for compute requests.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tim_protocol::{
    is_compatible, ComputeRequest, ComputeResponse, HealthResponse, ShutdownResponse,
    COMPUTE_PATH, HEALTH_PATH, PROTOCOL_VERSION, SHUTDOWN_PATH,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{DispatchError, DispatchResult};

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Server base URL, e.g. `http://127.0.0.1:8765`.
    pub base_url: String,
    /// Timeout for the health check and shutdown.
    pub health_timeout: Duration,
    /// Timeout for a compute request, which includes solving.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8765".to_string(),
            health_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(3600),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl DispatcherConfig {
    /// Default configuration for a server on localhost at `port`.
    pub fn localhost(port: u16) -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TIM_SERVER_URL") {
            config.base_url = url;
        }

        if let Ok(val) = std::env::var("TIM_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("TIM_HEALTH_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.health_timeout = Duration::from_secs(secs);
            }
        }

        config
    }
}

/// Sends requests to one compute server.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> DispatchResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| DispatchError::Protocol(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn not_running(&self, reason: impl ToString) -> DispatchError {
        DispatchError::ServerNotRunning {
            url: self.config.base_url.clone(),
            reason: reason.to_string(),
        }
    }

    /// Liveness and version check.
    pub async fn health(&self) -> DispatchResult<HealthResponse> {
        let response = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(self.config.health_timeout)
            .send()
            .await
            .map_err(|e| self.not_running(e))?;

        if !response.status().is_success() {
            return Err(self.not_running(format!("health check returned {}", response.status())));
        }

        response
            .json::<HealthResponse>()
            .await
            .map_err(|e| self.not_running(format!("invalid health response: {}", e)))
    }

    /// Check the server is up, then send `request` and wait for the answer.
    #[instrument(skip_all, fields(path = %request.path, cellsize = request.cellsize, mode = ?request.mode))]
    pub async fn send(&self, request: &ComputeRequest) -> DispatchResult<ComputeResponse> {
        let health = self.health().await?;
        if !is_compatible(&health.version, PROTOCOL_VERSION) {
            return Err(DispatchError::VersionMismatch {
                server: health.version,
                client: PROTOCOL_VERSION.to_string(),
            });
        }
        debug!(pid = health.pid, state = %health.state, "Server is alive");

        let response = self
            .client
            .post(self.url(COMPUTE_PATH))
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| DispatchError::ServerUnreachable(e.to_string()))?;

        let status = response.status();
        let body: ComputeResponse = decode(response).await?;

        if status == StatusCode::CONFLICT {
            warn!(message = %body.message, "Server busy");
            return Err(DispatchError::ServerBusy(body.message));
        }

        info!(
            status = ?body.status,
            error = ?body.error,
            output = ?body.path,
            "Compute request finished"
        );
        Ok(body)
    }

    /// Ask the server to stop after finishing any request in flight.
    pub async fn shutdown(&self) -> DispatchResult<ShutdownResponse> {
        let response = self
            .client
            .post(self.url(SHUTDOWN_PATH))
            .timeout(self.config.health_timeout)
            .send()
            .await
            .map_err(|e| self.not_running(e))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> DispatchResult<T> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| DispatchError::ServerUnreachable(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        DispatchError::Protocol(format!(
            "unexpected {} response body ({}): {}",
            status,
            e,
            String::from_utf8_lossy(&bytes)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(dispatcher.url(HEALTH_PATH), "http://127.0.0.1:9000/health");
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("TIM_SERVER_URL", "http://127.0.0.1:4321");
        std::env::set_var("TIM_REQUEST_TIMEOUT_SECS", "90");
        std::env::set_var("TIM_HEALTH_TIMEOUT_SECS", "not a number");

        let config = DispatcherConfig::from_env();
        assert_eq!(config.base_url, "http://127.0.0.1:4321");
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        assert_eq!(config.health_timeout, Duration::from_secs(2));

        std::env::remove_var("TIM_SERVER_URL");
        std::env::remove_var("TIM_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("TIM_HEALTH_TIMEOUT_SECS");
    }

    #[test]
    fn test_localhost_config() {
        let config = DispatcherConfig::localhost(1234);
        assert_eq!(config.base_url, "http://127.0.0.1:1234");
        assert_eq!(config.health_timeout, Duration::from_secs(2));
    }
}
