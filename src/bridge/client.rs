//! HTTP implementation of the bridge.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use appmodel_types::Plane;

use super::{Bridge, BridgeRequest, Method};
use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Bridge client bound to the configured loopback ports.
pub struct HttpBridge {
    config: BridgeConfig,
    client: Client,
}

impl HttpBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        // Timeouts are enforced per exchange, so the client itself has none.
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| BridgeError::ConnectionRefused {
                plane: Plane::Data,
                url: config.base_url(Plane::Data),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn url(&self, request: &BridgeRequest) -> String {
        format!("{}{}", self.config.base_url(request.plane), request.path)
    }
}

#[async_trait]
impl Bridge for HttpBridge {
    #[tracing::instrument(
        name = "bridge_exchange",
        skip(self, request),
        fields(plane = %request.plane, method = %request.method, path = %request.path)
    )]
    async fn exchange(&self, request: BridgeRequest) -> Result<Value, BridgeError> {
        let url = self.url(&request);
        let timeout_ms = self.config.timeouts.millis(request.timeout);
        let started = Instant::now();

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let send = async move {
            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) =
            match tokio::time::timeout(self.config.timeouts.duration(request.timeout), send).await
            {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "bridge exchange failed");
                    return Err(classify_transport_error(
                        request.plane,
                        url,
                        timeout_ms,
                        e,
                    ));
                }
                Err(_) => {
                    tracing::debug!(timeout_ms, "bridge exchange timed out");
                    return Err(BridgeError::Timeout {
                        plane: request.plane,
                        url,
                        timeout_ms,
                    });
                }
            };

        tracing::debug!(
            status = status.as_u16(),
            bytes = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "bridge exchange complete"
        );

        let value: Value =
            serde_json::from_str(&text).map_err(|e| BridgeError::MalformedResponse {
                url: url.clone(),
                reason: format!("HTTP {status}: {e}"),
            })?;

        if let Some(failure) = host_failure(&value) {
            return Err(failure);
        }
        if !status.is_success() {
            return Err(BridgeError::HostReportedFailure {
                message: format!("host returned HTTP {status} for {url}"),
                code: None,
            });
        }
        Ok(value)
    }
}

fn classify_transport_error(
    plane: Plane,
    url: String,
    timeout_ms: u64,
    err: reqwest::Error,
) -> BridgeError {
    if err.is_timeout() {
        BridgeError::Timeout {
            plane,
            url,
            timeout_ms,
        }
    } else if err.is_decode() {
        BridgeError::MalformedResponse {
            url,
            reason: err.to_string(),
        }
    } else {
        BridgeError::ConnectionRefused {
            plane,
            url,
            reason: err.to_string(),
        }
    }
}

/// `success: false` bodies become host failures carrying the host's message.
fn host_failure(value: &Value) -> Option<BridgeError> {
    if value.get("success").and_then(Value::as_bool) != Some(false) {
        return None;
    }
    let message = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("host reported failure without a message")
        .to_string();
    let code = value
        .get("error_code")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(BridgeError::HostReportedFailure { message, code })
}
