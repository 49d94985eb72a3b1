//! Network delivery: HTTP sink and the configuration for it

use super::batch::{BatchConfig, LineEncoder};
use super::line_protocol::LineProtocolEncoder;
use super::otlp::OtlpEncoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "network")]
use super::batch::{BatchSink, BatchTransport};
#[cfg(feature = "network")]
use crate::core::{LoggerError, Result};
#[cfg(feature = "network")]
use async_trait::async_trait;

/// Wire format of a network transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkFormat {
    LineProtocol { measurement: String },
    Otlp { service_name: String },
}

impl Default for NetworkFormat {
    fn default() -> Self {
        NetworkFormat::LineProtocol {
            measurement: "logs".to_string(),
        }
    }
}

impl NetworkFormat {
    pub fn encoder(&self) -> Arc<dyn LineEncoder> {
        match self {
            NetworkFormat::LineProtocol { measurement } => {
                Arc::new(LineProtocolEncoder::new(measurement.clone()))
            }
            NetworkFormat::Otlp { service_name } => Arc::new(OtlpEncoder::new(service_name.clone())),
        }
    }
}

/// Where and how a network transport delivers
///
/// # Example
///
/// ```
/// use rust_log_pipeline::transports::{NetworkConfig, NetworkFormat};
///
/// let config: NetworkConfig = serde_json::from_str(r#"{
///     "endpoint": "http://localhost:4318/v1/logs",
///     "format": {"type": "otlp", "service_name": "cli"},
///     "batch": {"batch_size": 50}
/// }"#).unwrap();
///
/// assert_eq!(config.batch.batch_size, 50);
/// assert_eq!(config.batch.flush_interval_ms, 5000);
/// assert!(matches!(config.format, NetworkFormat::Otlp { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub endpoint: String,
    #[serde(default)]
    pub format: NetworkFormat,
    /// Extra request headers, e.g. authorization
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl NetworkConfig {
    pub fn new(endpoint: impl Into<String>, format: NetworkFormat) -> Self {
        Self {
            endpoint: endpoint.into(),
            format,
            headers: BTreeMap::new(),
            batch: BatchConfig::default(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }
}

/// POSTs each framed batch; any non-2xx status is a failed attempt
#[cfg(feature = "network")]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    headers: reqwest::header::HeaderMap,
    content_type: &'static str,
}

#[cfg(feature = "network")]
impl HttpSink {
    pub fn new(
        endpoint: impl Into<String>,
        headers: &BTreeMap<String, String>,
        content_type: &'static str,
    ) -> Result<Self> {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

        let endpoint = endpoint.into();
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LoggerError::config("HttpSink", format!("header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| LoggerError::config("HttpSink", format!("header {}: {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            headers: map,
            content_type,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(feature = "network")]
#[async_trait]
impl BatchSink for HttpSink {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn setup(&self) -> Result<()> {
        reqwest::Url::parse(&self.endpoint)
            .map(|_| ())
            .map_err(|e| LoggerError::config("HttpSink", format!("invalid endpoint {:?}: {}", self.endpoint, e)))
    }

    async fn deliver(&self, payload: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .header(reqwest::header::CONTENT_TYPE, self.content_type)
            .body(payload.to_owned())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(LoggerError::delivery(
                &self.endpoint,
                format!("status {}: {}", status, body.trim()),
            ))
        }
    }
}

#[cfg(feature = "network")]
impl BatchTransport {
    /// Batched HTTP delivery in line protocol or OTLP
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_log_pipeline::transports::{BatchTransport, NetworkConfig, NetworkFormat};
    ///
    /// let config = NetworkConfig::new(
    ///     "http://localhost:8086/api/v2/write?bucket=logs",
    ///     NetworkFormat::LineProtocol { measurement: "cli".into() },
    /// )
    /// .with_header("Authorization", "Token secret");
    /// let transport = BatchTransport::network(config).expect("valid network config");
    /// ```
    pub fn network(config: NetworkConfig) -> Result<Self> {
        let encoder = config.format.encoder();
        let sink = HttpSink::new(config.endpoint.clone(), &config.headers, encoder.content_type())?;
        Self::new("network", Arc::new(sink), encoder, config.batch)
    }
}
