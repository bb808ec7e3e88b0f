//! HTTP Collector Client
//!
//! The remote collector exposes two endpoints:
//!
//! | Method | Path                | Body / response                          |
//! |--------|---------------------|------------------------------------------|
//! | POST   | `/api/events`       | `{"device_id", "type", "detail"?}`       |
//! | GET    | `/api/sensor-state` | `{"enabled": bool}`                      |
//!
//! Any 2xx answers a POST. A GET succeeds only on 200 with a boolean
//! `enabled` field. No authentication headers are sent and nothing is
//! retried here: the control loop's cadences are the retry policy.
//!
//! Every request is bounded by [`HttpConfig::timeout`], so a hung collector
//! costs at most one timeout per call.

use std::collections::HashMap;
use std::time::Duration;

use edgewatch_core::{ConfigSource, EventKind, EventRecord, EventSink, FetchError, ReportError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ConnectionStats, ConnectorError};

/// Path of the event endpoint
pub const EVENTS_PATH: &str = "/api/events";

/// Path of the sensing-state endpoint
pub const SENSOR_STATE_PATH: &str = "/api/sensor-state";

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server returned an unexpected status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Response parsed but a required field was absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl From<&HttpError> for ReportError {
    fn from(err: &HttpError) -> Self {
        match err {
            HttpError::ServerError { status, .. } => ReportError::Status { status: *status },
            HttpError::Serialization(_) => ReportError::Serialization,
            HttpError::Request(_) | HttpError::MissingField(_) => ReportError::Transport,
        }
    }
}

impl From<&HttpError> for FetchError {
    fn from(err: &HttpError) -> Self {
        match err {
            HttpError::ServerError { status, .. } => FetchError::Status { status: *status },
            HttpError::Serialization(_) => FetchError::Malformed,
            HttpError::MissingField(field) => FetchError::MissingField { field: *field },
            HttpError::Request(_) => FetchError::Transport,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the collector
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Custom headers
    pub headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl HttpConfig {
    /// Create new configuration with base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            headers: HashMap::new(),
            user_agent: format!("EdgeWatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Body of `POST /api/events`
#[derive(Debug, Serialize)]
pub struct EventBody<'a> {
    /// Reporting node
    pub device_id: &'a str,
    /// `motion` or `light`
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Free-form detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'a str>,
}

impl<'a> From<&EventRecord<'a>> for EventBody<'a> {
    fn from(record: &EventRecord<'a>) -> Self {
        Self {
            device_id: record.device_id,
            kind: record.kind,
            detail: record.detail,
        }
    }
}

/// Response of `GET /api/sensor-state`
#[derive(Debug, Deserialize)]
pub struct SensorState {
    /// Whether presence sensing should run
    pub enabled: Option<bool>,
}

/// Parse a sensor-state response body
pub fn parse_sensor_state(body: &str) -> Result<bool, HttpError> {
    let state: SensorState =
        serde_json::from_str(body).map_err(|e| HttpError::Serialization(e.to_string()))?;
    state.enabled.ok_or(HttpError::MissingField("enabled"))
}

/// Collector client using lightweight ureq client
pub struct CollectorClient {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: ConnectionStats,
}

impl CollectorClient {
    /// Create new collector client
    pub fn new(config: HttpConfig) -> Result<Self, ConnectorError> {
        // Validate base URL
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(ConnectorError::ConfigError(
                "Base URL must start with http:// or https://".into(),
            ));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: ConnectionStats::default(),
        })
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }

    /// Absolute URL for `path`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send POST request with a JSON body; any 2xx is success
    pub fn post<T: Serialize>(&mut self, path: &str, data: &T) -> Result<(), HttpError> {
        let json = serde_json::to_string(data).map_err(|e| HttpError::Serialization(e.to_string()))?;
        let request = self.build_request(self.agent.post(&self.url(path)));

        let result = match request.send_string(&json) {
            Ok(resp) if (200..300).contains(&resp.status()) => Ok(()),
            Ok(resp) => Err(status_error(resp)),
            Err(err) => Err(request_error(err)),
        };
        self.account(result, json.len())
    }

    /// Send GET request; only 200 is success, the body is returned
    pub fn get(&mut self, path: &str) -> Result<String, HttpError> {
        let request = self.build_request(self.agent.get(&self.url(path)));

        let result = match request.call() {
            Ok(resp) if resp.status() == 200 => resp
                .into_string()
                .map_err(|e| HttpError::Request(e.to_string())),
            Ok(resp) => Err(status_error(resp)),
            Err(err) => Err(request_error(err)),
        };
        self.account(result, 0)
    }

    /// Build request with headers
    fn build_request(&self, mut request: ureq::Request) -> ureq::Request {
        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }

        request
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
    }

    fn account<T>(&mut self, result: Result<T, HttpError>, bytes: usize) -> Result<T, HttpError> {
        match &result {
            Ok(_) => self.stats.record_sent(bytes),
            Err(err) => self.stats.record_failure(err),
        }
        result
    }
}

fn status_error(resp: ureq::Response) -> HttpError {
    let status = resp.status();
    HttpError::ServerError {
        status,
        message: resp.into_string().unwrap_or_default(),
    }
}

fn request_error(err: ureq::Error) -> HttpError {
    match err {
        ureq::Error::Status(_, resp) => status_error(resp),
        ureq::Error::Transport(t) => HttpError::Request(t.to_string()),
    }
}

impl EventSink for CollectorClient {
    fn post_event(&mut self, record: &EventRecord<'_>) -> Result<(), ReportError> {
        self.post(EVENTS_PATH, &EventBody::from(record)).map_err(|err| {
            warn!("http: POST {} failed: {}", EVENTS_PATH, err);
            ReportError::from(&err)
        })
    }
}

impl ConfigSource for CollectorClient {
    fn fetch_enabled(&mut self) -> Result<bool, FetchError> {
        let enabled = self
            .get(SENSOR_STATE_PATH)
            .and_then(|body| parse_sensor_state(&body))
            .map_err(|err| {
                debug!("http: GET {} failed: {}", SENSOR_STATE_PATH, err);
                FetchError::from(&err)
            })?;
        Ok(enabled)
    }
}
