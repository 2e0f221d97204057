//! Telemetry records: per-rule traffic samples and error entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One aggregated traffic observation for a rule. Immutable once
/// recorded; only capacity eviction removes it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrafficSample {
    pub rule_id: String,
    pub timestamp: DateTime<Utc>,
    pub requests: u64,
    pub responses: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub avg_response_time_ms: f64,
    /// Status code -> count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_codes: Option<HashMap<u16, u64>>,
    /// Method -> count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<HashMap<String, u64>>,
    /// Path -> count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<HashMap<String, u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    ConnectionRefused,
    Timeout,
    BadGateway,
    SslError,
    DnsFailure,
    Other,
}

/// One observed proxy error. Mutated only by resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorRecord {
    pub id: String,
    pub rule_id: String,
    pub timestamp: DateTime<Utc>,
    pub error_type: ErrorType,
    pub message: String,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Filters for traffic queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrafficQuery {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Filters for error queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorQuery {
    pub resolved: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}
