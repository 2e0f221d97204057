//! Bounded per-rule telemetry buffers. Ingestion is decoupled from the
//! rule store on purpose: samples for ids the store no longer knows are
//! accepted, and capacity keeps memory bounded.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ProxymanError, Result};
use crate::telemetry::types::{ErrorQuery, ErrorRecord, ErrorType, TrafficQuery, TrafficSample};

/// Maximum entries kept per rule buffer; oldest entries are evicted
/// first.
const BUFFER_CAPACITY: usize = 1000;

pub struct TelemetryManager {
    traffic: Arc<RwLock<HashMap<String, VecDeque<TrafficSample>>>>,
    errors: Arc<RwLock<HashMap<String, VecDeque<ErrorRecord>>>>,
}

impl Default for TelemetryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryManager {
    pub fn new() -> Self {
        Self {
            traffic: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Append a traffic sample to its rule's buffer, evicting from the
    /// front when the buffer is full. No rule-existence check.
    pub async fn record_traffic(&self, sample: TrafficSample) {
        let mut traffic = self.traffic.write().await;
        let buffer = traffic.entry(sample.rule_id.clone()).or_default();
        buffer.push_back(sample);
        while buffer.len() > BUFFER_CAPACITY {
            buffer.pop_front();
        }
    }

    /// Samples for a rule, most recent first.
    pub async fn traffic_for(&self, rule_id: &str, query: &TrafficQuery) -> Vec<TrafficSample> {
        let traffic = self.traffic.read().await;
        let Some(buffer) = traffic.get(rule_id) else {
            return Vec::new();
        };

        let limit = query.limit.unwrap_or(usize::MAX);
        buffer
            .iter()
            .rev()
            .filter(|sample| match query.since {
                Some(since) => sample.timestamp >= since,
                None => true,
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Record a new error for a rule. The record starts unresolved.
    pub async fn record_error(
        &self,
        rule_id: &str,
        error_type: ErrorType,
        message: impl Into<String>,
    ) -> ErrorRecord {
        let record = ErrorRecord {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.to_string(),
            timestamp: Utc::now(),
            error_type,
            message: message.into(),
            resolved: false,
            resolution: None,
        };

        let mut errors = self.errors.write().await;
        let buffer = errors.entry(rule_id.to_string()).or_default();
        buffer.push_back(record.clone());
        while buffer.len() > BUFFER_CAPACITY {
            buffer.pop_front();
        }

        record
    }

    /// Errors for a rule, most recent first.
    pub async fn errors_for(&self, rule_id: &str, query: &ErrorQuery) -> Vec<ErrorRecord> {
        let errors = self.errors.read().await;
        let Some(buffer) = errors.get(rule_id) else {
            return Vec::new();
        };

        let limit = query.limit.unwrap_or(usize::MAX);
        buffer
            .iter()
            .rev()
            .filter(|record| match query.resolved {
                Some(resolved) => record.resolved == resolved,
                None => true,
            })
            .filter(|record| match query.since {
                Some(since) => record.timestamp >= since,
                None => true,
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Mark an error resolved, scanning every rule's buffer for the id.
    pub async fn resolve_error(
        &self,
        error_id: &str,
        resolution: impl Into<String>,
    ) -> Result<ErrorRecord> {
        let mut errors = self.errors.write().await;
        for buffer in errors.values_mut() {
            if let Some(record) = buffer.iter_mut().find(|record| record.id == error_id) {
                record.resolved = true;
                record.resolution = Some(resolution.into());
                return Ok(record.clone());
            }
        }
        Err(ProxymanError::NotFound(format!("error '{}'", error_id)))
    }
}
