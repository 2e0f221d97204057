//! HTTP API over the rule and telemetry managers.

pub mod certs;
pub mod rules;
pub mod server;
pub mod telemetry;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::certs::CertificateStore;
use crate::error::ProxymanError;
use crate::nginx::process::NginxProcess;
use crate::rules::RuleManager;
use crate::telemetry::TelemetryManager;

/// Shared application state
pub struct AppState {
    pub rules: Arc<RuleManager>,
    pub telemetry: Arc<TelemetryManager>,
    pub certs: Arc<CertificateStore>,
    pub process: Arc<NginxProcess>,
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Map a domain error onto an HTTP response.
pub fn error_response(e: ProxymanError) -> (StatusCode, Json<ApiError>) {
    let status = match &e {
        ProxymanError::Validation(_) | ProxymanError::MissingDomain(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ProxymanError::NotFound(_) => StatusCode::NOT_FOUND,
        ProxymanError::ConfigTestFailed(_) => StatusCode::CONFLICT,
        ProxymanError::Reload(_) | ProxymanError::ReloadTimeout(_) => StatusCode::BAD_GATEWAY,
        ProxymanError::Io { .. } | ProxymanError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiError::new(e.to_string())))
}
