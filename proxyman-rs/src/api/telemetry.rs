//! Traffic and error telemetry endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{error_response, AppState};
use crate::telemetry::types::{ErrorQuery, ErrorType, TrafficQuery, TrafficSample};

pub async fn get_traffic(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<String>,
    Query(query): Query<TrafficQuery>,
) -> impl IntoResponse {
    Json(state.telemetry.traffic_for(&rule_id, &query).await)
}

pub async fn record_traffic(
    State(state): State<Arc<AppState>>,
    Json(sample): Json<TrafficSample>,
) -> impl IntoResponse {
    state.telemetry.record_traffic(sample).await;
    StatusCode::NO_CONTENT
}

pub async fn get_errors(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<String>,
    Query(query): Query<ErrorQuery>,
) -> impl IntoResponse {
    Json(state.telemetry.errors_for(&rule_id, &query).await)
}

#[derive(Debug, Deserialize)]
pub struct RecordErrorRequest {
    pub rule_id: String,
    pub error_type: ErrorType,
    pub message: String,
}

pub async fn record_error(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordErrorRequest>,
) -> impl IntoResponse {
    let record = state
        .telemetry
        .record_error(&request.rule_id, request.error_type, request.message)
        .await;
    (StatusCode::CREATED, Json(record))
}

#[derive(Debug, Deserialize)]
pub struct ResolveErrorRequest {
    pub resolution: String,
}

pub async fn resolve_error(
    State(state): State<Arc<AppState>>,
    Path(error_id): Path<String>,
    Json(request): Json<ResolveErrorRequest>,
) -> impl IntoResponse {
    match state
        .telemetry
        .resolve_error(&error_id, request.resolution)
        .await
    {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
