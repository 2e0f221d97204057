//! Rule lifecycle endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{error_response, AppState};
use crate::rules::types::{CreateRuleRequest, UpdateRuleRequest};

pub async fn list_rules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.rules.list().await)
}

pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRuleRequest>,
) -> impl IntoResponse {
    match state.rules.create(request).await {
        Ok(rule) => (StatusCode::CREATED, Json(rule)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.rules.get(&id).await {
        Ok(rule) => Json(rule).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRuleRequest>,
) -> impl IntoResponse {
    match state.rules.update(&id, request).await {
        Ok(rule) => Json(rule).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.rules.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn toggle_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.rules.toggle(&id).await {
        Ok(rule) => Json(rule).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Dry-run a candidate rule against the daemon without storing it.
pub async fn test_rule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRuleRequest>,
) -> impl IntoResponse {
    match state.rules.test(request).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
