//! Certificate storage endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{error_response, AppState};

#[derive(Debug, Deserialize)]
pub struct StoreCertificateRequest {
    pub name: String,
    pub certificate: String,
    pub private_key: String,
    pub chain: Option<String>,
}

pub async fn store_certificate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StoreCertificateRequest>,
) -> impl IntoResponse {
    match state
        .certs
        .store(
            &request.name,
            &request.certificate,
            &request.private_key,
            request.chain.as_deref(),
        )
        .await
    {
        Ok(paths) => (StatusCode::CREATED, Json(paths)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_certificate(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.certs.resolve(&name).await {
        Ok(paths) => Json(paths).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn delete_certificate(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.certs.remove(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
