//! API server: router assembly and startup.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::{certs, rules, telemetry, AppState};

pub struct ApiServer {
    addr: String,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(addr: impl Into<String>, state: Arc<AppState>) -> Self {
        Self {
            addr: addr.into(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let api_routes = Router::new()
            .route("/rules", get(rules::list_rules).post(rules::create_rule))
            .route("/rules/test", post(rules::test_rule))
            .route(
                "/rules/:id",
                get(rules::get_rule)
                    .put(rules::update_rule)
                    .delete(rules::delete_rule),
            )
            .route("/rules/:id/toggle", post(rules::toggle_rule))
            .route("/rules/:id/traffic", get(telemetry::get_traffic))
            .route("/rules/:id/errors", get(telemetry::get_errors))
            .route("/traffic", post(telemetry::record_traffic))
            .route("/errors", post(telemetry::record_error))
            .route("/errors/:id/resolve", post(telemetry::resolve_error))
            .route("/certificates", post(certs::store_certificate))
            .route(
                "/certificates/:name",
                get(certs::get_certificate).delete(certs::delete_certificate),
            )
            .route("/status", get(status));

        Router::new()
            .route("/health", get(health))
            .nest("/api", api_routes)
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    daemon_running: bool,
    daemon_version: Option<String>,
    rule_count: usize,
}

/// Best-effort daemon status plus rule count.
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let daemon = state.process.status().await;
    Json(StatusResponse {
        daemon_running: daemon.running,
        daemon_version: daemon.version,
        rule_count: state.rules.count().await,
    })
}
