use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
    started_at: DateTime<Utc>,
    version: &'static str,
    configured_ports: Vec<String>,
    pending_operations: usize,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        timestamp: Utc::now(),
        started_at: state.started_at,
        version: env!("CARGO_PKG_VERSION"),
        configured_ports: state
            .controller
            .registry()
            .ids()
            .map(ToString::to_string)
            .collect(),
        pending_operations: state.controller.pending(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
