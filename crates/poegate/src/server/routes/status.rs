//! `/power/status/{port}`: logical power state.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use poegate_core::{PortId, PortStatus, QueuedOperation};
use serde::Serialize;

use crate::server::error::AppResult;
use crate::server::state::AppState;

/// Plain `status: running` / `status: stopped`, the line orchestrators
/// pattern-match. Unknown reads as stopped.
async fn status_line(
    State(state): State<AppState>,
    Path(port): Path<String>,
) -> AppResult<&'static str> {
    let power = state.controller.query_status(&PortId::from(port))?;
    Ok(power.status_line())
}

#[derive(Debug, Serialize)]
struct StatusDetail {
    #[serde(flatten)]
    status: PortStatus,
    status_line: &'static str,
    queued: Vec<QueuedOperation>,
}

async fn status_detail(
    State(state): State<AppState>,
    Path(port): Path<String>,
) -> AppResult<Json<StatusDetail>> {
    let port = PortId::from(port);
    let status = state.controller.snapshot(&port)?;
    let queued = state.controller.queued(&port)?;
    Ok(Json(StatusDetail {
        status_line: status.state.status_line(),
        status,
        queued,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/power/status/{port}", get(status_line))
        .route("/power/status/{port}/detail", get(status_detail))
}
