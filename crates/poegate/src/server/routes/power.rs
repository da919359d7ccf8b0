//! `/power/{on,off,cycle}/{port}`: the orchestrator's power driver calls.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use poegate_core::{
    Deferral, Execution, OperationKind, OperationRequest, Outcome, PortId, Translation,
};
use serde::{Deserialize, Serialize};

use crate::server::error::{AppError, AppResult};
use crate::server::state::AppState;

/// Optional query parameters accepted by every power route.
#[derive(Debug, Default, Deserialize)]
pub struct PowerParams {
    /// Hold the operation in the queue this many seconds before it runs.
    pub delay: Option<u64>,
}

/// JSON body for power responses.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub action: OperationKind,
    pub port: PortId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds until a queued operation is attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_delay: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub superseded: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<Execution> for ActionResponse {
    fn from(exec: Execution) -> Self {
        let status = exec.status_label();
        let (success, message, error) = match exec.outcome {
            Outcome::Success if !exec.actuated => (
                true,
                Some("Port will power on automatically after power cycle".to_owned()),
                None,
            ),
            Outcome::Success => (true, None, None),
            Outcome::Failure { reason } => (false, None, Some(reason)),
        };
        Self {
            success,
            action: exec.kind,
            port: exec.port,
            status,
            message,
            error,
            queued_delay: None,
            superseded: false,
            timestamp: exec.at,
        }
    }
}

impl From<&Deferral> for ActionResponse {
    fn from(deferral: &Deferral) -> Self {
        let secs = deferral.retry_after_secs();
        Self {
            success: true,
            action: deferral.kind,
            port: deferral.port.clone(),
            status: deferral.status_label(),
            message: Some(format!("Operation queued for execution in {secs} seconds")),
            error: None,
            queued_delay: Some(secs),
            superseded: deferral.superseded,
            timestamp: deferral.at,
        }
    }
}

async fn power_on(
    State(state): State<AppState>,
    Path(port): Path<String>,
    Query(params): Query<PowerParams>,
) -> AppResult<Response> {
    apply(&state, port, OperationKind::PowerOn, &params).await
}

async fn power_off(
    State(state): State<AppState>,
    Path(port): Path<String>,
    Query(params): Query<PowerParams>,
) -> AppResult<Response> {
    apply(&state, port, OperationKind::PowerOff, &params).await
}

async fn power_cycle(
    State(state): State<AppState>,
    Path(port): Path<String>,
    Query(params): Query<PowerParams>,
) -> AppResult<Response> {
    apply(&state, port, OperationKind::PowerCycle, &params).await
}

async fn apply(
    state: &AppState,
    port: String,
    kind: OperationKind,
    params: &PowerParams,
) -> AppResult<Response> {
    let mut request = OperationRequest::new(PortId::from(port), kind);
    if let Some(delay) = params.delay.filter(|d| *d > 0) {
        request = request.with_delay(Duration::from_secs(delay));
    }

    let translation = state.controller.submit(request).await?;
    Ok(render(translation))
}

/// Map a translation onto status code, headers, and body.
fn render(translation: Translation) -> Response {
    match translation {
        Translation::Executed(exec) => {
            let status = if exec.outcome.is_success() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ActionResponse::from(exec))).into_response()
        }
        Translation::Accepted(deferral) => {
            let body = ActionResponse::from(&deferral);
            let mut response = (StatusCode::OK, Json(body)).into_response();
            response.headers_mut().insert(
                RETRY_AFTER,
                HeaderValue::from(deferral.retry_after_secs()),
            );
            response
        }
        // Power routes never submit status queries.
        Translation::Status(state) => AppError::BadRequest(format!(
            "unexpected status answer '{state}' on a power route"
        ))
        .into_response(),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/power/on/{port}", get(power_on).post(power_on))
        .route("/power/off/{port}", get(power_off).post(power_off))
        .route("/power/cycle/{port}", get(power_cycle).post(power_cycle))
}
