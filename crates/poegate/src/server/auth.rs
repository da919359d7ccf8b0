//! Shared-token authentication.
//!
//! The token may arrive as `Authorization: Bearer <token>`, a `token` query
//! parameter, or a `token` field of a url-encoded form body. Orchestrators
//! differ in which of these they can be configured to send.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::server::error::AppError;
use crate::server::state::AppState;

/// Form bodies larger than this are rejected before token lookup.
const MAX_FORM_BYTES: usize = 64 * 1024;

const TOKEN_FIELD: &str = "token";

/// Reject requests that do not carry the configured token.
///
/// A no-op when no token is configured.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.auth_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let (provided, request) = extract_token(request).await?;
    if provided
        .as_deref()
        .is_some_and(|token| token_matches(token, expected.expose_secret()))
    {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        path = %request.uri().path(),
        token_present = provided.is_some(),
        "rejected unauthenticated request"
    );
    Err(AppError::Unauthorized)
}

/// Pull the token out of the request, buffering a form body if needed.
/// The request is returned intact for the next handler.
async fn extract_token(request: Request) -> Result<(Option<String>, Request), AppError> {
    if let Some(token) = header_token(request.headers()) {
        return Ok((Some(token), request));
    }

    if let Some(token) = request
        .uri()
        .query()
        .and_then(|q| form_field(q.as_bytes(), TOKEN_FIELD))
    {
        return Ok((Some(token), request));
    }

    if !is_form(request.headers()) {
        return Ok((None, request));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("request body too large".into()))?;
    let token = form_field(&bytes, TOKEN_FIELD);
    Ok((token, Request::from_parts(parts, Body::from(bytes))))
}

/// `Authorization` header value, with an optional `Bearer ` prefix.
fn header_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_owned())
}

/// Compare fixed-length digests with a branch-free fold, so the time taken
/// does not depend on the token's length or on where it first differs.
fn token_matches(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn form_field(input: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(input)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
