pub mod health;
pub mod ports;
pub mod power;
pub mod status;

use axum::Router;

use crate::server::state::AppState;

/// Every route the webhook server answers.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(power::router())
        .merge(status::router())
        .merge(ports::router())
        .merge(health::router())
}
