//! Webhook HTTP server: routes, token auth, and the tower-http stack.

pub mod auth;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;

pub use router::build_router;
pub use state::AppState;
