//! Async client for the slice of the UniFi Network Integration API that
//! poegate drives: the per-port `POWER_CYCLE` action and a device lookup
//! used to validate credentials at startup.
//!
//! - **[`IntegrationClient`]**: API-key authenticated JSON client.
//! - **[`TransportConfig`]**: TLS mode and timeout shared by every client.
//! - **[`Error`]**: every failure mode of the upstream call.

pub mod error;
pub mod integration;
pub mod platform;
pub mod transport;

pub use error::Error;
pub use integration::IntegrationClient;
pub use integration::types as integration_types;
pub use platform::ControllerPlatform;
pub use transport::{TlsMode, TransportConfig};
