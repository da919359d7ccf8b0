// ── Core error types ──
//
// Errors surfaced by poegate-core. Rate limiting is deliberately absent:
// a rate-limited request is accepted and queued, never failed.
// The `From<poegate_api::Error>` impl folds transport-layer failures
// into the actuator taxonomy.

use thiserror::Error;

use crate::model::PortId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Request errors ───────────────────────────────────────────────
    #[error("Port {port} not configured")]
    UnknownPort { port: PortId },

    // ── Actuator errors ──────────────────────────────────────────────
    #[error("Switch rejected the request: {message}")]
    Actuator {
        message: String,
        /// HTTP status from the controller, if one was received.
        status: Option<u16>,
        transient: bool,
    },

    #[error("Switch authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Switch did not answer within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn is_unknown_port(&self) -> bool {
        matches!(self, Self::UnknownPort { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<poegate_api::Error> for CoreError {
    fn from(err: poegate_api::Error) -> Self {
        use poegate_api::Error as Api;

        let transient = err.is_transient();
        let status = err.status();
        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::InvalidApiKey => Self::AuthenticationFailed {
                message: "controller rejected the API key".into(),
            },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("bad controller URL: {e}"),
            },
            Api::Integration { message, .. } => Self::Actuator {
                message,
                status,
                transient,
            },
            other @ (Api::Transport(_) | Api::Tls(_) | Api::Deserialization { .. }) => {
                Self::Actuator {
                    message: other.to_string(),
                    status,
                    transient,
                }
            }
        }
    }
}
