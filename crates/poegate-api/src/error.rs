use thiserror::Error;

/// Every way a call to the controller can fail.
///
/// `poegate-core` folds these into an actuator failure; only the
/// transient flag and HTTP status survive the trip.
#[derive(Debug, Error)]
pub enum Error {
    // ── Credentials ─────────────────────────────────────────────────
    /// The configured key cannot be sent as a header value.
    #[error("Unusable API key: {message}")]
    Authentication { message: String },

    /// The controller answered 401.
    #[error("Controller rejected the API key")]
    InvalidApiKey,

    // ── Reaching the controller ─────────────────────────────────────
    #[error("Request to controller failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Bad controller URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// CA bundle unreadable, or the TLS client could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    // ── Controller answers ──────────────────────────────────────────
    /// Non-2xx answer. `code` is the API's dotted error code when the body
    /// had one (e.g. `api.port.poe-not-supported`).
    #[error("Controller returned HTTP {status}: {message}")]
    Integration {
        message: String,
        code: Option<String>,
        status: u16,
    },

    /// 2xx answer whose body did not match the expected shape.
    #[error("Unexpected controller response: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status the controller answered with, if it answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Integration { status, .. } => Some(*status),
            Self::InvalidApiKey => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the same call might succeed later: timeouts, refused
    /// connections, throttling and 5xx. Nothing here retries; the flag is
    /// reported so callers can tell a busy controller from a bad request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) if e.is_timeout() || e.is_connect() => true,
            _ => self.status().is_some_and(|s| s == 429 || s >= 500),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The API's error code, when the error body carried one.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Integration { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
