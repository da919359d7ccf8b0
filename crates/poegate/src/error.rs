//! CLI error types with miette diagnostics.
//!
//! Maps config and core failures into user-facing errors with help text.

use std::net::SocketAddr;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use poegate_config::ConfigError;
use poegate_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found: {}", path.display())]
    #[diagnostic(
        code(poegate::no_config),
        help(
            "Create one with: poegate init\n\
             Or point at an existing file with --config or POEGATE_CONFIG."
        )
    )]
    NoConfig { path: PathBuf },

    #[error("Configuration file already exists: {}", path.display())]
    #[diagnostic(
        code(poegate::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: PathBuf },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(poegate::validation))]
    Validation { field: String, reason: String },

    #[error("No UniFi API key configured")]
    #[diagnostic(
        code(poegate::no_credentials),
        help(
            "Set unifi.api_key in the config file, or export the key in {env}.\n\
             Keys are created under Settings > Control Plane > Integrations."
        )
    )]
    NoCredentials { env: String },

    #[error(transparent)]
    #[diagnostic(code(poegate::config))]
    Config(ConfigError),

    // ── Controller ───────────────────────────────────────────────────

    #[error("Switch authentication failed: {message}")]
    #[diagnostic(
        code(poegate::auth_failed),
        help("Verify the API key and that it belongs to the site holding the switch.")
    )]
    AuthFailed { message: String },

    #[error("Switch request failed: {message}")]
    #[diagnostic(
        code(poegate::switch_error),
        help("Check unifi.base_url, unifi.site_id and unifi.device_id.")
    )]
    Switch {
        message: String,
        status: Option<u16>,
    },

    #[error("Could not reach the controller: {message}")]
    #[diagnostic(
        code(poegate::connection_failed),
        help(
            "Check that the controller is reachable from this host.\n\
             Self-signed certificates need unifi.insecure = true or unifi.ca_cert."
        )
    )]
    ConnectionFailed { message: String },

    #[error("Controller did not answer within {seconds}s")]
    #[diagnostic(
        code(poegate::timeout),
        help("Increase unifi.timeout or check controller responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Port '{port}' is not configured")]
    #[diagnostic(code(poegate::unknown_port))]
    UnknownPort { port: String },

    // ── Server ───────────────────────────────────────────────────────

    #[error("Could not bind {addr}")]
    #[diagnostic(
        code(poegate::bind),
        help("Another process may hold the port. Pick one with --port.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. } | Self::UnknownPort { .. } => exit_code::NOT_FOUND,
            Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            Self::NoCredentials { .. } | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } | Self::Bind { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Switch { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => Self::NoConfig { path },
            ConfigError::AlreadyExists { path } => Self::ConfigExists { path },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { hint } => Self::NoCredentials {
                env: hint.unwrap_or_else(|| "UNIFI_API_KEY".into()),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownPort { port } => Self::UnknownPort {
                port: port.to_string(),
            },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Actuator {
                message,
                status: None,
                transient: true,
            } => Self::ConnectionFailed { message },
            CoreError::Actuator {
                message, status, ..
            } => Self::Switch { message, status },
            CoreError::Config { message } => Self::Validation {
                field: "unifi".into(),
                reason: message,
            },
        }
    }
}
