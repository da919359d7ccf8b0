//! Configuration for the poegate webhook server.
//!
//! TOML (or the historical JSON) file + environment overrides, API key
//! resolution, and translation to `poegate_core` runtime types.

mod resolve;
mod schema;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use thiserror::Error;

pub use resolve::{ServerSettings, Settings, resolve_api_key};
pub use schema::{ConfigFile, PortEntry, UnifiSection, WebhookSection};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no UniFi API key configured")]
    NoCredentials {
        /// Environment variable the key was expected in, if one was named.
        hint: Option<String>,
    },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("config file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path.
///
/// An explicit path wins. Otherwise `./config.toml` or the historical
/// `./config.json` in the working directory, then the platform config dir.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    ["config.toml", "config.json"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .unwrap_or_else(default_config_path)
}

/// Platform config location, e.g. `~/.config/poegate/config.toml`.
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("io", "poegate", "poegate").map_or_else(
        || PathBuf::from("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Environment names the original deployment used, and the key each sets.
const HISTORICAL_ENV: &[(&str, &str)] = &[
    ("UNIFI_API_KEY", "unifi.api_key"),
    ("UNIFI_BASE_URL", "unifi.base_url"),
    ("UNIFI_SITE_ID", "unifi.site_id"),
    ("UNIFI_DEVICE_ID", "unifi.device_id"),
    ("WEBHOOK_AUTH_TOKEN", "webhook.auth_token"),
];

/// Config key set by a historical environment variable, if `name` is one.
pub fn historical_env_key(name: &str) -> Option<&'static str> {
    HISTORICAL_ENV
        .iter()
        .find(|(var, _)| var.eq_ignore_ascii_case(name))
        .map(|(_, key)| *key)
}

/// Defaults ← file. No environment.
pub fn file_figment(path: &Path) -> Figment {
    let figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        figment.merge(Json::file(path))
    } else {
        figment.merge(Toml::file(path))
    }
}

/// Defaults ← file ← environment.
pub fn figment(path: &Path) -> Figment {
    file_figment(path)
        .merge(Env::raw().filter_map(|key| historical_env_key(key.as_str()).map(Into::into)))
        .merge(
            Env::prefixed("POEGATE_")
                .ignore(&["CONFIG", "LOG_FORMAT"])
                .split("__"),
        )
}

/// Load the config file at `path`, with environment overrides.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(figment(path).extract()?)
}

/// Load and resolve in one step.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    load_config(path)?.resolve()
}

// ── Config writing ──────────────────────────────────────────────────

/// Write the starter config to `path`. Refuses to overwrite unless `force`.
pub fn write_default_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(&ConfigFile::template())?;
    std::fs::write(path, format!("{TEMPLATE_HEADER}{body}"))?;
    Ok(())
}

const TEMPLATE_HEADER: &str = "\
# poegate configuration
#
# Fill in site_id and device_id from the UniFi Integration API and export
# the API key as UNIFI_API_KEY (or set unifi.api_key).

";
