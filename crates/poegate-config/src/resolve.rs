// ── Translation to runtime config ──
//
// Validates a loaded `ConfigFile` and turns it into the types
// poegate-core and the server consume.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use poegate_core::{
    Port, PortId, PortRegistry, SchedulerConfig, SwitchConfig, TlsVerification,
};
use secrecy::SecretString;
use uuid::Uuid;

use crate::ConfigError;
use crate::schema::{ConfigFile, PLACEHOLDER_UUID, PortEntry, UnifiSection};

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// When set, every request must present this token.
    pub auth_token: Option<SecretString>,
    pub request_timeout: Duration,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::Validation {
            field: "webhook.host".into(),
            reason: format!("'{}' is not an IP address", self.host),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Everything the binary needs, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub switch: SwitchConfig,
    pub scheduler: SchedulerConfig,
    pub registry: PortRegistry,
    pub server: ServerSettings,
}

impl ConfigFile {
    /// Validate and resolve into runtime settings. Looks up `api_key_env`
    /// in the process environment.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let api_key = resolve_api_key(&self.unifi, |name| std::env::var(name).ok())?;
        self.resolve_with_key(api_key)
    }

    /// Like [`resolve`](Self::resolve) but with the API key already known.
    pub fn resolve_with_key(&self, api_key: SecretString) -> Result<Settings, ConfigError> {
        let switch = self.switch_config(api_key)?;
        let scheduler = self.scheduler_config()?;
        let registry = self.port_registry()?;

        let webhook = &self.webhook;
        if webhook.request_timeout <= self.unifi.timeout {
            return Err(ConfigError::Validation {
                field: "webhook.request_timeout".into(),
                reason: format!(
                    "must exceed unifi.timeout ({}s) so a switch call can finish",
                    self.unifi.timeout
                ),
            });
        }
        let server = ServerSettings {
            host: webhook.host.clone(),
            port: webhook.port,
            auth_token: webhook
                .auth_token
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| SecretString::from(t.to_owned())),
            request_timeout: Duration::from_secs(webhook.request_timeout),
        };
        server.bind_addr()?;

        Ok(Settings {
            switch,
            scheduler,
            registry,
            server,
        })
    }

    fn switch_config(&self, api_key: SecretString) -> Result<SwitchConfig, ConfigError> {
        let unifi = &self.unifi;
        let raw_url = required(unifi.base_url.as_deref(), "unifi.base_url")?;
        let url: url::Url = raw_url.parse().map_err(|_| ConfigError::Validation {
            field: "unifi.base_url".into(),
            reason: format!("invalid URL: {raw_url}"),
        })?;

        let tls = match (unifi.insecure, &unifi.ca_cert) {
            (Some(true), _) => TlsVerification::DangerAcceptInvalid,
            (_, Some(ca_path)) => TlsVerification::CustomCa(ca_path.clone()),
            (Some(false), None) => TlsVerification::SystemDefaults,
            // local controllers are typically self-signed
            (None, None) => TlsVerification::DangerAcceptInvalid,
        };

        Ok(SwitchConfig {
            url,
            api_key,
            platform: unifi.platform,
            site_id: parse_uuid(unifi.site_id.as_deref(), "unifi.site_id")?,
            device_id: parse_uuid(unifi.device_id.as_deref(), "unifi.device_id")?,
            tls,
            timeout: Duration::from_secs(unifi.timeout),
        })
    }

    fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let webhook = &self.webhook;
        if webhook.tick_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "webhook.tick_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(SchedulerConfig {
            port_cooldown: Duration::from_secs(webhook.port_cooldown),
            operation_cooldown: Duration::from_secs(webhook.operation_cooldown),
            power_cycle_delay: Duration::from_secs(webhook.power_cycle_delay),
            tick_interval: Duration::from_millis(webhook.tick_interval_ms),
            actuator_timeout: Duration::from_secs(self.unifi.timeout),
        })
    }

    fn port_registry(&self) -> Result<PortRegistry, ConfigError> {
        if self.ports.is_empty() {
            return Err(ConfigError::Validation {
                field: "ports".into(),
                reason: "at least one port must be configured".into(),
            });
        }

        let ports = self
            .ports
            .iter()
            .map(|(id, entry)| port_from_entry(id, entry))
            .collect::<Result<Vec<_>, _>>()?;

        PortRegistry::new(ports).map_err(|e| ConfigError::Validation {
            field: "ports".into(),
            reason: e.to_string(),
        })
    }
}

fn port_from_entry(id: &str, entry: &PortEntry) -> Result<Port, ConfigError> {
    let field = || format!("ports.{id}.switch_port");
    let switch_port = match entry.switch_port {
        Some(n) => n,
        None => id.parse::<u32>().map_err(|_| ConfigError::Validation {
            field: field(),
            reason: format!("port id '{id}' is not a number, set switch_port explicitly"),
        })?,
    };
    if switch_port == 0 {
        return Err(ConfigError::Validation {
            field: field(),
            reason: "switch ports are numbered from 1".into(),
        });
    }

    Ok(Port {
        id: PortId::from(id),
        switch_port,
        label: entry
            .name
            .clone()
            .unwrap_or_else(|| format!("port-{id}")),
        ip: entry.ip,
    })
}

/// Resolve the API key: `api_key_env` first, then the plaintext value.
///
/// `lookup` reads an environment variable.
pub fn resolve_api_key(
    unifi: &UnifiSection,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    if let Some(value) = unifi
        .api_key_env
        .as_deref()
        .and_then(&lookup)
        .filter(|v| !v.is_empty())
    {
        return Ok(SecretString::from(value));
    }

    if let Some(key) = unifi.api_key.as_deref().filter(|k| !k.is_empty()) {
        return Ok(SecretString::from(key.to_owned()));
    }

    Err(ConfigError::NoCredentials {
        hint: unifi.api_key_env.clone(),
    })
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Validation {
            field: field.into(),
            reason: "is required".into(),
        })
}

fn parse_uuid(value: Option<&str>, field: &str) -> Result<Uuid, ConfigError> {
    let raw = required(value, field)?;
    if raw == PLACEHOLDER_UUID {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "still set to the placeholder, fill in the real id".into(),
        });
    }
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{raw}' is not a UUID"),
    })
}
