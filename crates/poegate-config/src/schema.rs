// ── On-disk configuration layout ──
//
// Mirrors the TOML file one-to-one. The historical `config.json` layout
// deserializes into the same structs unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use poegate_api::ControllerPlatform;
use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub unifi: UnifiSection,

    #[serde(default)]
    pub webhook: WebhookSection,

    /// Managed ports keyed by logical port id.
    #[serde(default)]
    pub ports: BTreeMap<String, PortEntry>,
}

// ── [unifi] ─────────────────────────────────────────────────────────

#[derive(Deserialize, Serialize)]
pub struct UnifiSection {
    /// Controller URL. A trailing `/integration` or `/integration/v1` is accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key (plaintext, prefer `api_key_env`). Read, never written back.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,

    /// UUID of the PoE switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(default)]
    pub platform: ControllerPlatform,

    /// Skip TLS verification. Unset means "accept self-signed".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Path to custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Upstream request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for UnifiSection {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            api_key_env: None,
            site_id: None,
            device_id: None,
            platform: ControllerPlatform::default(),
            insecure: None,
            ca_cert: None,
            timeout: default_timeout(),
        }
    }
}

impl fmt::Debug for UnifiSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiSection")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("site_id", &self.site_id)
            .field("device_id", &self.device_id)
            .field("platform", &self.platform)
            .field("insecure", &self.insecure)
            .field("ca_cert", &self.ca_cert)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ── [webhook] ───────────────────────────────────────────────────────

#[derive(Deserialize, Serialize)]
pub struct WebhookSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret callers must present. Unset disables authentication.
    /// Read, never written back.
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,

    /// Seconds the switch keeps a port unpowered during a cycle.
    #[serde(default = "default_power_cycle_delay")]
    pub power_cycle_delay: u64,

    /// Seconds between switch calls on the same port.
    #[serde(default = "default_port_cooldown")]
    pub port_cooldown: u64,

    /// Seconds between operations of the same kind on the same port.
    #[serde(default = "default_operation_cooldown")]
    pub operation_cooldown: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seconds before an HTTP request is abandoned.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_token: None,
            power_cycle_delay: default_power_cycle_delay(),
            port_cooldown: default_port_cooldown(),
            operation_cooldown: default_operation_cooldown(),
            tick_interval_ms: default_tick_interval_ms(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl fmt::Debug for WebhookSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("power_cycle_delay", &self.power_cycle_delay)
            .field("port_cooldown", &self.port_cooldown)
            .field("operation_cooldown", &self.operation_cooldown)
            .field("tick_interval_ms", &self.tick_interval_ms)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

// ── [ports."<id>"] ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PortEntry {
    /// Label of the machine behind the port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,

    /// Physical switch port. Defaults to the port id parsed as a number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_port: Option<u32>,
}

fn default_timeout() -> u64 {
    30
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_power_cycle_delay() -> u64 {
    3
}
fn default_port_cooldown() -> u64 {
    10
}
fn default_operation_cooldown() -> u64 {
    30
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_request_timeout() -> u64 {
    60
}

impl ConfigFile {
    /// The file `poegate init` writes.
    pub fn template() -> Self {
        let ports = (1..=4)
            .map(|n| {
                (
                    n.to_string(),
                    PortEntry {
                        name: Some(format!("pi-node-{n}")),
                        ip: Some(IpAddr::from([172, 16, 254, 100 + n])),
                        switch_port: None,
                    },
                )
            })
            .collect();

        Self {
            unifi: UnifiSection {
                base_url: Some("https://10.0.1.1".into()),
                api_key_env: Some("UNIFI_API_KEY".into()),
                site_id: Some(PLACEHOLDER_UUID.into()),
                device_id: Some(PLACEHOLDER_UUID.into()),
                ..UnifiSection::default()
            },
            webhook: WebhookSection::default(),
            ports,
        }
    }
}

/// Stand-in for ids the user must fill in. Rejected by validation.
pub(crate) const PLACEHOLDER_UUID: &str = "00000000-0000-0000-0000-000000000000";
