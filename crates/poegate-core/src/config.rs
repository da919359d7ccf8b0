// ── Runtime configuration ──
//
// These types describe how to reach the switch and how to pace work
// sent to it. They never touch disk: poegate-config builds them and
// hands them in.

use std::path::PathBuf;
use std::time::Duration;

use poegate_api::{ControllerPlatform, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs). Default for local controllers.
    #[default]
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// How to reach the switch whose ports are being driven.
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    /// Controller URL (e.g., `https://10.0.1.1`).
    pub url: Url,
    /// Integration API key.
    pub api_key: SecretString,
    pub platform: ControllerPlatform,
    /// Integration API site UUID.
    pub site_id: Uuid,
    /// UUID of the PoE switch.
    pub device_id: Uuid,
    pub tls: TlsVerification,
    /// Per-request timeout for upstream calls.
    pub timeout: Duration,
}

impl SwitchConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }
}

/// Pacing for actuator calls and the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Minimum spacing between actuator calls on the same port.
    pub port_cooldown: Duration,
    /// Minimum spacing between operations of the same kind on the same port.
    pub operation_cooldown: Duration,
    /// How long the switch keeps a port unpowered during a cycle.
    pub power_cycle_delay: Duration,
    /// Worker loop period.
    pub tick_interval: Duration,
    /// Upper bound on a single actuator call.
    pub actuator_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            port_cooldown: Duration::from_secs(10),
            operation_cooldown: Duration::from_secs(30),
            power_cycle_delay: Duration::from_secs(3),
            tick_interval: Duration::from_secs(1),
            actuator_timeout: Duration::from_secs(30),
        }
    }
}
