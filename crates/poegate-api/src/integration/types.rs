// ── Integration API wire types ──
//
// Only the shapes poegate touches. Unknown fields are kept in `extra`
// so a firmware update never breaks decoding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The action name the controller expects for a PoE power cycle.
pub const POWER_CYCLE: &str = "POWER_CYCLE";

// ── Devices ──────────────────────────────────────────────────────────

/// Adopted device details, from `GET /v1/sites/{siteId}/devices/{deviceId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetailsResponse {
    pub id: Uuid,
    pub mac_address: String,
    pub ip_address: Option<String>,
    pub name: String,
    pub model: String,
    pub state: String,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    /// Catch-all for additional fields not modeled above.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl DeviceDetailsResponse {
    /// Whether the controller advertises PoE switching on this device.
    pub fn is_switch(&self) -> bool {
        self.features.iter().any(|f| f == "switching")
    }
}

// ── Port Actions ─────────────────────────────────────────────────────

/// Port action request body.
///
/// Valid actions: `POWER_CYCLE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortActionRequest<'a> {
    pub action: &'a str,
}

// ── Error ────────────────────────────────────────────────────────────

/// `{message, code}` body the controller sends with non-2xx answers.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Parse an error body. Anything that is not the JSON shape yields an
    /// empty response, and the raw text becomes the message.
    pub(crate) fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub(crate) fn into_error(self, status: u16, raw: String) -> crate::Error {
        let message = self
            .message
            .or_else(|| (!raw.trim().is_empty() && self.code.is_none()).then_some(raw))
            .unwrap_or_else(|| format!("HTTP {status}"));
        crate::Error::Integration {
            message,
            code: self.code,
            status,
        }
    }
}
