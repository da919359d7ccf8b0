// ── Port identity types ──
//
// A logical port id is whatever the orchestrator puts in the URL. It maps
// to exactly one physical switch port, fixed at load time.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── PortId ──────────────────────────────────────────────────────────

/// Externally assigned identifier of a managed port (e.g. `"1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(String);

impl PortId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PortId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for PortId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PortId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Port ────────────────────────────────────────────────────────────

/// A managed PoE port. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    /// Physical port index on the switch (the Integration API `portIdx`).
    pub switch_port: u32,
    /// Human-friendly name of the machine behind the port.
    pub label: String,
    /// Address of the powered machine. Informational only.
    pub ip: Option<IpAddr>,
}
