// ── Logical power status ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::operation::{OperationKind, Outcome};
use super::port::PortId;

/// The software's belief about a port's power state.
///
/// Never verified against hardware: the switch cannot report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Running,
    Stopped,
    /// Nothing observed since process start.
    Unknown,
}

impl PowerState {
    /// The status line orchestrators pattern-match (`status.*:.*running`).
    ///
    /// Unknown renders as stopped.
    pub fn status_line(self) -> &'static str {
        match self {
            Self::Running => "status: running",
            Self::Stopped | Self::Unknown => "status: stopped",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        })
    }
}

/// The most recent operation applied to a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOperation {
    pub kind: OperationKind,
    pub outcome: Outcome,
    pub at: DateTime<Utc>,
}

/// Point-in-time view of a tracked port, for the JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatus {
    pub port: PortId,
    pub state: PowerState,
    pub last_operation: Option<AppliedOperation>,
    /// Milliseconds until an in-progress power cycle is expected to finish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repower_in_ms: Option<u64>,
}
