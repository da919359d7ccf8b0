// ── Logical power operations ──
//
// Four operations reach the translator, but the switch only knows one
// hardware primitive. `Actuation` is that primitive; PowerOff and
// PowerCycle are two names for it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::time::Instant;

use super::port::PortId;

/// A logical operation requested by the orchestrator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    PowerOn,
    PowerOff,
    PowerCycle,
    #[serde(rename = "status")]
    #[strum(serialize = "status")]
    StatusQuery,
}

/// The single hardware action the switch supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    /// Unpower then repower the port.
    Cycle,
}

impl OperationKind {
    /// The hardware action this operation needs, if any.
    pub fn actuation(self) -> Option<Actuation> {
        match self {
            Self::PowerOff | Self::PowerCycle => Some(Actuation::Cycle),
            Self::PowerOn | Self::StatusQuery => None,
        }
    }
}

/// One incoming request, created per HTTP call.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub port: PortId,
    pub kind: OperationKind,
    /// Monotonic submission time, used for all scheduling arithmetic.
    pub submitted_at: Instant,
    /// Wall-clock submission time, for display only.
    pub requested_at: DateTime<Utc>,
    /// Hold the operation in the queue at least this long before it runs.
    pub delay: Option<Duration>,
}

impl OperationRequest {
    pub fn new(port: PortId, kind: OperationKind) -> Self {
        Self {
            port,
            kind,
            submitted_at: Instant::now(),
            requested_at: Utc::now(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn only_off_and_cycle_actuate() {
        assert_eq!(OperationKind::PowerOff.actuation(), Some(Actuation::Cycle));
        assert_eq!(OperationKind::PowerCycle.actuation(), Some(Actuation::Cycle));
        assert_eq!(OperationKind::PowerOn.actuation(), None);
        assert_eq!(OperationKind::StatusQuery.actuation(), None);
    }

    #[test]
    fn wire_names() {
        assert_eq!(OperationKind::PowerCycle.to_string(), "power_cycle");
        assert_eq!(OperationKind::StatusQuery.to_string(), "status");
        assert_eq!(
            "power_off".parse::<OperationKind>().unwrap(),
            OperationKind::PowerOff
        );
        assert_eq!(
            serde_json::to_string(&OperationKind::StatusQuery).unwrap(),
            "\"status\""
        );
    }
}
