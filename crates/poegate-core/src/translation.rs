// ── Translation results ──
//
// What the translator hands back to the HTTP layer. Each variant carries
// enough metadata to render a response without reaching back into the
// controller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{OperationKind, Outcome, PortId, PowerState};

/// Result of [`PowerController::translate`](crate::PowerController::translate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Applied synchronously; the outcome is final.
    Executed(Execution),
    /// Rate-limited or delayed; queued to run later.
    Accepted(Deferral),
    /// Answer to a status query.
    Status(PowerState),
}

/// An operation applied on the caller's path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub port: PortId,
    pub kind: OperationKind,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Whether the switch was called. False for power-on.
    pub actuated: bool,
    pub at: DateTime<Utc>,
}

impl Execution {
    pub fn status_label(&self) -> &'static str {
        match (&self.outcome, self.actuated) {
            (Outcome::Failure { .. }, _) => "failed",
            (Outcome::Success, true) => "cycling",
            (Outcome::Success, false) => "no_action_needed",
        }
    }
}

/// An operation handed to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deferral {
    pub port: PortId,
    pub kind: OperationKind,
    /// How long until the worker will try it.
    #[serde(rename = "retry_after_ms", serialize_with = "as_millis")]
    pub retry_after: Duration,
    /// An older pending request for the same port and kind was replaced.
    pub superseded: bool,
    pub at: DateTime<Utc>,
}

impl Deferral {
    pub fn status_label(&self) -> &'static str {
        "queued"
    }

    /// Whole seconds, rounded up, for a `Retry-After` header.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// A queued operation as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedOperation {
    pub kind: OperationKind,
    pub due_in_ms: u64,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
