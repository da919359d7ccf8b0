// ── Status tracker ──
//
// Records the last operation applied to each port and derives a logical
// running/stopped state from it. A successful cycle is "stopped" only
// until the switch repowers the port; the transition back to running is
// derived from the recorded repower time, so no timer task is involved.

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::model::{AppliedOperation, OperationKind, Outcome, PortId, PortStatus, PowerState};

#[derive(Debug, Clone, Copy)]
enum Logical {
    Unknown,
    Running,
    Stopped { repower_at: Instant },
}

impl Logical {
    fn at(self, now: Instant) -> PowerState {
        match self {
            Self::Unknown => PowerState::Unknown,
            Self::Running => PowerState::Running,
            Self::Stopped { repower_at } if now >= repower_at => PowerState::Running,
            Self::Stopped { .. } => PowerState::Stopped,
        }
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    logical: Logical,
    last: AppliedOperation,
}

#[derive(Debug)]
pub struct StatusTracker {
    power_cycle_delay: Duration,
    ports: DashMap<PortId, Tracked>,
}

impl StatusTracker {
    pub fn new(power_cycle_delay: Duration) -> Self {
        Self {
            power_cycle_delay,
            ports: DashMap::new(),
        }
    }

    /// Record the outcome of an applied operation.
    ///
    /// Failures are remembered as the last operation but leave the logical
    /// state untouched. Status queries are never recorded.
    pub fn record(&self, port: &PortId, kind: OperationKind, outcome: &Outcome, now: Instant) {
        if kind == OperationKind::StatusQuery {
            return;
        }

        let last = AppliedOperation {
            kind,
            outcome: outcome.clone(),
            at: Utc::now(),
        };

        let mut tracked = self.ports.entry(port.clone()).or_insert_with(|| Tracked {
            logical: Logical::Unknown,
            last: last.clone(),
        });

        if outcome.is_success() {
            tracked.logical = match kind {
                OperationKind::PowerOn => Logical::Running,
                OperationKind::PowerOff | OperationKind::PowerCycle => Logical::Stopped {
                    repower_at: now + self.power_cycle_delay,
                },
                OperationKind::StatusQuery => tracked.logical,
            };
        }
        tracked.last = last;
    }

    /// Logical state of `port` at `now`.
    pub fn current_status(&self, port: &PortId, now: Instant) -> PowerState {
        self.ports
            .get(port)
            .map_or(PowerState::Unknown, |tracked| tracked.logical.at(now))
    }

    /// Full view of `port` at `now`, or `None` if nothing was ever recorded.
    pub fn snapshot(&self, port: &PortId, now: Instant) -> Option<PortStatus> {
        let tracked = self.ports.get(port)?;
        let repower_in_ms = match tracked.logical {
            Logical::Stopped { repower_at } if repower_at > now => {
                Some(u64::try_from((repower_at - now).as_millis()).unwrap_or(u64::MAX))
            }
            _ => None,
        };
        Some(PortStatus {
            port: port.clone(),
            state: tracked.logical.at(now),
            last_operation: Some(tracked.last.clone()),
            repower_in_ms,
        })
    }

    pub fn is_tracked(&self, port: &PortId) -> bool {
        self.ports.contains_key(port)
    }
}
