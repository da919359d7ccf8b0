// ── Rate limiter ──
//
// Two independent cooldown windows guard every actuator call: one per
// port, one per (port, operation kind). Both are checked and stamped
// under the same lock, so two concurrent callers can never both pass.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::model::{OperationKind, PortId};

/// Decision returned by [`RateLimiter::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    /// Both windows were clear; they have been stamped with `now`.
    Granted,
    /// At least one window is still closed. Nothing was stamped.
    Denied {
        /// Wait until both windows are clear.
        retry_after: Duration,
    },
}

impl Permit {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

#[derive(Debug, Default)]
struct Windows {
    last_actuation: HashMap<PortId, Instant>,
    last_operation: HashMap<(PortId, OperationKind), Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    port_cooldown: Duration,
    operation_cooldown: Duration,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(port_cooldown: Duration, operation_cooldown: Duration) -> Self {
        Self {
            port_cooldown,
            operation_cooldown,
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Check both windows and, if clear, stamp them with `now`.
    ///
    /// Stamps are never rolled back, even if the call that follows fails.
    pub fn try_acquire(&self, port: &PortId, kind: OperationKind, now: Instant) -> Permit {
        let mut windows = self.lock();

        let port_wait = remaining(
            windows.last_actuation.get(port).copied(),
            self.port_cooldown,
            now,
        );
        let key = (port.clone(), kind);
        let op_wait = remaining(
            windows.last_operation.get(&key).copied(),
            self.operation_cooldown,
            now,
        );

        let retry_after = port_wait.max(op_wait);
        if !retry_after.is_zero() {
            return Permit::Denied { retry_after };
        }

        windows.last_actuation.insert(port.clone(), now);
        windows.last_operation.insert(key, now);
        Permit::Granted
    }

    /// How long `kind` on `port` would wait if requested at `now`.
    /// Read-only; never stamps.
    pub fn wait_time(&self, port: &PortId, kind: OperationKind, now: Instant) -> Duration {
        let windows = self.lock();
        let port_wait = remaining(
            windows.last_actuation.get(port).copied(),
            self.port_cooldown,
            now,
        );
        let op_wait = remaining(
            windows.last_operation.get(&(port.clone(), kind)).copied(),
            self.operation_cooldown,
            now,
        );
        port_wait.max(op_wait)
    }

    fn lock(&self) -> MutexGuard<'_, Windows> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn remaining(last: Option<Instant>, cooldown: Duration, now: Instant) -> Duration {
    last.map_or(Duration::ZERO, |last| {
        cooldown.saturating_sub(now.saturating_duration_since(last))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(secs(10), secs(30))
    }

    #[test]
    fn first_call_is_granted() {
        let limiter = limiter();
        let port = PortId::from("1");
        assert!(
            limiter
                .try_acquire(&port, OperationKind::PowerCycle, Instant::now())
                .is_granted()
        );
    }

    #[test]
    fn same_kind_waits_for_operation_window() {
        let limiter = limiter();
        let port = PortId::from("1");
        let t0 = Instant::now();

        assert!(limiter.try_acquire(&port, OperationKind::PowerCycle, t0).is_granted());
        assert_eq!(
            limiter.try_acquire(&port, OperationKind::PowerCycle, t0 + secs(5)),
            Permit::Denied {
                retry_after: secs(25)
            }
        );
        assert!(
            limiter
                .try_acquire(&port, OperationKind::PowerCycle, t0 + secs(30))
                .is_granted()
        );
    }

    #[test]
    fn other_kind_waits_for_port_window_only() {
        let limiter = limiter();
        let port = PortId::from("1");
        let t0 = Instant::now();

        assert!(limiter.try_acquire(&port, OperationKind::PowerCycle, t0).is_granted());
        assert_eq!(
            limiter.try_acquire(&port, OperationKind::PowerOff, t0 + secs(2)),
            Permit::Denied {
                retry_after: secs(8)
            }
        );
        assert!(
            limiter
                .try_acquire(&port, OperationKind::PowerOff, t0 + secs(10))
                .is_granted()
        );
    }

    #[test]
    fn ports_are_independent() {
        let limiter = limiter();
        let t0 = Instant::now();
        assert!(
            limiter
                .try_acquire(&PortId::from("1"), OperationKind::PowerCycle, t0)
                .is_granted()
        );
        assert!(
            limiter
                .try_acquire(&PortId::from("2"), OperationKind::PowerCycle, t0)
                .is_granted()
        );
    }

    #[test]
    fn denial_does_not_stamp() {
        let limiter = limiter();
        let port = PortId::from("1");
        let t0 = Instant::now();

        limiter.try_acquire(&port, OperationKind::PowerCycle, t0);
        limiter.try_acquire(&port, OperationKind::PowerCycle, t0 + secs(20));
        // A denied attempt at t=20 must not push the window to t=50.
        assert!(
            limiter
                .try_acquire(&port, OperationKind::PowerCycle, t0 + secs(30))
                .is_granted()
        );
    }

    #[test]
    fn wait_time_is_read_only() {
        let limiter = limiter();
        let port = PortId::from("3");
        let t0 = Instant::now();

        assert_eq!(limiter.wait_time(&port, OperationKind::PowerOff, t0), Duration::ZERO);
        limiter.try_acquire(&port, OperationKind::PowerOff, t0);
        assert_eq!(
            limiter.wait_time(&port, OperationKind::PowerOff, t0 + secs(1)),
            secs(29)
        );
        assert_eq!(
            limiter.wait_time(&port, OperationKind::PowerCycle, t0 + secs(1)),
            secs(9)
        );
        assert!(
            limiter
                .try_acquire(&port, OperationKind::PowerCycle, t0 + secs(10))
                .is_granted()
        );
    }

    #[test]
    fn zero_cooldowns_never_deny() {
        let limiter = RateLimiter::new(Duration::ZERO, Duration::ZERO);
        let port = PortId::from("1");
        let t0 = Instant::now();
        assert!(limiter.try_acquire(&port, OperationKind::PowerOff, t0).is_granted());
        assert!(limiter.try_acquire(&port, OperationKind::PowerOff, t0).is_granted());
    }
}
