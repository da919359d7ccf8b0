// ── Power controller ──
//
// The translator façade the HTTP layer talks to. Maps the four logical
// operations onto zero or one actuator calls, routes actuating work
// through the rate limiter and queue, and owns the background worker.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::config::SchedulerConfig;
use crate::error::CoreError;
use crate::model::{
    Actuation, OperationKind, OperationRequest, Outcome, Port, PortId, PortStatus, PowerState,
};
use crate::queue::{Enqueued, OperationQueue};
use crate::rate_limit::{Permit, RateLimiter};
use crate::registry::PortRegistry;
use crate::tracker::StatusTracker;
use crate::translation::{Deferral, Execution, QueuedOperation, Translation};
use crate::worker;

// ── PowerController ──────────────────────────────────────────────

/// Entry point for the HTTP layer.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Call
/// [`start()`](Self::start) to spawn the worker that drains the queue.
#[derive(Clone)]
pub struct PowerController {
    inner: Arc<ControllerInner>,
}

pub(crate) struct ControllerInner {
    pub(crate) config: SchedulerConfig,
    pub(crate) registry: PortRegistry,
    pub(crate) limiter: RateLimiter,
    pub(crate) queue: OperationQueue,
    pub(crate) tracker: StatusTracker,
    actuator: Arc<dyn Actuator>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PowerController {
    pub fn new(
        registry: PortRegistry,
        config: SchedulerConfig,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        let limiter = RateLimiter::new(config.port_cooldown, config.operation_cooldown);
        let tracker = StatusTracker::new(config.power_cycle_delay);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                registry,
                limiter,
                queue: OperationQueue::new(),
                tracker,
                actuator,
                cancel: CancellationToken::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &PortRegistry {
        &self.inner.registry
    }

    /// Configured ports, ordered by id.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inner.registry.iter()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the scheduler worker. Calling it again is a no-op.
    pub async fn start(&self) {
        let mut slot = self.inner.worker.lock().await;
        if slot.is_some() || self.inner.cancel.is_cancelled() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let cancel = self.inner.cancel.clone();
        *slot = Some(tokio::spawn(worker::run(inner, cancel)));
    }

    /// Stop the worker and discard everything still queued.
    ///
    /// Final: a controller that was shut down cannot be started again.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handle = self.inner.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "scheduler worker ended abnormally");
            }
        }

        let dropped = self.inner.queue.clear();
        if dropped > 0 {
            info!(dropped, "discarded queued operations on shutdown");
        }
    }

    // ── Translation ──────────────────────────────────────────────

    /// Translate a logical operation on `port`.
    pub async fn translate(
        &self,
        port: &PortId,
        kind: OperationKind,
    ) -> Result<Translation, CoreError> {
        self.submit(OperationRequest::new(port.clone(), kind)).await
    }

    /// Translate a fully-specified request, honoring its optional delay.
    pub async fn submit(&self, request: OperationRequest) -> Result<Translation, CoreError> {
        let inner = &self.inner;
        let port = inner.registry.require(&request.port)?;
        info!(port = %port.id, kind = %request.kind, "translating request");

        let translation = match (request.kind, request.kind.actuation()) {
            (_, Some(Actuation::Cycle)) => self.actuate_or_defer(port, request).await,
            (OperationKind::StatusQuery, None) => {
                Translation::Status(inner.tracker.current_status(&port.id, Instant::now()))
            }
            // PowerOn needs no hardware action: the cycle already repowers.
            (_, None) => {
                inner
                    .tracker
                    .record(&port.id, request.kind, &Outcome::Success, Instant::now());
                Translation::Executed(Execution {
                    port: port.id.clone(),
                    kind: request.kind,
                    outcome: Outcome::Success,
                    actuated: false,
                    at: Utc::now(),
                })
            }
        };
        Ok(translation)
    }

    /// Current logical state of `port`.
    pub fn query_status(&self, port: &PortId) -> Result<PowerState, CoreError> {
        let port = self.inner.registry.require(port)?;
        Ok(self.inner.tracker.current_status(&port.id, Instant::now()))
    }

    /// Full tracked status of `port`. Untouched ports report Unknown.
    pub fn snapshot(&self, port: &PortId) -> Result<PortStatus, CoreError> {
        let port = self.inner.registry.require(port)?;
        Ok(self
            .inner
            .tracker
            .snapshot(&port.id, Instant::now())
            .unwrap_or_else(|| PortStatus {
                port: port.id.clone(),
                state: PowerState::Unknown,
                last_operation: None,
                repower_in_ms: None,
            }))
    }

    /// Operations waiting in the queue for `port`.
    pub fn queued(&self, port: &PortId) -> Result<Vec<QueuedOperation>, CoreError> {
        let port = self.inner.registry.require(port)?;
        let now = Instant::now();
        Ok([OperationKind::PowerOff, OperationKind::PowerCycle]
            .into_iter()
            .filter_map(|kind| {
                let entry = self.inner.queue.pending(&port.id, kind)?;
                let due_in = entry.not_before.saturating_duration_since(now);
                Some(QueuedOperation {
                    kind,
                    due_in_ms: u64::try_from(due_in.as_millis()).unwrap_or(u64::MAX),
                })
            })
            .collect())
    }

    /// Number of queued operations across all ports.
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    async fn actuate_or_defer(&self, port: &Port, request: OperationRequest) -> Translation {
        let inner = &self.inner;
        let now = Instant::now();

        if let Some(delay) = request.delay.filter(|d| !d.is_zero()) {
            // The delay counts from submission, not from when we got here.
            let waited = now.saturating_duration_since(request.submitted_at);
            let remaining = delay.saturating_sub(waited);
            let wait = remaining.max(inner.limiter.wait_time(&port.id, request.kind, now));
            return self.defer(request, wait, now);
        }

        match inner.limiter.try_acquire(&port.id, request.kind, now) {
            Permit::Granted => {
                // Running now makes any pending entry for the pair redundant.
                if inner.queue.cancel(&port.id, request.kind) {
                    debug!(port = %port.id, kind = %request.kind, "pending entry superseded by immediate run");
                }
                Translation::Executed(self.execute_detached(port, request.kind).await)
            }
            Permit::Denied { retry_after } => self.defer(request, retry_after, now),
        }
    }

    /// Run a granted call on its own task so the outcome is recorded even
    /// if the caller stops waiting (client gone, request timeout).
    async fn execute_detached(&self, port: &Port, kind: OperationKind) -> Execution {
        let inner = Arc::clone(&self.inner);
        let owned = port.clone();
        let task = tokio::spawn(async move { inner.execute(&owned, kind).await });

        match task.await {
            Ok(execution) => execution,
            Err(e) => {
                warn!(port = %port.id, kind = %kind, error = %e, "actuator task aborted");
                Execution {
                    port: port.id.clone(),
                    kind,
                    outcome: Outcome::Failure {
                        reason: format!("actuator task aborted: {e}"),
                    },
                    actuated: true,
                    at: Utc::now(),
                }
            }
        }
    }

    fn defer(&self, request: OperationRequest, wait: Duration, now: Instant) -> Translation {
        let port = request.port.clone();
        let kind = request.kind;
        let at = request.requested_at;

        let enqueued = self.inner.queue.enqueue(request, now + wait);
        let superseded = enqueued == Enqueued::Superseded;
        if superseded {
            debug!(port = %port, kind = %kind, "replaced pending queued operation");
        }
        info!(
            port = %port,
            kind = %kind,
            retry_after_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            "operation queued"
        );

        Translation::Accepted(Deferral {
            port,
            kind,
            retry_after: wait,
            superseded,
            at,
        })
    }
}

impl ControllerInner {
    /// Call the actuator for `port` and record the outcome.
    ///
    /// The caller must already hold a rate-limiter grant.
    pub(crate) async fn execute(&self, port: &Port, kind: OperationKind) -> Execution {
        let call = self.actuator.cycle_port(port.switch_port);
        let outcome = match tokio::time::timeout(self.config.actuator_timeout, call).await {
            Ok(Ok(())) => Outcome::Success,
            Ok(Err(e)) => Outcome::Failure {
                reason: e.to_string(),
            },
            Err(_) => Outcome::Failure {
                reason: CoreError::Timeout {
                    timeout_secs: self.config.actuator_timeout.as_secs(),
                }
                .to_string(),
            },
        };

        self.tracker.record(&port.id, kind, &outcome, Instant::now());
        Execution {
            port: port.id.clone(),
            kind,
            outcome,
            actuated: true,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[derive(Default)]
    struct RecordingActuator {
        calls: StdMutex<Vec<(u32, Instant)>>,
        fail: AtomicBool,
        latency: Option<Duration>,
    }

    impl RecordingActuator {
        fn calls(&self) -> Vec<(u32, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Actuator for RecordingActuator {
        async fn cycle_port(&self, switch_port: u32) -> Result<(), CoreError> {
            self.calls.lock().unwrap().push((switch_port, Instant::now()));
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoreError::Actuator {
                    message: "HTTP 500".into(),
                    status: Some(500),
                    transient: true,
                });
            }
            Ok(())
        }
    }

    fn registry() -> PortRegistry {
        PortRegistry::new((1..=3).map(|n| Port {
            id: PortId::from(n.to_string()),
            switch_port: n,
            label: format!("pi-node-{n}"),
            ip: None,
        }))
        .unwrap()
    }

    fn fixture_with(actuator: RecordingActuator) -> (PowerController, Arc<RecordingActuator>) {
        let actuator = Arc::new(actuator);
        let controller =
            PowerController::new(registry(), SchedulerConfig::default(), actuator.clone());
        (controller, actuator)
    }

    fn fixture() -> (PowerController, Arc<RecordingActuator>) {
        fixture_with(RecordingActuator::default())
    }

    fn expect_executed(t: Translation) -> Execution {
        match t {
            Translation::Executed(e) => e,
            other => panic!("expected Executed, got {other:?}"),
        }
    }

    fn expect_accepted(t: Translation) -> Deferral {
        match t {
            Translation::Accepted(d) => d,
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_then_rate_limited_cycle_runs_later() {
        let (controller, actuator) = fixture();
        controller.start().await;
        let port = PortId::from("1");

        let first = expect_executed(
            controller
                .translate(&port, OperationKind::PowerCycle)
                .await
                .unwrap(),
        );
        assert!(first.outcome.is_success());
        assert_eq!(first.status_label(), "cycling");
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Stopped);

        tokio::time::sleep(secs(3)).await;
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Running);

        tokio::time::sleep(secs(2)).await;
        let second = expect_accepted(
            controller
                .translate(&port, OperationKind::PowerCycle)
                .await
                .unwrap(),
        );
        assert_eq!(second.retry_after, secs(25));
        assert_eq!(actuator.calls().len(), 1);
        assert_eq!(controller.pending(), 1);

        // Worker ticks at t=30 and runs it.
        tokio::time::sleep(secs(26)).await;
        let calls = actuator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1 - calls[0].1, secs(30));
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Stopped);
        assert_eq!(controller.pending(), 0);

        tokio::time::sleep(secs(2)).await;
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Running);

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn power_on_never_actuates() {
        let (controller, actuator) = fixture();
        let port = PortId::from("2");

        let exec = expect_executed(
            controller
                .translate(&port, OperationKind::PowerOn)
                .await
                .unwrap(),
        );
        assert!(!exec.actuated);
        assert_eq!(exec.status_label(), "no_action_needed");
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Running);

        // Repeated power-on is never rate limited either.
        controller
            .translate(&port, OperationKind::PowerOn)
            .await
            .unwrap();
        assert!(actuator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn status_query_reads_without_mutation() {
        let (controller, actuator) = fixture();
        let port = PortId::from("1");

        let t = controller
            .translate(&port, OperationKind::StatusQuery)
            .await
            .unwrap();
        assert_eq!(t, Translation::Status(PowerState::Unknown));
        assert_eq!(PowerState::Unknown.status_line(), "status: stopped");
        assert!(controller.snapshot(&port).unwrap().last_operation.is_none());
        assert!(actuator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_port_is_rejected_without_state() {
        let (controller, actuator) = fixture();
        let port = PortId::from("99");

        let err = controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap_err();
        assert!(err.is_unknown_port());
        assert!(controller.query_status(&port).unwrap_err().is_unknown_port());
        assert!(controller.snapshot(&port).is_err());
        assert!(!controller.inner.tracker.is_tracked(&port));
        assert_eq!(controller.pending(), 0);
        assert!(actuator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_requests_supersede_each_other() {
        let (controller, actuator) = fixture();
        controller.start().await;
        let port = PortId::from("1");

        controller
            .translate(&port, OperationKind::PowerOff)
            .await
            .unwrap();

        tokio::time::sleep(secs(1)).await;
        let a = expect_accepted(
            controller
                .translate(&port, OperationKind::PowerOff)
                .await
                .unwrap(),
        );
        assert!(!a.superseded);

        tokio::time::sleep(secs(1)).await;
        let b = expect_accepted(
            controller
                .translate(&port, OperationKind::PowerOff)
                .await
                .unwrap(),
        );
        assert!(b.superseded);
        assert_eq!(controller.pending(), 1);

        tokio::time::sleep(secs(60)).await;
        assert_eq!(actuator.calls().len(), 2);

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn same_port_calls_are_spaced_by_port_cooldown() {
        let (controller, actuator) = fixture();
        controller.start().await;
        let port = PortId::from("3");

        controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap();

        tokio::time::sleep(secs(2)).await;
        let deferral = expect_accepted(
            controller
                .translate(&port, OperationKind::PowerOff)
                .await
                .unwrap(),
        );
        assert_eq!(deferral.retry_after, secs(8));

        tokio::time::sleep(secs(15)).await;
        let calls = actuator.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].1 - calls[0].1 >= secs(10));

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn other_ports_are_not_held_back() {
        let (controller, actuator) = fixture();

        for n in ["1", "2", "3"] {
            let t = controller
                .translate(&PortId::from(n), OperationKind::PowerCycle)
                .await
                .unwrap();
            assert!(matches!(t, Translation::Executed(_)));
        }
        assert_eq!(actuator.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_leaves_status_unchanged() {
        let (controller, actuator) = fixture();
        let port = PortId::from("1");

        controller
            .translate(&port, OperationKind::PowerOn)
            .await
            .unwrap();
        actuator.fail.store(true, Ordering::SeqCst);

        let exec = expect_executed(
            controller
                .translate(&port, OperationKind::PowerOff)
                .await
                .unwrap(),
        );
        assert_eq!(exec.status_label(), "failed");
        assert!(matches!(exec.outcome, Outcome::Failure { ref reason } if reason.contains("HTTP 500")));
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Running);

        let snapshot = controller.snapshot(&port).unwrap();
        assert_eq!(snapshot.last_operation.unwrap().kind, OperationKind::PowerOff);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_call_still_consumes_the_window() {
        let (controller, actuator) = fixture();
        actuator.fail.store(true, Ordering::SeqCst);
        let port = PortId::from("1");

        controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap();
        let retry = controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap();
        assert!(matches!(retry, Translation::Accepted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_actuator_times_out() {
        let (controller, _actuator) = fixture_with(RecordingActuator {
            latency: Some(secs(120)),
            ..RecordingActuator::default()
        });
        let port = PortId::from("1");

        let exec = expect_executed(
            controller
                .translate(&port, OperationKind::PowerCycle)
                .await
                .unwrap(),
        );
        assert!(matches!(exec.outcome, Outcome::Failure { ref reason } if reason.contains("30s")));
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn request_during_in_flight_call_is_queued() {
        let (controller, actuator) = fixture_with(RecordingActuator {
            latency: Some(secs(2)),
            ..RecordingActuator::default()
        });
        let port = PortId::from("1");

        let (first, second) = tokio::join!(
            controller.translate(&port, OperationKind::PowerCycle),
            async {
                tokio::task::yield_now().await;
                controller.translate(&port, OperationKind::PowerCycle).await
            }
        );
        assert!(matches!(first.unwrap(), Translation::Executed(_)));
        assert!(matches!(second.unwrap(), Translation::Accepted(_)));
        assert_eq!(actuator.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_caller_still_records_the_cycle() {
        let (controller, actuator) = fixture_with(RecordingActuator {
            latency: Some(secs(2)),
            ..RecordingActuator::default()
        });
        let port = PortId::from("1");

        let gave_up = tokio::time::timeout(
            secs(1),
            controller.translate(&port, OperationKind::PowerCycle),
        )
        .await;
        assert!(gave_up.is_err());

        // The call finishes at t=2; repower is due at t=5.
        tokio::time::sleep(secs(2)).await;
        assert_eq!(actuator.calls().len(), 1);
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Stopped);

        let last = controller.snapshot(&port).unwrap().last_operation.unwrap();
        assert_eq!(last.kind, OperationKind::PowerCycle);
        assert!(last.outcome.is_success());

        tokio::time::sleep(secs(3)).await;
        assert_eq!(controller.query_status(&port).unwrap(), PowerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_request_waits_in_queue() {
        let (controller, actuator) = fixture();
        controller.start().await;
        let port = PortId::from("2");

        let request =
            OperationRequest::new(port.clone(), OperationKind::PowerCycle).with_delay(secs(5));
        let deferral = expect_accepted(controller.submit(request).await.unwrap());
        assert_eq!(deferral.retry_after, secs(5));

        let queued = controller.queued(&port).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind, OperationKind::PowerCycle);

        tokio::time::sleep(secs(3)).await;
        assert!(actuator.calls().is_empty());
        tokio::time::sleep(secs(3)).await;
        assert_eq!(actuator.calls().len(), 1);

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delay_counts_from_submission() {
        let (controller, _actuator) = fixture();
        let port = PortId::from("2");

        let request =
            OperationRequest::new(port.clone(), OperationKind::PowerOff).with_delay(secs(5));
        tokio::time::sleep(secs(2)).await;

        let deferral = expect_accepted(controller.submit(request).await.unwrap());
        assert_eq!(deferral.retry_after, secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_run_cancels_pending_entry() {
        let (controller, actuator) = fixture();
        controller.start().await;
        let port = PortId::from("2");

        let delayed =
            OperationRequest::new(port.clone(), OperationKind::PowerCycle).with_delay(secs(5));
        controller.submit(delayed).await.unwrap();

        let now = controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap();
        assert!(matches!(now, Translation::Executed(_)));
        assert_eq!(controller.pending(), 0);

        tokio::time::sleep(secs(60)).await;
        assert_eq!(actuator.calls().len(), 1);

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_queue() {
        let (controller, actuator) = fixture();
        controller.start().await;
        controller.start().await;
        let port = PortId::from("1");

        controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap();
        controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap();
        assert_eq!(controller.pending(), 1);

        controller.shutdown().await;
        assert_eq!(controller.pending(), 0);

        tokio::time::sleep(secs(60)).await;
        assert_eq!(actuator.calls().len(), 1);
    }
}
