// ── Scheduler worker ──
//
// One background loop drains due queue entries on a fixed tick. Entries
// run sequentially, so at most one actuator call is ever issued by the
// worker at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::ControllerInner;
use crate::model::Outcome;
use crate::queue::Enqueued;
use crate::rate_limit::Permit;

const MIN_TICK: Duration = Duration::from_millis(10);

pub(crate) async fn run(inner: Arc<ControllerInner>, cancel: CancellationToken) {
    let period = inner.config.tick_interval.max(MIN_TICK);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        tick_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        "scheduler worker started"
    );

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let executed = inner.process_due().await;
                if executed > 0 {
                    debug!(executed, pending = inner.queue.len(), "worker tick");
                }
            }
        }
    }

    debug!("scheduler worker stopped");
}

impl ControllerInner {
    /// Run every queue entry that is due now. Returns how many reached
    /// the actuator.
    pub(crate) async fn process_due(&self) -> usize {
        let due = self.queue.drain_due(Instant::now());
        let mut executed = 0;

        for entry in due {
            let request = entry.request;
            let Some(port) = self.registry.get(&request.port) else {
                warn!(port = %request.port, "dropping queued operation for unknown port");
                continue;
            };

            let now = Instant::now();
            match self.limiter.try_acquire(&port.id, request.kind, now) {
                Permit::Granted => {
                    info!(port = %port.id, kind = %request.kind, "executing queued operation");
                    let execution = self.execute(port, request.kind).await;
                    executed += 1;
                    if let Outcome::Failure { reason } = &execution.outcome {
                        warn!(
                            port = %port.id,
                            kind = %request.kind,
                            error = %reason,
                            "queued operation failed"
                        );
                    }
                }
                Permit::Denied { retry_after } => {
                    let port_id = port.id.clone();
                    let kind = request.kind;
                    match self.queue.requeue(request, now + retry_after) {
                        Enqueued::Dropped => {
                            debug!(port = %port_id, kind = %kind, "requeue skipped, newer request pending");
                        }
                        Enqueued::New | Enqueued::Superseded => {
                            debug!(
                                port = %port_id,
                                kind = %kind,
                                retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                                "queued operation still rate limited"
                            );
                        }
                    }
                }
            }
        }

        executed
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::actuator::Actuator;
    use crate::config::SchedulerConfig;
    use crate::controller::PowerController;
    use crate::error::CoreError;
    use crate::model::{OperationKind, OperationRequest, Port, PortId};
    use crate::registry::PortRegistry;

    #[derive(Default)]
    struct CountingActuator {
        ports: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl Actuator for CountingActuator {
        async fn cycle_port(&self, switch_port: u32) -> Result<(), CoreError> {
            self.ports.lock().unwrap().push(switch_port);
            Ok(())
        }
    }

    fn controller(actuator: Arc<CountingActuator>) -> PowerController {
        let registry = PortRegistry::new([Port {
            id: PortId::from("7"),
            switch_port: 12,
            label: "pi-node-7".into(),
            ip: None,
        }])
        .unwrap();
        PowerController::new(registry, SchedulerConfig::default(), actuator)
    }

    #[tokio::test(start_paused = true)]
    async fn queued_entries_use_switch_port_number() {
        let actuator = Arc::new(CountingActuator::default());
        let controller = controller(actuator.clone());
        controller.start().await;

        let request = OperationRequest::new(PortId::from("7"), OperationKind::PowerOff)
            .with_delay(Duration::from_secs(2));
        controller.submit(request).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(*actuator.ports.lock().unwrap(), vec![12]);

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn early_entry_is_requeued_not_dropped() {
        let actuator = Arc::new(CountingActuator::default());
        let controller = controller(actuator.clone());
        controller.start().await;
        let port = PortId::from("7");

        let delayed = OperationRequest::new(port.clone(), OperationKind::PowerOff)
            .with_delay(Duration::from_secs(5));
        controller.submit(delayed).await.unwrap();

        // A cycle at t=1 closes the port window until t=11, so the entry
        // due at t=5 has to go back into the queue.
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller
            .translate(&port, OperationKind::PowerCycle)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(actuator.ports.lock().unwrap().len(), 1);
        assert_eq!(controller.pending(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(actuator.ports.lock().unwrap().len(), 2);
        assert_eq!(controller.pending(), 0);

        controller.shutdown().await;
    }
}
