// ── Deduplicating operation queue ──
//
// Holds rate-limited or intentionally delayed requests until they are due.
// At most one entry exists per (port, kind): a newer request replaces the
// pending one, so the queue is bounded by ports × actuating kinds.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::model::{OperationKind, OperationRequest, PortId};

type QueueKey = (PortId, OperationKind);

/// A queued request and the earliest time it may run.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub request: OperationRequest,
    pub not_before: Instant,
}

/// What happened to an enqueued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// No entry existed for the pair.
    New,
    /// An older pending entry for the pair was replaced and will never run.
    Superseded,
    /// A newer entry already exists; this request was dropped instead.
    Dropped,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: HashMap<QueueKey, (u64, QueueEntry)>,
    /// Scheduled-time index over `pending`, ordered by (not_before, seq).
    schedule: BTreeMap<(Instant, u64), QueueKey>,
    next_seq: u64,
}

impl QueueState {
    fn insert(&mut self, key: QueueKey, entry: QueueEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.schedule.insert((entry.not_before, seq), key.clone());
        self.pending.insert(key, (seq, entry));
    }

    fn remove(&mut self, key: &QueueKey) -> Option<QueueEntry> {
        let (seq, entry) = self.pending.remove(key)?;
        self.schedule.remove(&(entry.not_before, seq));
        Some(entry)
    }
}

#[derive(Debug, Default)]
pub struct OperationQueue {
    state: Mutex<QueueState>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `request` to run no earlier than `not_before`, replacing any
    /// pending entry for the same (port, kind).
    pub fn enqueue(&self, request: OperationRequest, not_before: Instant) -> Enqueued {
        let key = (request.port.clone(), request.kind);
        let mut state = self.lock();
        let replaced = state.remove(&key).is_some();
        state.insert(key, QueueEntry { request, not_before });
        if replaced {
            Enqueued::Superseded
        } else {
            Enqueued::New
        }
    }

    /// Put back an entry that was drained but could not run yet.
    ///
    /// If a newer request for the same pair arrived in the meantime, the
    /// newer one wins and the returned entry is dropped.
    pub fn requeue(&self, request: OperationRequest, not_before: Instant) -> Enqueued {
        let key = (request.port.clone(), request.kind);
        let mut state = self.lock();
        if state.pending.contains_key(&key) {
            return Enqueued::Dropped;
        }
        state.insert(key, QueueEntry { request, not_before });
        Enqueued::New
    }

    /// Drop the pending entry for a pair. Returns `true` if one existed.
    pub fn cancel(&self, port: &PortId, kind: OperationKind) -> bool {
        self.lock().remove(&(port.clone(), kind)).is_some()
    }

    /// Remove and return every entry due at `now`, earliest first.
    pub fn drain_due(&self, now: Instant) -> Vec<QueueEntry> {
        let mut state = self.lock();
        let mut due = Vec::new();
        while let Some(entry) = state.schedule.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let key = entry.remove();
            if let Some((_, queued)) = state.pending.remove(&key) {
                due.push(queued);
            }
        }
        due
    }

    /// The pending entry for a pair, if any.
    pub fn pending(&self, port: &PortId, kind: OperationKind) -> Option<QueueEntry> {
        self.lock()
            .pending
            .get(&(port.clone(), kind))
            .map(|(_, entry)| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard everything; returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.schedule.clear();
        dropped
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn request(port: &str, kind: OperationKind) -> OperationRequest {
        OperationRequest::new(PortId::from(port), kind)
    }

    #[test]
    fn drains_in_scheduled_order() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();

        queue.enqueue(request("1", OperationKind::PowerCycle), t0 + secs(20));
        queue.enqueue(request("2", OperationKind::PowerCycle), t0 + secs(5));
        queue.enqueue(request("3", OperationKind::PowerOff), t0 + secs(10));

        let due = queue.drain_due(t0 + secs(15));
        let ports: Vec<_> = due.iter().map(|e| e.request.port.as_str()).collect();
        assert_eq!(ports, vec!["2", "3"]);
        assert_eq!(queue.len(), 1);
        assert!(queue.drain_due(t0 + secs(19)).is_empty());
        assert_eq!(queue.drain_due(t0 + secs(20)).len(), 1);
    }

    #[test]
    fn drained_entries_are_not_returned_twice() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();
        queue.enqueue(request("1", OperationKind::PowerOff), t0);

        assert_eq!(queue.drain_due(t0).len(), 1);
        assert!(queue.drain_due(t0 + secs(60)).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn same_pair_is_superseded_not_appended() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();

        let first = request("1", OperationKind::PowerCycle);
        let second = request("1", OperationKind::PowerCycle).with_delay(secs(7));

        assert_eq!(queue.enqueue(first, t0 + secs(25)), Enqueued::New);
        assert_eq!(queue.enqueue(second, t0 + secs(24)), Enqueued::Superseded);
        assert_eq!(queue.len(), 1);

        let due = queue.drain_due(t0 + secs(30));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].request.delay, Some(secs(7)));
        assert_eq!(due[0].not_before, t0 + secs(24));
    }

    #[test]
    fn superseded_schedule_slot_is_released() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();

        queue.enqueue(request("1", OperationKind::PowerCycle), t0 + secs(5));
        queue.enqueue(request("1", OperationKind::PowerCycle), t0 + secs(50));

        // The replaced slot at t=5 must not fire.
        assert!(queue.drain_due(t0 + secs(10)).is_empty());
        assert_eq!(queue.drain_due(t0 + secs(50)).len(), 1);
    }

    #[test]
    fn different_kinds_are_separate_entries() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();

        queue.enqueue(request("1", OperationKind::PowerCycle), t0);
        queue.enqueue(request("1", OperationKind::PowerOff), t0);
        assert_eq!(queue.len(), 2);
        assert!(queue.pending(&PortId::from("1"), OperationKind::PowerOff).is_some());
    }

    #[test]
    fn requeue_yields_to_newer_request() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();

        queue.enqueue(request("1", OperationKind::PowerOff), t0);
        let drained = queue.drain_due(t0).pop().unwrap();

        let newer = request("1", OperationKind::PowerOff).with_delay(secs(1));
        queue.enqueue(newer, t0 + secs(3));

        assert_eq!(
            queue.requeue(drained.request, t0 + secs(2)),
            Enqueued::Dropped
        );
        let pending = queue.pending(&PortId::from("1"), OperationKind::PowerOff).unwrap();
        assert_eq!(pending.request.delay, Some(secs(1)));
    }

    #[test]
    fn cancel_releases_the_slot() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();
        let port = PortId::from("4");

        queue.enqueue(request("4", OperationKind::PowerCycle), t0);
        assert!(queue.cancel(&port, OperationKind::PowerCycle));
        assert!(!queue.cancel(&port, OperationKind::PowerCycle));
        assert!(queue.drain_due(t0 + secs(1)).is_empty());
    }

    #[test]
    fn clear_reports_dropped_count() {
        let queue = OperationQueue::new();
        let t0 = Instant::now();
        queue.enqueue(request("1", OperationKind::PowerOff), t0);
        queue.enqueue(request("2", OperationKind::PowerOff), t0);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(queue.drain_due(t0 + secs(60)).is_empty());
    }
}
