//! Power-semantics translator and operation scheduler for machines whose
//! power is gated by PoE ports on a UniFi switch.
//!
//! The switch exposes exactly one hardware primitive per port: power cycle.
//! This crate turns idempotent on/off/cycle/status requests into zero or one
//! calls to that primitive, keeps the switch from being hammered, and tracks
//! a logical running/stopped state that the hardware itself cannot report.
//!
//! - **[`PowerController`]**: Façade the HTTP layer calls.
//!   [`translate()`](PowerController::translate) returns a [`Translation`]:
//!   executed now, accepted into the queue, or a status answer.
//!   [`start()`](PowerController::start) spawns the single background worker.
//!
//! - **[`RateLimiter`]**: Per-port and per-(port, kind) cooldown windows,
//!   checked and stamped atomically.
//!
//! - **[`OperationQueue`]**: Deduplicating queue ordered by scheduled time.
//!   A newer request for the same port and kind replaces the pending one.
//!
//! - **[`StatusTracker`]**: Last applied operation per port and the derived
//!   [`PowerState`]. A cycled port reads stopped until the repower delay
//!   has elapsed.
//!
//! - **[`Actuator`]**: Seam to the switch. [`UnifiActuator`] drives the
//!   UniFi Integration API through `poegate-api`.

pub mod actuator;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod queue;
pub mod rate_limit;
pub mod registry;
pub mod tracker;
pub mod translation;
mod worker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use actuator::{Actuator, UnifiActuator};
pub use config::{SchedulerConfig, SwitchConfig, TlsVerification};
pub use controller::PowerController;
pub use error::CoreError;
pub use queue::OperationQueue;
pub use rate_limit::{Permit, RateLimiter};
pub use registry::PortRegistry;
pub use tracker::StatusTracker;
pub use translation::{Deferral, Execution, QueuedOperation, Translation};

pub use model::{
    Actuation, AppliedOperation, OperationKind, OperationRequest, Outcome, Port, PortId,
    PortStatus, PowerState,
};
