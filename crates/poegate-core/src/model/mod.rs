// ── Domain model ──
//
// Ports, the operations requested on them, and the status derived from
// operations that were applied.

pub mod operation;
pub mod port;
pub mod status;

pub use operation::{Actuation, OperationKind, OperationRequest, Outcome};
pub use port::{Port, PortId};
pub use status::{AppliedOperation, PortStatus, PowerState};
