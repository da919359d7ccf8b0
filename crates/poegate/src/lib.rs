//! HTTP front end of poegate: the webhook routes an orchestrator's power
//! driver calls, mounted on a [`PowerController`](poegate_core::PowerController).

pub mod server;
