use std::sync::Arc;

use chrono::{DateTime, Utc};
use poegate_core::PowerController;
use secrecy::SecretString;

/// Shared state handed to every handler via `State<AppState>`.
///
/// Cheaply cloneable: the controller is `Arc`-backed already.
#[derive(Clone)]
pub struct AppState {
    pub controller: PowerController,
    /// When set, requests must present this token.
    pub auth_token: Option<Arc<SecretString>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(controller: PowerController, auth_token: Option<SecretString>) -> Self {
        Self {
            controller,
            auth_token: auth_token.map(Arc::new),
            started_at: Utc::now(),
        }
    }
}
