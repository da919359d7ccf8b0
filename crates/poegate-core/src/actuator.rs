// ── Upstream actuator ──
//
// The seam between the scheduler and the switch. The scheduler only ever
// asks for one thing: cycle this switch port.

use async_trait::async_trait;
use poegate_api::IntegrationClient;
use poegate_api::integration_types::DeviceDetailsResponse;
use tracing::debug;
use uuid::Uuid;

use crate::config::SwitchConfig;
use crate::error::CoreError;

/// Performs the single hardware action the switch supports.
///
/// Implementations block for the duration of the upstream call; the
/// scheduler guarantees at most one call per port is in flight.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Unpower then repower `switch_port`.
    async fn cycle_port(&self, switch_port: u32) -> Result<(), CoreError>;
}

/// [`Actuator`] backed by the UniFi Integration API.
#[derive(Debug, Clone)]
pub struct UnifiActuator {
    client: IntegrationClient,
    site_id: Uuid,
    device_id: Uuid,
}

impl UnifiActuator {
    pub fn new(client: IntegrationClient, site_id: Uuid, device_id: Uuid) -> Self {
        Self {
            client,
            site_id,
            device_id,
        }
    }

    /// Build the API client described by `config`.
    pub fn from_config(config: &SwitchConfig) -> Result<Self, CoreError> {
        let client = IntegrationClient::from_api_key(
            config.url.as_str(),
            &config.api_key,
            &config.transport(),
            config.platform,
        )?;
        Ok(Self::new(client, config.site_id, config.device_id))
    }

    /// Fetch the switch's device record. Used to validate credentials and
    /// ids before serving traffic.
    pub async fn device(&self) -> Result<DeviceDetailsResponse, CoreError> {
        Ok(self
            .client
            .get_device(&self.site_id, &self.device_id)
            .await?)
    }
}

#[async_trait]
impl Actuator for UnifiActuator {
    async fn cycle_port(&self, switch_port: u32) -> Result<(), CoreError> {
        debug!(switch_port, device_id = %self.device_id, "requesting PoE power cycle");
        self.client
            .power_cycle_port(&self.site_id, &self.device_id, switch_port)
            .await?;
        Ok(())
    }
}
