use serde::{Deserialize, Serialize};

/// The platform type of the UniFi controller.
///
/// Determines the URL prefix the Integration API lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControllerPlatform {
    /// UniFi OS device (UDM, UCG, etc.) -- port 443, `/proxy/network/` prefix.
    #[default]
    UnifiOs,
    /// Standalone Network Application (Java) -- port 8443, no prefix.
    Classic,
}

impl ControllerPlatform {
    /// The path prefix for the Integration API.
    ///
    /// On UniFi OS devices: `/proxy/network/integration`
    /// On standalone controllers: `/integration`
    pub fn integration_prefix(self) -> &'static str {
        match self {
            Self::UnifiOs => "/proxy/network/integration",
            Self::Classic => "/integration",
        }
    }
}
