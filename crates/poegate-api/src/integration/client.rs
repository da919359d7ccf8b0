// ── Integration API client ──
//
// Only two calls matter here: the per-port POWER_CYCLE action, and a
// device lookup to validate configuration. Requests carry the API key in
// an `X-API-KEY` default header; paths hang off `<base>/integration/v1/`.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::types::{self, DeviceDetailsResponse, ErrorResponse, PortActionRequest};
use crate::{ControllerPlatform, Error, TransportConfig};

const API_KEY_HEADER: &str = "X-API-KEY";

// ── Client ───────────────────────────────────────────────────────────

/// API-key client for one UniFi controller. Clones share the connection
/// pool.
#[derive(Clone)]
pub struct IntegrationClient {
    http: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for IntegrationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl IntegrationClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Client that authenticates every request with `api_key`.
    ///
    /// The key header is marked sensitive so it never shows up in debug
    /// output of the request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
        platform: ControllerPlatform,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret()).map_err(|_| {
            Error::Authentication {
                message: "API key contains characters not allowed in a header".into(),
            }
        })?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url, platform)?;

        Ok(Self { http, base_url })
    }

    /// Client over a caller-built `reqwest::Client`, which must already
    /// carry whatever auth the controller expects.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        platform: ControllerPlatform,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url, platform)?;
        Ok(Self { http, base_url })
    }

    /// Normalized base, always ending in `/integration/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `raw` may be the controller root, or already point at
    /// `…/integration` or `…/integration/v1`. Request paths carry `v1/`
    /// themselves, so a trailing version segment is dropped.
    fn normalize_base_url(raw: &str, platform: ControllerPlatform) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;

        let mut path = url.path().trim_end_matches('/').to_owned();
        if let Some(stripped) = path.strip_suffix("/v1") {
            path = stripped.to_owned();
        }

        if path.ends_with("/integration") {
            url.set_path(&format!("{path}/"));
        } else {
            let prefix = platform.integration_prefix();
            url.set_path(&format!("{path}{prefix}/"));
        }

        Ok(url)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send `request` to `path` (relative to the base, e.g. `"v1/sites/.."`)
    /// and hand back the response if the controller answered 2xx.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.base_url.join(path)?;
        debug!(%method, %url, "integration request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidApiKey);
        }
        let raw = resp.text().await.unwrap_or_default();
        Err(ErrorResponse::parse(&raw).into_error(status.as_u16(), raw))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let body = self
            .send(Method::GET, path, None::<&()>)
            .await?
            .text()
            .await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body starts {:?})", preview(&body)),
            body,
        })
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Look up the switch. poegate only uses this to prove the key, site
    /// and device id are right before serving.
    pub async fn get_device(
        &self,
        site_id: &Uuid,
        device_id: &Uuid,
    ) -> Result<DeviceDetailsResponse, Error> {
        self.get_json(&format!("v1/sites/{site_id}/devices/{device_id}"))
            .await
    }

    // ── Port actions ─────────────────────────────────────────────────

    /// Execute an action on a single switch port.
    pub async fn port_action(
        &self,
        site_id: &Uuid,
        device_id: &Uuid,
        port_idx: u32,
        action: &str,
    ) -> Result<(), Error> {
        let path =
            format!("v1/sites/{site_id}/devices/{device_id}/interfaces/ports/{port_idx}/actions");
        self.send(Method::POST, &path, Some(&PortActionRequest { action }))
            .await?;
        Ok(())
    }

    /// Cut and restore PoE power on a switch port.
    ///
    /// The controller acknowledges immediately; the port comes back up on
    /// its own a few seconds later.
    pub async fn power_cycle_port(
        &self,
        site_id: &Uuid,
        device_id: &Uuid,
        port_idx: u32,
    ) -> Result<(), Error> {
        self.port_action(site_id, device_id, port_idx, types::POWER_CYCLE)
            .await
    }
}

/// First 200 characters of a response body, for error messages.
fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
