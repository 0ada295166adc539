//! HTTP client for the deCONZ REST API.

use super::{
    DeviceDescriptor, GatewayClient, GatewayConfiguration, LightDetails, LightStateUpdate,
    SensorDetails,
};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// deCONZ error type returned while the link button has not been pressed.
const LINK_BUTTON_NOT_PRESSED: i64 = 101;

/// One entry of the `[{"success": ..}, {"error": ..}]` reply list.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiReply {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

/// REST client bound to one gateway and API key.
pub struct RestClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    /// Create a client for `base_url` (e.g. `http://10.0.0.2:80`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}{}", self.base_url, self.api_key, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("[Gateway] GET {}", path);
        let response = self.http.get(self.url(path)).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Ask the gateway for a new API key.
    ///
    /// Fails with [`BridgeError::LinkButtonNotPressed`] until the user unlocks
    /// the gateway (link button or Phoscon app).
    pub async fn request_api_key(base_url: &str, device_type: &str) -> Result<String> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let replies: Vec<ApiReply> = http
            .post(format!("{}/api", base_url))
            .json(&json!({ "devicetype": device_type }))
            .send()
            .await?
            .json()
            .await?;

        let key = parse_api_key_reply(&replies)?;
        info!("[Gateway] Received a new API key");
        Ok(key)
    }
}

/// Extract the username from a key request reply.
pub fn parse_api_key_reply(replies: &[ApiReply]) -> Result<String> {
    for reply in replies {
        if let Some(error) = &reply.error {
            if error.kind == LINK_BUTTON_NOT_PRESSED {
                return Err(BridgeError::LinkButtonNotPressed);
            }
            return Err(BridgeError::GatewayRejected(error.description.clone()));
        }
        if let Some(username) = reply
            .success
            .as_ref()
            .and_then(|s| s.get("username"))
            .and_then(Value::as_str)
        {
            return Ok(username.to_string());
        }
    }
    Err(BridgeError::GatewayRejected(
        "empty reply to API key request".to_string(),
    ))
}

/// Turn a write reply into an error if any entry failed.
pub fn check_write_reply(replies: &[ApiReply]) -> Result<()> {
    let errors: Vec<String> = replies
        .iter()
        .filter_map(|r| r.error.as_ref())
        .map(|e| format!("{} ({})", e.description, e.address))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BridgeError::GatewayRejected(errors.join(", ")))
    }
}

#[async_trait]
impl GatewayClient for RestClient {
    async fn get_configuration(&self) -> Result<GatewayConfiguration> {
        self.get("/config").await
    }

    async fn list_devices(&self) -> Result<Vec<String>> {
        self.get("/devices").await
    }

    async fn get_device(&self, unique_id: &str) -> Result<DeviceDescriptor> {
        self.get(&format!("/devices/{}", unique_id)).await
    }

    async fn get_light(&self, id: &str) -> Result<LightDetails> {
        self.get(&format!("/lights/{}", id)).await
    }

    async fn get_sensor(&self, id: &str) -> Result<SensorDetails> {
        self.get(&format!("/sensors/{}", id)).await
    }

    async fn set_light_state(&self, id: &str, state: &LightStateUpdate) -> Result<()> {
        let path = format!("/lights/{}/state", id);
        debug!("[Gateway] PUT {} {:?}", path, state);

        // deCONZ reports rejected attributes in the body, sometimes with a 200
        let replies: Vec<ApiReply> = self
            .http
            .put(self.url(&path))
            .json(state)
            .send()
            .await?
            .json()
            .await?;
        check_write_reply(&replies)
    }
}
