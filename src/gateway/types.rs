//! Records exchanged with the deCONZ REST API and event stream.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One field of a gateway state or config payload.
///
/// The device listing wraps each field as `{"value": .., "lastupdated": ..}`,
/// while events and the light/sensor endpoints send the raw value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Timestamped {
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lastupdated: Option<String>,
    },
    Raw(Value),
}

impl FieldValue {
    pub fn value(&self) -> &Value {
        match self {
            FieldValue::Timestamped { value, .. } => value,
            FieldValue::Raw(value) => value,
        }
    }
}

/// Keyed state or config payload of a subdevice.
///
/// Absence of a key means "no change / not reported". A key mapped to `null`
/// counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMap(HashMap<String, FieldValue>);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is present with a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0
            .get(key)
            .map(FieldValue::value)
            .filter(|value| !value.is_null())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.value(key)?.as_bool()
    }

    /// Integer value of `key`; fractional numbers are truncated.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let value = self.value(key)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value(key)?.as_str()
    }

    /// When `key` was last reported by the device.
    ///
    /// Uses the per-field timestamp if the payload carries one, otherwise the
    /// payload-wide `lastupdated` entry.
    pub fn last_updated(&self, key: &str) -> Option<NaiveDateTime> {
        let raw = match self.0.get(key)? {
            FieldValue::Timestamped {
                lastupdated: Some(ts),
                ..
            } => ts.as_str(),
            _ => self.get_str("lastupdated")?,
        };
        parse_timestamp(raw)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), FieldValue::Raw(value));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a gateway timestamp such as `2024-03-01T12:30:00.123` (UTC, optional `Z`).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), TIMESTAMP_FORMAT).ok()
}

/// Physical device as returned by `GET /devices/{uniqueid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    #[serde(rename = "uniqueid")]
    pub unique_id: String,
    #[serde(rename = "manufacturername", default)]
    pub manufacturer: String,
    #[serde(rename = "modelid", default)]
    pub model_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "productid", default)]
    pub product_id: Option<String>,
    #[serde(rename = "swversion", default)]
    pub sw_version: Option<String>,
    #[serde(default)]
    pub subdevices: Vec<Subdevice>,
}

impl DeviceDescriptor {
    /// Name shown to the user, falling back to the model when the gateway has none.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.model_id
        } else {
            &self.name
        }
    }
}

/// One functional unit of a device (a light, a sensor, a switch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subdevice {
    /// Capability tag, see [`super::DeviceType`]
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(rename = "uniqueid")]
    pub unique_id: String,
    #[serde(default)]
    pub state: ValueMap,
    #[serde(default)]
    pub config: ValueMap,
}

/// Gateway-wide configuration from `GET /config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "bridgeid", default)]
    pub bridge_id: String,
    #[serde(rename = "devicename", default)]
    pub device_name: String,
    #[serde(rename = "modelid", default)]
    pub model_id: String,
    #[serde(rename = "swversion", default)]
    pub sw_version: String,
    #[serde(rename = "apiversion", default)]
    pub api_version: String,
    #[serde(default)]
    pub mac: String,
    #[serde(rename = "websocketport", default = "default_websocket_port")]
    pub websocket_port: u16,
    #[serde(rename = "zigbeechannel", default)]
    pub zigbee_channel: u8,
}

fn default_websocket_port() -> u16 {
    443
}

/// Light record from `GET /lights/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LightDetails {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(rename = "modelid", default)]
    pub model_id: String,
    #[serde(rename = "uniqueid", default)]
    pub unique_id: String,
    /// Coolest supported color temperature, in mireds
    #[serde(default)]
    pub ctmin: Option<u16>,
    /// Warmest supported color temperature, in mireds
    #[serde(default)]
    pub ctmax: Option<u16>,
    #[serde(default)]
    pub state: ValueMap,
}

/// Sensor record from `GET /sensors/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorDetails {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(rename = "modelid", default)]
    pub model_id: String,
    #[serde(rename = "manufacturername", default)]
    pub manufacturer: String,
    #[serde(rename = "uniqueid", default)]
    pub unique_id: String,
    #[serde(default)]
    pub state: ValueMap,
    #[serde(default)]
    pub config: ValueMap,
}

/// Body of `PUT /lights/{id}/state`. Unset fields are left untouched by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightStateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    /// Raw brightness 0-255
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    /// Raw hue 0-65535
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    /// Raw saturation 0-255
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    /// Color temperature in mireds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
}
