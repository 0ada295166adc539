//! In-memory gateway and fixture builders for adapter and registry tests.

use super::adapters::AdapterContext;
use super::press_config::PressConfigStore;
use crate::error::{BridgeError, Result};
use crate::gateway::{
    DeviceDescriptor, GatewayClient, GatewayConfiguration, LightDetails, LightStateUpdate,
    SensorDetails, Subdevice, ValueMap,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct FakeGateway {
    pub configuration: GatewayConfiguration,
    devices: Vec<DeviceDescriptor>,
    failing_devices: Vec<String>,
    lights: HashMap<String, LightDetails>,
    sensors: HashMap<String, SensorDetails>,
    reject_writes: bool,
    writes: Mutex<Vec<(String, LightStateUpdate)>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: DeviceDescriptor) -> Self {
        self.devices.push(device);
        self
    }

    /// Listed by the gateway, but fetching its details fails.
    pub fn with_failing_device(mut self, unique_id: &str) -> Self {
        self.failing_devices.push(unique_id.to_string());
        self
    }

    pub fn with_light(mut self, id: &str, details: LightDetails) -> Self {
        self.lights.insert(id.to_string(), details);
        self
    }

    pub fn with_sensor_model(mut self, id: &str, model: &str) -> Self {
        self.sensors.insert(
            id.to_string(),
            SensorDetails {
                model_id: model.to_string(),
                unique_id: id.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    pub fn writes(&self) -> Vec<(String, LightStateUpdate)> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn get_configuration(&self) -> Result<GatewayConfiguration> {
        Ok(self.configuration.clone())
    }

    async fn list_devices(&self) -> Result<Vec<String>> {
        // Failing ids are interleaved with the good ones
        let mut ids = Vec::new();
        let mut failing = self.failing_devices.iter();
        for device in &self.devices {
            ids.push(device.unique_id.clone());
            if let Some(id) = failing.next() {
                ids.push(id.clone());
            }
        }
        ids.extend(failing.cloned());
        Ok(ids)
    }

    async fn get_device(&self, unique_id: &str) -> Result<DeviceDescriptor> {
        self.devices
            .iter()
            .find(|d| d.unique_id == unique_id)
            .cloned()
            .ok_or_else(|| BridgeError::GatewayRejected(format!("resource {} not available", unique_id)))
    }

    async fn get_light(&self, id: &str) -> Result<LightDetails> {
        self.lights
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::GatewayRejected(format!("light {} not available", id)))
    }

    async fn get_sensor(&self, id: &str) -> Result<SensorDetails> {
        self.sensors
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::GatewayRejected(format!("sensor {} not available", id)))
    }

    async fn set_light_state(&self, id: &str, state: &LightStateUpdate) -> Result<()> {
        self.writes.lock().push((id.to_string(), state.clone()));
        if self.reject_writes {
            return Err(BridgeError::GatewayRejected("device is not reachable".to_string()));
        }
        Ok(())
    }
}

pub fn context(gateway: &Arc<FakeGateway>, presses: PressConfigStore) -> AdapterContext {
    AdapterContext::new(gateway.clone(), Arc::new(presses))
}

pub fn values(value: Value) -> ValueMap {
    serde_json::from_value(value).unwrap()
}

pub fn subdevice(device_type: &str, unique_id: &str, state: Value, config: Value) -> Subdevice {
    serde_json::from_value(json!({
        "type": device_type,
        "uniqueid": unique_id,
        "state": state,
        "config": config,
    }))
    .unwrap()
}

pub fn device(unique_id: &str, name: &str, model: &str, subdevices: Vec<Subdevice>) -> DeviceDescriptor {
    DeviceDescriptor {
        unique_id: unique_id.to_string(),
        manufacturer: "Test Vendor".to_string(),
        model_id: model.to_string(),
        name: name.to_string(),
        product_id: None,
        sw_version: Some("1.0.0".to_string()),
        subdevices,
    }
}
