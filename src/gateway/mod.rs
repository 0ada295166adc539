//! deCONZ gateway access.
//!
//! The [`GatewayClient`] trait is the seam between the accessory layer and the
//! gateway: [`rest::RestClient`] implements it over HTTP, tests use an
//! in-memory fake. Live changes arrive separately through [`events::EventStream`].

pub mod device_type;
pub mod events;
pub mod rest;
pub mod types;

pub use device_type::DeviceType;
pub use types::{
    DeviceDescriptor, FieldValue, GatewayConfiguration, LightDetails, LightStateUpdate,
    SensorDetails, Subdevice, ValueMap,
};

use crate::error::Result;
use async_trait::async_trait;
use log::warn;

/// Request/response access to the gateway.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn get_configuration(&self) -> Result<GatewayConfiguration>;

    /// Unique ids of every device known to the gateway.
    async fn list_devices(&self) -> Result<Vec<String>>;

    async fn get_device(&self, unique_id: &str) -> Result<DeviceDescriptor>;

    async fn get_light(&self, id: &str) -> Result<LightDetails>;

    async fn get_sensor(&self, id: &str) -> Result<SensorDetails>;

    async fn set_light_state(&self, id: &str, state: &LightStateUpdate) -> Result<()>;

    /// Fetch the full snapshot of devices.
    ///
    /// Only a failing listing is an error. Devices whose detail fetch fails are
    /// logged and left out of the result.
    async fn get_all_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let ids = self.list_devices().await?;
        let mut devices = Vec::with_capacity(ids.len());

        for id in ids {
            match self.get_device(&id).await {
                Ok(device) => devices.push(device),
                Err(e) => warn!("[Gateway] Failed to fetch device {}: {}", id, e),
            }
        }

        Ok(devices)
    }
}
