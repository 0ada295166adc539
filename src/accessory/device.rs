//! Device adapter: one accessory per physical gateway device.
//!
//! Each subdevice's capability tag is looked up in [`CAPABILITIES`] and the
//! matching service adapter is constructed. Subdevices that are unknown or
//! fail to construct are skipped; a device left without any adapter is not
//! exposed at all.

use super::adapters::{
    AdapterContext, Light, LightFeatures, ProgrammableSwitch, ServiceAdapter, contact_sensor,
    leak_sensor, motion_sensor,
};
use super::endpoint::{Endpoint, EndpointKind};
use super::identifier::derive_id;
use crate::error::{BridgeError, Result};
use crate::gateway::{DeviceDescriptor, DeviceType, GatewayConfiguration, Subdevice};
use log::{debug, info, warn};
use std::str::FromStr;
use std::sync::Arc;

/// Service adapter variant built for a capability tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    OnOffLight,
    DimmableLight,
    ColorTemperatureLight,
    ColorLight,
    ExtendedColorLight,
    Outlet,
    ContactSensor,
    LeakSensor,
    MotionSensor,
    Switch,
}

/// Capability tags with an adapter. Anything else is "not implemented".
pub const CAPABILITIES: &[(DeviceType, Capability)] = &[
    (DeviceType::OnOffLight, Capability::OnOffLight),
    (DeviceType::OnOffLightSwitch, Capability::OnOffLight),
    (DeviceType::DimmableLight, Capability::DimmableLight),
    (DeviceType::DimmablePlugInUnit, Capability::DimmableLight),
    (DeviceType::ColorTemperatureLight, Capability::ColorTemperatureLight),
    (DeviceType::ColorLight, Capability::ColorLight),
    (DeviceType::ExtendedColorLight, Capability::ExtendedColorLight),
    (DeviceType::OnOffPlugInUnit, Capability::Outlet),
    (DeviceType::SmartPlug, Capability::Outlet),
    (DeviceType::OnOffOutput, Capability::Outlet),
    (DeviceType::OnOffSwitch, Capability::Outlet),
    (DeviceType::OpenCloseSensor, Capability::ContactSensor),
    (DeviceType::Water, Capability::LeakSensor),
    (DeviceType::PresenceSensor, Capability::MotionSensor),
    (DeviceType::Switch, Capability::Switch),
];

impl Capability {
    /// Capability for a raw subdevice tag, `None` if unknown or unsupported.
    pub fn for_tag(tag: &str) -> Option<Self> {
        let device_type = DeviceType::from_str(tag).ok()?;
        CAPABILITIES
            .iter()
            .find(|(t, _)| *t == device_type)
            .map(|(_, capability)| *capability)
    }

    async fn build(
        self,
        ctx: &AdapterContext,
        label: Arc<str>,
        subdevice: &Subdevice,
    ) -> Result<Arc<dyn ServiceAdapter>> {
        let light = |kind, features| Light::new(ctx, label.clone(), subdevice, kind, features);

        let adapter: Arc<dyn ServiceAdapter> = match self {
            Capability::OnOffLight => {
                Arc::new(light(EndpointKind::Lightbulb, LightFeatures::ON_OFF).await)
            }
            Capability::DimmableLight => {
                Arc::new(light(EndpointKind::Lightbulb, LightFeatures::DIMMABLE).await)
            }
            Capability::ColorTemperatureLight => {
                Arc::new(light(EndpointKind::Lightbulb, LightFeatures::COLOR_TEMPERATURE).await)
            }
            Capability::ColorLight => {
                Arc::new(light(EndpointKind::Lightbulb, LightFeatures::COLOR).await)
            }
            Capability::ExtendedColorLight => {
                Arc::new(light(EndpointKind::Lightbulb, LightFeatures::EXTENDED_COLOR).await)
            }
            Capability::Outlet => Arc::new(light(EndpointKind::Outlet, LightFeatures::ON_OFF).await),
            Capability::ContactSensor => Arc::new(contact_sensor::new(label.clone(), subdevice)),
            Capability::LeakSensor => Arc::new(leak_sensor::new(label.clone(), subdevice)),
            Capability::MotionSensor => Arc::new(motion_sensor::new(label.clone(), subdevice)),
            Capability::Switch => {
                Arc::new(ProgrammableSwitch::new(ctx, label.clone(), subdevice).await?)
            }
        };
        Ok(adapter)
    }
}

/// Descriptive metadata of an accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware: String,
}

impl AccessoryInfo {
    fn for_device(descriptor: &DeviceDescriptor) -> Self {
        Self {
            name: descriptor.display_name().to_string(),
            manufacturer: descriptor.manufacturer.clone(),
            model: descriptor.model_id.clone(),
            serial_number: descriptor.unique_id.clone(),
            firmware: descriptor.sw_version.clone().unwrap_or_default(),
        }
    }

    /// Metadata of the bridge accessory itself.
    ///
    /// The name is the gateway name followed by the first four characters of
    /// its bridge id, so that several bridges can be told apart.
    pub fn for_bridge(gateway: &GatewayConfiguration) -> Self {
        let suffix: String = gateway
            .bridge_id
            .chars()
            .take(4)
            .filter(|c| *c != ':')
            .collect();
        let name = if suffix.is_empty() {
            gateway.name.clone()
        } else {
            format!("{} {}", gateway.name, suffix)
        };

        Self {
            name,
            manufacturer: "deCONZ Bridge".to_string(),
            model: gateway.device_name.clone(),
            serial_number: gateway.bridge_id.clone(),
            firmware: gateway.sw_version.clone(),
        }
    }
}

/// One exposed accessory and the service adapters of its subdevices.
pub struct AccessoryRecord {
    id: u64,
    unique_id: String,
    info: AccessoryInfo,
    /// In subdevice order
    adapters: Vec<Arc<dyn ServiceAdapter>>,
}

impl AccessoryRecord {
    /// Build the accessory for `descriptor`.
    ///
    /// Fails with [`BridgeError::NoServices`] if none of its subdevices
    /// produced an adapter.
    pub async fn build(ctx: &AdapterContext, descriptor: &DeviceDescriptor) -> Result<Self> {
        let info = AccessoryInfo::for_device(descriptor);
        let label: Arc<str> = Arc::from(info.name.as_str());
        info!("[{}] Discovered device ({})", label, descriptor.unique_id);

        let mut adapters: Vec<Arc<dyn ServiceAdapter>> = Vec::new();
        for subdevice in &descriptor.subdevices {
            if adapters
                .iter()
                .any(|a| a.subdevice_id() == subdevice.unique_id)
            {
                warn!(
                    "[{}] Duplicate subdevice {}, skipping",
                    label, subdevice.unique_id
                );
                continue;
            }

            let Some(capability) = Capability::for_tag(&subdevice.device_type) else {
                warn!(
                    "[{}] Failed to add the service {}: not implemented",
                    label, subdevice.device_type
                );
                continue;
            };

            match capability.build(ctx, label.clone(), subdevice).await {
                Ok(adapter) => {
                    debug!(
                        "[{}] Added {} for {}",
                        label,
                        adapter.service(),
                        subdevice.unique_id
                    );
                    adapters.push(adapter);
                }
                Err(e) => warn!(
                    "[{}] Failed to add the service {}: {}",
                    label, subdevice.device_type, e
                ),
            }
        }

        if adapters.is_empty() {
            warn!(
                "[{}] The device has no active services and will not be exposed",
                label
            );
            return Err(BridgeError::NoServices(descriptor.unique_id.clone()));
        }

        Ok(Self {
            id: derive_id(&descriptor.unique_id),
            unique_id: descriptor.unique_id.clone(),
            info,
            adapters,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn info(&self) -> &AccessoryInfo {
        &self.info
    }

    pub fn adapters(&self) -> &[Arc<dyn ServiceAdapter>] {
        &self.adapters
    }

    pub fn adapter(&self, subdevice_id: &str) -> Option<&Arc<dyn ServiceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.subdevice_id() == subdevice_id)
    }

    /// All endpoints of the accessory, in subdevice order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.adapters.iter().flat_map(|a| a.endpoints()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::press_config::PressConfigStore;
    use crate::accessory::testing::{FakeGateway, context, device, subdevice};
    use serde_json::json;

    #[test]
    fn test_capability_table() {
        assert_eq!(Capability::for_tag("On/Off light"), Some(Capability::OnOffLight));
        assert_eq!(Capability::for_tag("Smart plug"), Some(Capability::Outlet));
        assert_eq!(
            Capability::for_tag("ZHAPresence"),
            Some(Capability::MotionSensor)
        );
        // Known tag without an adapter
        assert_eq!(Capability::for_tag("ZHATemperature"), None);
        assert_eq!(Capability::for_tag("Flux capacitor"), None);
    }

    #[tokio::test]
    async fn test_build_mixed_device() {
        let gateway = Arc::new(FakeGateway::new());
        let ctx = context(&gateway, PressConfigStore::default());
        let descriptor = device(
            "00:15:8d:00:01:02:03:04",
            "Multi sensor",
            "lumi.sensor",
            vec![
                subdevice("ZHAOpenClose", "00:15:8d:00:01:02:03:04-01-0006", json!({"open": true}), json!({})),
                subdevice("ZHATemperature", "00:15:8d:00:01:02:03:04-01-0402", json!({"temperature": 2150}), json!({})),
                subdevice("ZHAWater", "00:15:8d:00:01:02:03:04-01-0500", json!({"water": false}), json!({})),
            ],
        );

        let record = AccessoryRecord::build(&ctx, &descriptor).await.unwrap();
        assert_eq!(record.id(), 0x0015_8d00_0102_0304);
        assert_eq!(record.adapters().len(), 2);
        assert_eq!(record.info().name, "Multi sensor");
        assert_eq!(record.info().firmware, "1.0.0");
        assert_eq!(
            record
                .adapter("00:15:8d:00:01:02:03:04-01-0500")
                .map(|a| a.service()),
            Some("leak sensor")
        );
        assert!(record.adapter("00:15:8d:00:01:02:03:04-01-0402").is_none());

        let kinds: Vec<EndpointKind> = record.endpoints().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EndpointKind::ContactSensor, EndpointKind::LeakSensor]);
    }

    #[tokio::test]
    async fn test_device_without_services_is_rejected() {
        let gateway = Arc::new(FakeGateway::new());
        let ctx = context(&gateway, PressConfigStore::default());
        let descriptor = device(
            "00:11:22:33:44:55:66:77",
            "Remote",
            "UNKNOWN-REMOTE",
            vec![
                // No press configuration for this model
                subdevice("ZHASwitch", "00:11:22:33:44:55:66:77-01-1000", json!({}), json!({})),
                subdevice("ZHAThermostat", "00:11:22:33:44:55:66:77-01-0201", json!({}), json!({})),
            ],
        );

        let result = AccessoryRecord::build(&ctx, &descriptor).await;
        assert!(matches!(result, Err(BridgeError::NoServices(id)) if id == "00:11:22:33:44:55:66:77"));
    }

    #[tokio::test]
    async fn test_duplicate_subdevice_is_skipped() {
        let gateway = Arc::new(FakeGateway::new());
        let ctx = context(&gateway, PressConfigStore::default());
        let plug = subdevice("Smart plug", "00:0d:6f:00:11:22:33:44-01", json!({"on": false}), json!({}));
        let descriptor = device("00:0d:6f:00:11:22:33:44", "", "SP 120", vec![plug.clone(), plug]);

        let record = AccessoryRecord::build(&ctx, &descriptor).await.unwrap();
        assert_eq!(record.adapters().len(), 1);
        // Falls back to the model when unnamed
        assert_eq!(record.info().name, "SP 120");
    }

    #[test]
    fn test_bridge_info() {
        let gateway = GatewayConfiguration {
            name: "Phoscon-GW".to_string(),
            bridge_id: "00:21:2E:FF:FF:01:23:45".to_string(),
            device_name: "ConBee II".to_string(),
            sw_version: "2.25.3".to_string(),
            ..Default::default()
        };
        let info = AccessoryInfo::for_bridge(&gateway);
        assert_eq!(info.name, "Phoscon-GW 002");
        assert_eq!(info.manufacturer, "deCONZ Bridge");
        assert_eq!(info.model, "ConBee II");
        assert_eq!(info.serial_number, "00:21:2E:FF:FF:01:23:45");

        let plain = GatewayConfiguration {
            name: "Phoscon-GW".to_string(),
            bridge_id: "00212EFFFF012345".to_string(),
            ..Default::default()
        };
        assert_eq!(AccessoryInfo::for_bridge(&plain).name, "Phoscon-GW 0021");
    }
}
