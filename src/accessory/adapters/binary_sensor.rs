//! Shared implementation of the read-only boolean sensors.

use super::ServiceAdapter;
use super::battery::Battery;
use crate::accessory::characteristic::{Characteristic, CharacteristicKind};
use crate::accessory::endpoint::{Endpoint, EndpointKind};
use crate::gateway::{Subdevice, ValueMap};
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

/// What distinguishes one boolean sensor from another.
#[derive(Debug)]
pub struct SensorProfile {
    pub service: &'static str,
    /// State key carrying the reading
    pub state_key: &'static str,
    pub characteristic: CharacteristicKind,
    pub endpoint: EndpointKind,
    /// Logged when the reading becomes true / false
    pub active: &'static str,
    pub inactive: &'static str,
}

/// Boolean sensor with optional battery reporting.
pub struct BinarySensor {
    profile: &'static SensorProfile,
    id: String,
    label: Arc<str>,
    value: Arc<Characteristic>,
    battery: Battery,
}

impl BinarySensor {
    pub fn new(profile: &'static SensorProfile, label: Arc<str>, subdevice: &Subdevice) -> Self {
        let initial = subdevice.state.get_bool(profile.state_key).unwrap_or(false);
        let value = Arc::new(Characteristic::new(
            profile.characteristic,
            i32::from(initial),
        ));

        Self {
            profile,
            id: subdevice.unique_id.clone(),
            label,
            value,
            battery: Battery::from_subdevice(subdevice),
        }
    }

    pub fn reading(&self) -> bool {
        self.value.get_bool()
    }
}

#[async_trait]
impl ServiceAdapter for BinarySensor {
    fn service(&self) -> &'static str {
        self.profile.service
    }

    fn subdevice_id(&self) -> &str {
        &self.id
    }

    fn apply_state(&self, state: &ValueMap) {
        if let Some(reading) = state.get_bool(self.profile.state_key)
            && self.value.set_bool(reading)
        {
            let word = if reading {
                self.profile.active
            } else {
                self.profile.inactive
            };
            match state.last_updated(self.profile.state_key) {
                Some(at) => info!("[{}] {} (at {})", self.label, word, at),
                None => info!("[{}] {}", self.label, word),
            }
        }
        self.battery.apply_state(state);
    }

    fn apply_config(&self, config: &ValueMap) {
        self.battery.apply_config(config);
    }

    fn endpoints(&self) -> Vec<Endpoint> {
        let endpoint = Endpoint::new(self.label.as_ref(), self.profile.endpoint)
            .with(&self.value);
        vec![self.battery.attach(endpoint)]
    }
}
