//! Water leak detector (`ZHAWater`).

use super::binary_sensor::{BinarySensor, SensorProfile};
use crate::accessory::characteristic::CharacteristicKind;
use crate::accessory::endpoint::EndpointKind;
use crate::gateway::Subdevice;
use std::sync::Arc;

pub static PROFILE: SensorProfile = SensorProfile {
    service: "leak sensor",
    state_key: "water",
    characteristic: CharacteristicKind::LeakDetected,
    endpoint: EndpointKind::LeakSensor,
    active: "water leak detected",
    inactive: "no water leak",
};

pub fn new(label: Arc<str>, subdevice: &Subdevice) -> BinarySensor {
    BinarySensor::new(&PROFILE, label, subdevice)
}
