//! Door/window contact (`ZHAOpenClose`).

use super::binary_sensor::{BinarySensor, SensorProfile};
use crate::accessory::characteristic::CharacteristicKind;
use crate::accessory::endpoint::EndpointKind;
use crate::gateway::Subdevice;
use std::sync::Arc;

/// `state.open` true exposes 1 (contact not detected), false exposes 0.
pub static PROFILE: SensorProfile = SensorProfile {
    service: "contact sensor",
    state_key: "open",
    characteristic: CharacteristicKind::ContactSensorState,
    endpoint: EndpointKind::ContactSensor,
    active: "open",
    inactive: "closed",
};

pub fn new(label: Arc<str>, subdevice: &Subdevice) -> BinarySensor {
    BinarySensor::new(&PROFILE, label, subdevice)
}
