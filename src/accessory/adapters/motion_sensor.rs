//! Motion / presence detector (`ZHAPresence`).

use super::binary_sensor::{BinarySensor, SensorProfile};
use crate::accessory::characteristic::CharacteristicKind;
use crate::accessory::endpoint::EndpointKind;
use crate::gateway::Subdevice;
use std::sync::Arc;

pub static PROFILE: SensorProfile = SensorProfile {
    service: "motion sensor",
    state_key: "presence",
    characteristic: CharacteristicKind::MotionDetected,
    endpoint: EndpointKind::MotionSensor,
    active: "motion detected",
    inactive: "no motion",
};

pub fn new(label: Arc<str>, subdevice: &Subdevice) -> BinarySensor {
    BinarySensor::new(&PROFILE, label, subdevice)
}
