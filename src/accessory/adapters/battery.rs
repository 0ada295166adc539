use crate::accessory::characteristic::{Characteristic, CharacteristicKind};
use crate::accessory::endpoint::Endpoint;
use crate::gateway::{Subdevice, ValueMap};
use std::sync::Arc;

/// Battery values of a battery powered sensor.
///
/// Each one exists only if the subdevice reported it at construction:
/// `config.battery` (percent) and `state.lowbattery` (flag).
pub(super) struct Battery {
    level: Option<Arc<Characteristic>>,
    low: Option<Arc<Characteristic>>,
}

impl Battery {
    pub(super) fn from_subdevice(subdevice: &Subdevice) -> Self {
        let level = subdevice.config.get_i64("battery").map(|percent| {
            Arc::new(
                Characteristic::new(CharacteristicKind::BatteryLevel, percent.clamp(0, 100) as i32)
                    .with_bounds(0, 100),
            )
        });
        let low = subdevice.state.get_bool("lowbattery").map(|low| {
            Arc::new(Characteristic::new(
                CharacteristicKind::StatusLowBattery,
                i32::from(low),
            ))
        });
        Self { level, low }
    }

    pub(super) fn apply_state(&self, state: &ValueMap) {
        if let (Some(low), Some(value)) = (&self.low, state.get_bool("lowbattery")) {
            low.set_bool(value);
        }
    }

    pub(super) fn apply_config(&self, config: &ValueMap) {
        if let (Some(level), Some(value)) = (&self.level, config.get_i64("battery")) {
            level.set(value.clamp(0, 100) as i32);
        }
    }

    pub(super) fn attach(&self, endpoint: Endpoint) -> Endpoint {
        endpoint
            .with_optional(self.level.as_ref())
            .with_optional(self.low.as_ref())
    }
}
