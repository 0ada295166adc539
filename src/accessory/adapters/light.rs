//! Lights and switchable outlets.
//!
//! One adapter covers every light capability; [`LightFeatures`] decides which
//! characteristics beyond on/off are exposed. Commands are written to the
//! gateway immediately and arm the [`FeedbackGuard`] so the gateway's echo of
//! the command does not overwrite the freshly set values.

use super::{AccessoryCommand, AdapterContext, FeedbackGuard, ServiceAdapter};
use crate::accessory::characteristic::{Characteristic, CharacteristicKind};
use crate::accessory::convert::{
    clamp_raw, degrees_to_raw_hue, mired_to_kelvin, percent_to_raw, raw_hue_to_degrees,
    raw_to_percent,
};
use crate::accessory::endpoint::{Endpoint, EndpointKind};
use crate::error::{BridgeError, Result};
use crate::gateway::{GatewayClient, LightStateUpdate, Subdevice, ValueMap};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Color temperature range used when the gateway does not report one, in mireds.
pub const DEFAULT_MIRED_RANGE: (u16, u16) = (140, 500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightFeatures {
    pub brightness: bool,
    pub color_temperature: bool,
    /// Hue and saturation
    pub color: bool,
}

impl LightFeatures {
    pub const ON_OFF: Self = Self {
        brightness: false,
        color_temperature: false,
        color: false,
    };
    pub const DIMMABLE: Self = Self {
        brightness: true,
        ..Self::ON_OFF
    };
    pub const COLOR_TEMPERATURE: Self = Self {
        color_temperature: true,
        ..Self::DIMMABLE
    };
    pub const COLOR: Self = Self {
        color: true,
        ..Self::DIMMABLE
    };
    pub const EXTENDED_COLOR: Self = Self {
        color: true,
        ..Self::COLOR_TEMPERATURE
    };
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Light or outlet backed by a gateway light resource.
pub struct Light {
    id: String,
    label: Arc<str>,
    kind: EndpointKind,
    client: Arc<dyn GatewayClient>,
    on: Arc<Characteristic>,
    brightness: Option<Arc<Characteristic>>,
    color_temperature: Option<Arc<Characteristic>>,
    hue: Option<Arc<Characteristic>>,
    saturation: Option<Arc<Characteristic>>,
    feedback: FeedbackGuard,
}

impl Light {
    /// Build the adapter and apply the snapshot state.
    ///
    /// With color temperature, the supported range is fetched from the
    /// gateway; if that fails [`DEFAULT_MIRED_RANGE`] is used.
    pub async fn new(
        ctx: &AdapterContext,
        label: Arc<str>,
        subdevice: &Subdevice,
        kind: EndpointKind,
        features: LightFeatures,
    ) -> Self {
        let percent = |kind| Arc::new(Characteristic::new(kind, 0).with_bounds(0, 100));

        let color_temperature = if features.color_temperature {
            let (min, max) = match ctx.client.get_light(&subdevice.unique_id).await {
                Ok(details) => (
                    details.ctmin.unwrap_or(DEFAULT_MIRED_RANGE.0),
                    details.ctmax.unwrap_or(DEFAULT_MIRED_RANGE.1),
                ),
                Err(e) => {
                    warn!(
                        "[{}] Could not read color temperature range, using defaults: {}",
                        label, e
                    );
                    DEFAULT_MIRED_RANGE
                }
            };
            let (min, max) = (i32::from(min.min(max)), i32::from(max.max(min)));
            Some(Arc::new(
                Characteristic::new(CharacteristicKind::ColorTemperature, min).with_bounds(min, max),
            ))
        } else {
            None
        };

        let light = Self {
            id: subdevice.unique_id.clone(),
            label,
            kind,
            client: ctx.client.clone(),
            on: Arc::new(Characteristic::new(CharacteristicKind::On, 0).with_bounds(0, 1)),
            brightness: features
                .brightness
                .then(|| percent(CharacteristicKind::Brightness)),
            color_temperature,
            hue: features.color.then(|| {
                Arc::new(Characteristic::new(CharacteristicKind::Hue, 0).with_bounds(0, 360))
            }),
            saturation: features
                .color
                .then(|| percent(CharacteristicKind::Saturation)),
            feedback: FeedbackGuard::new(),
        };
        light.apply_state(&subdevice.state);
        light
    }

    pub fn is_on(&self) -> bool {
        self.on.get_bool()
    }

    /// Current value of every exposed characteristic.
    fn snapshot(&self) -> Vec<(Arc<Characteristic>, i32)> {
        std::iter::once(&self.on)
            .chain(self.brightness.iter())
            .chain(self.color_temperature.iter())
            .chain(self.hue.iter())
            .chain(self.saturation.iter())
            .map(|c| (c.clone(), c.get()))
            .collect()
    }

    fn supports(&self, command: &AccessoryCommand) -> bool {
        match command {
            AccessoryCommand::SetOn(_) => true,
            AccessoryCommand::SetBrightness(_) => self.brightness.is_some(),
            AccessoryCommand::SetColorTemperature(_) => self.color_temperature.is_some(),
            AccessoryCommand::SetHue(_) => self.hue.is_some(),
            AccessoryCommand::SetSaturation(_) => self.saturation.is_some(),
        }
    }

    fn unsupported(&self, command: &AccessoryCommand) -> BridgeError {
        BridgeError::UnsupportedCommand {
            service: self.service(),
            command: format!("{:?}", command),
        }
    }

    fn require<'a>(
        &self,
        characteristic: &'a Option<Arc<Characteristic>>,
        command: &AccessoryCommand,
    ) -> Result<&'a Arc<Characteristic>> {
        characteristic
            .as_ref()
            .ok_or_else(|| self.unsupported(command))
    }

    /// Update the exposed values for `command` and build the gateway write.
    fn prepare(&self, command: &AccessoryCommand) -> Result<LightStateUpdate> {
        let update = match *command {
            AccessoryCommand::SetOn(on) => {
                info!("[{}] set {}", self.label, on_off(on));
                self.on.set_bool(on);
                LightStateUpdate {
                    on: Some(on),
                    ..Default::default()
                }
            }
            AccessoryCommand::SetBrightness(percent) => {
                let brightness = self.require(&self.brightness, command)?;
                let percent = percent.min(100);
                info!("[{}] set brightness to {}%", self.label, percent);
                brightness.set(i32::from(percent));

                // Zero brightness means off; the gateway rejects bri 0 with on
                let raw = percent_to_raw(percent);
                self.on.set_bool(raw > 0);
                if raw == 0 {
                    LightStateUpdate {
                        on: Some(false),
                        ..Default::default()
                    }
                } else {
                    LightStateUpdate {
                        on: Some(true),
                        bri: Some(raw),
                        ..Default::default()
                    }
                }
            }
            AccessoryCommand::SetColorTemperature(mired) => {
                let color_temperature = self.require(&self.color_temperature, command)?;
                color_temperature.set(i32::from(mired));
                let mired = color_temperature.get() as u16;
                info!(
                    "[{}] set color temperature to {} K ({})",
                    self.label,
                    mired_to_kelvin(mired),
                    mired
                );
                LightStateUpdate {
                    ct: Some(mired),
                    ..Default::default()
                }
            }
            AccessoryCommand::SetHue(degrees) => {
                let hue = self.require(&self.hue, command)?;
                let raw = degrees_to_raw_hue(degrees);
                info!("[{}] set hue to {:.0} degrees", self.label, degrees);
                hue.set(raw_hue_to_degrees(raw).round() as i32);
                LightStateUpdate {
                    hue: Some(raw),
                    ..Default::default()
                }
            }
            AccessoryCommand::SetSaturation(percent) => {
                let saturation = self.require(&self.saturation, command)?;
                let percent = percent.min(100);
                info!("[{}] set saturation to {}%", self.label, percent);
                saturation.set(i32::from(percent));
                LightStateUpdate {
                    sat: Some(percent_to_raw(percent)),
                    ..Default::default()
                }
            }
        };
        Ok(update)
    }
}

#[async_trait]
impl ServiceAdapter for Light {
    fn service(&self) -> &'static str {
        match self.kind {
            EndpointKind::Outlet => "outlet",
            _ => "light",
        }
    }

    fn subdevice_id(&self) -> &str {
        &self.id
    }

    fn apply_state(&self, state: &ValueMap) {
        // Held until all values are applied
        let Some(_admitted) = self.feedback.admit() else {
            debug!("[{}] Ignoring state within feedback window", self.label);
            return;
        };

        if let Some(on) = state.get_bool("on") {
            self.on.set_bool(on);
        }
        if let (Some(brightness), Some(raw)) = (&self.brightness, state.get_i64("bri")) {
            brightness.set(i32::from(raw_to_percent(clamp_raw(raw))));
        }
        if let (Some(color_temperature), Some(mired)) =
            (&self.color_temperature, state.get_i64("ct"))
        {
            color_temperature.set(mired.clamp(0, i64::from(u16::MAX)) as i32);
        }
        if let (Some(hue), Some(raw)) = (&self.hue, state.get_i64("hue")) {
            let raw = raw.clamp(0, i64::from(u16::MAX)) as u16;
            hue.set(raw_hue_to_degrees(raw).round() as i32);
        }
        if let (Some(saturation), Some(raw)) = (&self.saturation, state.get_i64("sat")) {
            saturation.set(i32::from(raw_to_percent(clamp_raw(raw))));
        }
    }

    fn apply_config(&self, _config: &ValueMap) {}

    fn endpoints(&self) -> Vec<Endpoint> {
        vec![
            Endpoint::new(self.label.as_ref(), self.kind)
                .with(&self.on)
                .with_optional(self.brightness.as_ref())
                .with_optional(self.color_temperature.as_ref())
                .with_optional(self.hue.as_ref())
                .with_optional(self.saturation.as_ref()),
        ]
    }

    async fn handle_command(&self, command: AccessoryCommand) -> Result<()> {
        if !self.supports(&command) {
            return Err(self.unsupported(&command));
        }

        let previous = self.snapshot();

        // Armed before the values change so that no inbound echo can interleave
        self.feedback.record();
        let update = self.prepare(&command)?;

        if let Err(e) = self.client.set_light_state(&self.id, &update).await {
            error!("[{}] Failed to apply {:?}: {}", self.label, command, e);
            // The gateway kept its state, so show it again and accept its reports
            for (characteristic, value) in previous {
                characteristic.set(value);
            }
            self.feedback.clear();
            return Err(e);
        }
        Ok(())
    }
}
