//! Multi-button remotes (`ZHASwitch`).
//!
//! Each configured button becomes its own stateless programmable switch
//! endpoint. A `buttonevent` code is split into its button prefix and action
//! suffix, the button is found by prefix and the full code is looked up in
//! that button's event map.

use super::{AdapterContext, ServiceAdapter};
use crate::accessory::characteristic::{Characteristic, CharacteristicKind};
use crate::accessory::endpoint::{Endpoint, EndpointKind};
use crate::accessory::press_config::{ButtonConfiguration, split_event_code};
use crate::error::{BridgeError, Result};
use crate::gateway::{Subdevice, ValueMap};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

struct Button {
    config: ButtonConfiguration,
    event: Arc<Characteristic>,
    index: Arc<Characteristic>,
}

/// Remote whose presses are decoded through its model's press descriptor.
pub struct ProgrammableSwitch {
    id: String,
    label: Arc<str>,
    /// Keyed by button prefix
    buttons: BTreeMap<String, Button>,
}

impl ProgrammableSwitch {
    /// Fails if the sensor details cannot be fetched or no descriptor exists
    /// for the model.
    pub async fn new(ctx: &AdapterContext, label: Arc<str>, subdevice: &Subdevice) -> Result<Self> {
        let details = ctx.client.get_sensor(&subdevice.unique_id).await?;
        let configuration = ctx
            .presses
            .get(&details.model_id)
            .ok_or_else(|| BridgeError::MissingPressConfiguration(details.model_id.clone()))?;

        let mut buttons = BTreeMap::new();
        for config in &configuration.buttons {
            let prefixes = config.prefixes();
            let Some(prefix) = prefixes.first() else {
                warn!(
                    "[{}] Button \"{}\" has no usable event codes, skipping",
                    label, config.name
                );
                continue;
            };
            if buttons.contains_key(prefix) {
                warn!(
                    "[{}] Button \"{}\" reuses button prefix {}, skipping",
                    label, config.name, prefix
                );
                continue;
            }

            let valid_values = config
                .press_types()
                .into_iter()
                .map(|press| press.switch_event_value())
                .collect();
            let event = Arc::new(
                Characteristic::new(CharacteristicKind::ProgrammableSwitchEvent, 0)
                    .with_valid_values(valid_values),
            );
            let index = Arc::new(Characteristic::new(
                CharacteristicKind::ServiceLabelIndex,
                prefix.parse().unwrap_or(0),
            ));

            buttons.insert(
                prefix.clone(),
                Button {
                    config: config.clone(),
                    event,
                    index,
                },
            );
        }

        if buttons.is_empty() {
            return Err(BridgeError::UnsupportedCapability(format!(
                "no usable buttons for model {}",
                details.model_id
            )));
        }

        debug!(
            "[{}] {} buttons from press configuration for {}",
            label,
            buttons.len(),
            details.model_id
        );

        Ok(Self {
            id: subdevice.unique_id.clone(),
            label,
            buttons,
        })
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }
}

#[async_trait]
impl ServiceAdapter for ProgrammableSwitch {
    fn service(&self) -> &'static str {
        "switch"
    }

    fn subdevice_id(&self) -> &str {
        &self.id
    }

    fn apply_state(&self, state: &ValueMap) {
        let Some(code) = state.get_i64("buttonevent") else {
            return;
        };
        let Some((prefix, action)) = split_event_code(code) else {
            debug!("[{}] Ignoring button event {}", self.label, code);
            return;
        };
        info!("[{}] button {} got event {}", self.label, prefix, action);

        let Some(button) = self.buttons.get(&prefix) else {
            return;
        };
        if let Some(press) = button.config.press_for(code) {
            button.event.emit(press.switch_event_value());
        }
    }

    fn apply_config(&self, _config: &ValueMap) {}

    fn endpoints(&self) -> Vec<Endpoint> {
        self.buttons
            .values()
            .map(|button| {
                Endpoint::new(
                    button.config.name.as_str(),
                    EndpointKind::StatelessProgrammableSwitch,
                )
                .with(&button.event)
                .with(&button.index)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::characteristic::Observable;
    use crate::accessory::press_config::{PressConfigStore, PressConfiguration, PressType};
    use crate::accessory::testing::{FakeGateway, context, subdevice, values};
    use serde_json::json;

    const SWITCH_ID: &str = "00:17:88:01:10:5e:31:ac-02-fc00";

    fn presses() -> PressConfigStore {
        let configuration: PressConfiguration = serde_json::from_value(json!({
            "schemaVersion": "1.0",
            "manufacturer": "Philips",
            "models": ["RWL021"],
            "description": "Hue dimmer switch",
            "buttons": [
                {"name": "On", "eventMap": {"1002": "SINGLE_PRESS", "1003": "LONG_PRESS"}},
                {"name": "Off", "eventMap": {"2004": "DOUBLE_PRESS", "2002": "SINGLE_PRESS"}},
                {"name": "Unmapped", "eventMap": {}}
            ]
        }))
        .unwrap();
        PressConfigStore::from_configurations([configuration])
    }

    async fn remote(model: &str) -> Result<ProgrammableSwitch> {
        let gateway = Arc::new(FakeGateway::new().with_sensor_model(SWITCH_ID, model));
        let ctx = context(&gateway, presses());
        let sub = subdevice("ZHASwitch", SWITCH_ID, json!({"buttonevent": 1002}), json!({"battery": 80}));
        ProgrammableSwitch::new(&ctx, "Dimmer".into(), &sub).await
    }

    fn event_of(remote: &ProgrammableSwitch, label: &str) -> Arc<Characteristic> {
        remote
            .endpoints()
            .into_iter()
            .find(|e| e.label == label)
            .and_then(|e| e.characteristic(CharacteristicKind::ProgrammableSwitchEvent).cloned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_endpoint_per_button() {
        let remote = remote("RWL021").await.unwrap();
        assert_eq!(remote.button_count(), 2);

        let endpoints = remote.endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].label, "On");
        assert_eq!(endpoints[0].kind, EndpointKind::StatelessProgrammableSwitch);

        // Only the press types each button can produce
        let on = event_of(&remote, "On");
        assert_eq!(on.valid_values(), &[0, 2]);
        let off = event_of(&remote, "Off");
        assert_eq!(off.valid_values(), &[0, 1]);

        let index = endpoints[1]
            .characteristic(CharacteristicKind::ServiceLabelIndex)
            .unwrap();
        assert_eq!(index.get(), 2);

        // The snapshot press is not replayed
        assert_eq!(on.version(), 0);
    }

    #[tokio::test]
    async fn test_button_events_are_decoded() {
        let remote = remote("RWL021").await.unwrap();
        let on = event_of(&remote, "On");
        let off = event_of(&remote, "Off");

        remote.apply_state(&values(json!({"buttonevent": 1003})));
        assert_eq!(on.get(), PressType::Long.switch_event_value());
        assert_eq!(on.version(), 1);

        remote.apply_state(&values(json!({"buttonevent": 2004})));
        assert_eq!(off.get(), PressType::Double.switch_event_value());
        assert_eq!(on.version(), 1);
    }

    #[tokio::test]
    async fn test_repeated_press_notifies_again() {
        let remote = remote("RWL021").await.unwrap();
        let on = event_of(&remote, "On");

        remote.apply_state(&values(json!({"buttonevent": 1002})));
        remote.apply_state(&values(json!({"buttonevent": 1002})));
        assert_eq!(on.get(), 0);
        assert_eq!(on.version(), 2);
    }

    #[tokio::test]
    async fn test_unmapped_codes_are_ignored() {
        let remote = remote("RWL021").await.unwrap();
        let on = event_of(&remote, "On");
        let off = event_of(&remote, "Off");

        for code in [1001, 3002, 999, 7] {
            remote.apply_state(&values(json!({"buttonevent": code})));
        }
        remote.apply_state(&values(json!({"lastupdated": "2024-03-01T12:00:00"})));
        assert_eq!(on.version(), 0);
        assert_eq!(off.version(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_fails() {
        let result = remote("SOMETHING-ELSE").await;
        assert!(matches!(
            result,
            Err(BridgeError::MissingPressConfiguration(model)) if model == "SOMETHING-ELSE"
        ));
    }

    #[tokio::test]
    async fn test_sensor_fetch_failure_fails() {
        let gateway = Arc::new(FakeGateway::new());
        let ctx = context(&gateway, presses());
        let sub = subdevice("ZHASwitch", SWITCH_ID, json!({}), json!({}));
        let result = ProgrammableSwitch::new(&ctx, "Dimmer".into(), &sub).await;
        assert!(matches!(result, Err(BridgeError::GatewayRejected(_))));
    }
}
