//! Build press descriptors from the deCONZ `button_maps.json` table.
//!
//! The REST plugin ships a table of every supported remote: named button and
//! action constants plus, per device family, rows of
//! `[mode, endpoint, cluster, command, params, BUTTON, ACTION, doc]`.
//! A row's event code is `buttons[BUTTON] + buttonActions[ACTION]`.

use super::press_config::{
    ButtonConfiguration, EVENT_CODE_THRESHOLD, PressConfiguration, PressType,
};
use crate::error::Result;
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const BUTTON_MAPS_URL: &str =
    "https://raw.githubusercontent.com/dresden-elektronik/deconz-rest-plugin/master/button_maps.json";

pub const SCHEMA_VERSION: &str = "1.0";

const BUTTON_COLUMN: usize = 5;
const ACTION_COLUMN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonMapFile {
    #[serde(default)]
    pub buttons: HashMap<String, i64>,
    #[serde(rename = "buttonActions", default)]
    pub actions: HashMap<String, i64>,
    #[serde(default)]
    pub maps: BTreeMap<String, ButtonMap>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonMap {
    #[serde(default)]
    pub vendor: String,
    #[serde(rename = "modelids", default)]
    pub model_ids: Vec<String>,
    /// Optional display names, one single-entry `{BUTTON: name}` object per button
    #[serde(default)]
    pub buttons: Option<Vec<HashMap<String, String>>>,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub map: Vec<Vec<Value>>,
}

fn press_for_action(action: &str) -> Option<PressType> {
    match action {
        "S_BUTTON_ACTION_SHORT_RELEASED" => Some(PressType::Single),
        "S_BUTTON_ACTION_DOUBLE_PRESS" => Some(PressType::Double),
        "S_BUTTON_ACTION_LONG_RELEASED" => Some(PressType::Long),
        _ => None,
    }
}

/// File stem for a descriptor: `vendor_model`, lowercased, runs of anything
/// but `[a-z0-9]` replaced by one underscore.
pub fn file_stem(vendor: &str, model: &str) -> String {
    let raw = format!("{}_{}", vendor, model).to_lowercase();
    let mut stem = String::with_capacity(raw.len());
    let mut in_run = false;

    for c in raw.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            stem.push(c);
            in_run = false;
        } else if !in_run {
            stem.push('_');
            in_run = true;
        }
    }
    stem
}

impl ButtonMap {
    fn button_name(&self, button_id: &str, position: usize) -> String {
        self.buttons
            .iter()
            .flatten()
            .filter_map(|entry| entry.get(button_id))
            .last()
            .cloned()
            .unwrap_or_else(|| format!("Button {}", position))
    }

    /// Convert to a descriptor. `None` if no row yields a usable press.
    pub fn to_configuration(
        &self,
        button_codes: &HashMap<String, i64>,
        action_codes: &HashMap<String, i64>,
    ) -> Option<PressConfiguration> {
        // Buttons in order of first appearance
        let mut order: Vec<String> = Vec::new();
        let mut buttons: HashMap<String, ButtonConfiguration> = HashMap::new();

        for row in &self.map {
            let (Some(button_id), Some(action_id)) = (
                row.get(BUTTON_COLUMN).and_then(Value::as_str),
                row.get(ACTION_COLUMN).and_then(Value::as_str),
            ) else {
                continue;
            };
            let (Some(button_code), Some(action_code)) =
                (button_codes.get(button_id), action_codes.get(action_id))
            else {
                continue;
            };

            let code = button_code + action_code;
            if code < EVENT_CODE_THRESHOLD {
                continue;
            }

            if !buttons.contains_key(button_id) {
                let name = self.button_name(button_id, order.len() + 1);
                order.push(button_id.to_string());
                buttons.insert(
                    button_id.to_string(),
                    ButtonConfiguration {
                        name,
                        event_map: BTreeMap::new(),
                    },
                );
            }

            if let Some(press) = press_for_action(action_id)
                && let Some(button) = buttons.get_mut(button_id)
            {
                button.event_map.insert(code.to_string(), press);
            }
        }

        let buttons: Vec<ButtonConfiguration> = order
            .iter()
            .filter_map(|id| buttons.remove(id))
            .filter(|button| !button.event_map.is_empty())
            .collect();

        if buttons.is_empty() {
            return None;
        }

        Some(PressConfiguration {
            schema_version: SCHEMA_VERSION.to_string(),
            manufacturer: self.vendor.clone(),
            models: self.model_ids.clone(),
            description: self.doc.clone(),
            buttons,
        })
    }
}

impl ButtonMapFile {
    /// All descriptors with at least one button, keyed by file stem.
    pub fn generate(&self) -> BTreeMap<String, PressConfiguration> {
        let mut out = BTreeMap::new();

        for (family, map) in &self.maps {
            let Some(model) = map.model_ids.first() else {
                warn!("[Presses] Button map {} lists no models, skipping", family);
                continue;
            };
            if let Some(configuration) = map.to_configuration(&self.buttons, &self.actions) {
                out.insert(file_stem(&map.vendor, model), configuration);
            }
        }
        out
    }
}

/// Write every generated descriptor as `<stem>.json` into `dir`.
pub fn write_all(configurations: &BTreeMap<String, PressConfiguration>, dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir)?;
    for (stem, configuration) in configurations {
        configuration.save_to_file(&dir.join(format!("{}.json", stem)))?;
    }
    info!(
        "[Presses] Wrote {} device configurations to {}",
        configurations.len(),
        dir.display()
    );
    Ok(configurations.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ButtonMapFile {
        serde_json::from_value(json!({
            "buttons": {"S_BUTTON_1": 1000, "S_BUTTON_2": 2000},
            "buttonActions": {
                "S_BUTTON_ACTION_INITIAL_PRESS": 0,
                "S_BUTTON_ACTION_SHORT_RELEASED": 2,
                "S_BUTTON_ACTION_LONG_RELEASED": 3,
                "S_BUTTON_ACTION_DOUBLE_PRESS": 4
            },
            "maps": {
                "ikeaRemoteMap": {
                    "vendor": "IKEA of Sweden",
                    "doc": "TRADFRI on/off switch",
                    "modelids": ["TRADFRI on/off switch"],
                    "buttons": [{"S_BUTTON_1": "On"}, {"S_BUTTON_2": "Off"}],
                    "map": [
                        [1, "0x01", "ONOFF", "ON", "0", "S_BUTTON_1", "S_BUTTON_ACTION_SHORT_RELEASED", "On"],
                        [1, "0x01", "LEVEL_CONTROL", "MOVE", "0", "S_BUTTON_1", "S_BUTTON_ACTION_LONG_RELEASED", "Dim up"],
                        [1, "0x01", "ONOFF", "OFF", "0", "S_BUTTON_2", "S_BUTTON_ACTION_SHORT_RELEASED", "Off"]
                    ]
                },
                "plainMap": {
                    "vendor": "Acme",
                    "modelids": ["BTN-2"],
                    "map": [
                        [1, "0x01", "ONOFF", "ON", "0", "S_BUTTON_2", "S_BUTTON_ACTION_INITIAL_PRESS", "Hold start"],
                        [1, "0x01", "ONOFF", "ON", "0", "S_BUTTON_2", "S_BUTTON_ACTION_DOUBLE_PRESS", "Double"],
                        [1, "0x01", "ONOFF", "ON", "0", "S_BUTTON_3", "S_BUTTON_ACTION_DOUBLE_PRESS", "Unknown button"],
                        [1, "0x01"]
                    ]
                },
                "noPresses": {
                    "vendor": "Acme",
                    "modelids": ["ROTARY"],
                    "map": [
                        [1, "0x01", "ONOFF", "ON", "0", "S_BUTTON_1", "S_BUTTON_ACTION_INITIAL_PRESS", "Start"]
                    ]
                },
                "noModels": {
                    "vendor": "Acme",
                    "map": []
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(
            file_stem("IKEA of Sweden", "TRADFRI on/off switch"),
            "ikea_of_sweden_tradfri_on_off_switch"
        );
        assert_eq!(file_stem("Philips", "RWL021"), "philips_rwl021");
        assert_eq!(file_stem("_TZ3000_", "TS004F"), "_tz3000_ts004f");
    }

    #[test]
    fn test_generate_named_buttons() {
        let generated = sample().generate();
        let config = &generated["ikea_of_sweden_tradfri_on_off_switch"];

        assert_eq!(config.schema_version, "1.0");
        assert_eq!(config.manufacturer, "IKEA of Sweden");
        assert_eq!(config.buttons.len(), 2);
        assert_eq!(config.buttons[0].name, "On");
        assert_eq!(config.buttons[0].press_for(1002), Some(PressType::Single));
        assert_eq!(config.buttons[0].press_for(1003), Some(PressType::Long));
        assert_eq!(config.buttons[1].name, "Off");
        assert_eq!(config.buttons[1].press_for(2002), Some(PressType::Single));
    }

    #[test]
    fn test_generate_default_names_and_skips() {
        let generated = sample().generate();

        let config = &generated["acme_btn_2"];
        assert_eq!(config.buttons.len(), 1);
        assert_eq!(config.buttons[0].name, "Button 1");
        assert_eq!(config.buttons[0].press_for(2004), Some(PressType::Double));

        // Only non-press actions, and no model ids
        assert!(!generated.contains_key("acme_rotary"));
        assert_eq!(generated.len(), 2);
    }

    #[test]
    fn test_write_all() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("devices");
        let written = write_all(&sample().generate(), &out).unwrap();
        assert_eq!(written, 2);
        assert!(out.join("acme_btn_2.json").exists());
    }
}
