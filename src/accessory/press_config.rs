//! Per-model button descriptors.
//!
//! Remotes report presses as numeric `buttonevent` codes such as `1002` or
//! `4003`: everything but the last three digits identifies the button, the
//! last three the action. Which codes mean single, double or long press is
//! model specific and described by JSON files in the devices directory:
//!
//! ```json
//! {
//!   "schemaVersion": "1.0",
//!   "manufacturer": "IKEA of Sweden",
//!   "models": ["TRADFRI on/off switch"],
//!   "description": "On/off switch",
//!   "buttons": [
//!     { "name": "On", "eventMap": { "1002": "SINGLE_PRESS", "1003": "LONG_PRESS" } }
//!   ]
//! }
//! ```

use crate::error::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Codes below this value carry no button/action split and are ignored.
pub const EVENT_CODE_THRESHOLD: i64 = 1000;

/// Press type a raw event code maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PressType {
    #[serde(rename = "SINGLE_PRESS")]
    Single,
    #[serde(rename = "DOUBLE_PRESS")]
    Double,
    #[serde(rename = "LONG_PRESS")]
    Long,
}

impl PressType {
    /// Value of the programmable switch event for this press.
    pub fn switch_event_value(self) -> i32 {
        match self {
            PressType::Single => 0,
            PressType::Double => 1,
            PressType::Long => 2,
        }
    }
}

/// Split a raw event code into button prefix and 3-digit action suffix.
///
/// Returns `None` for codes below [`EVENT_CODE_THRESHOLD`].
pub fn split_event_code(code: i64) -> Option<(String, String)> {
    if code < EVENT_CODE_THRESHOLD {
        return None;
    }
    let text = code.to_string();
    let (prefix, suffix) = text.split_at(text.len() - 3);
    Some((prefix.to_string(), suffix.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfiguration {
    pub name: String,
    /// Raw event code (decimal string) to press type
    #[serde(rename = "eventMap", default)]
    pub event_map: BTreeMap<String, PressType>,
}

impl ButtonConfiguration {
    /// Button prefixes of the valid codes in the event map.
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .event_map
            .keys()
            .filter_map(|code| code.parse::<i64>().ok())
            .filter_map(split_event_code)
            .map(|(prefix, _)| prefix)
            .collect();
        prefixes.sort();
        prefixes.dedup();
        prefixes
    }

    /// Distinct press types this button produces, sorted.
    pub fn press_types(&self) -> Vec<PressType> {
        let mut types: Vec<PressType> = self.event_map.values().copied().collect();
        types.sort();
        types.dedup();
        types
    }

    pub fn press_for(&self, code: i64) -> Option<PressType> {
        self.event_map.get(&code.to_string()).copied()
    }
}

/// Descriptor for one or more remote models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressConfiguration {
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub buttons: Vec<ButtonConfiguration>,
}

impl PressConfiguration {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Descriptors indexed by model id.
#[derive(Debug, Default)]
pub struct PressConfigStore {
    by_model: HashMap<String, Arc<PressConfiguration>>,
}

impl PressConfigStore {
    /// Index `configurations`; a later entry for the same model replaces an earlier one.
    pub fn from_configurations(configurations: impl IntoIterator<Item = PressConfiguration>) -> Self {
        let mut by_model = HashMap::new();
        for configuration in configurations {
            let configuration = Arc::new(configuration);
            for model in &configuration.models {
                by_model.insert(model.clone(), configuration.clone());
            }
        }
        Self { by_model }
    }

    /// Load every `*.json` file in `dir`, in file name order.
    ///
    /// Unreadable or malformed files are logged and skipped. A missing
    /// directory yields an empty store.
    pub fn load_from_dir(dir: &Path) -> Self {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "[Presses] Cannot read devices directory {}: {}",
                    dir.display(),
                    e
                );
                return Self::default();
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut configurations = Vec::with_capacity(paths.len());
        for path in paths {
            let parsed = fs::read(&path)
                .map_err(crate::error::BridgeError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<PressConfiguration>(&bytes)?));
            match parsed {
                Ok(configuration) => {
                    debug!(
                        "[Presses] Loaded {} ({} models)",
                        path.display(),
                        configuration.models.len()
                    );
                    configurations.push(configuration);
                }
                Err(e) => warn!(
                    "[Presses] Skipping device configuration {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        let store = Self::from_configurations(configurations);
        info!(
            "[Presses] {} remote models known from {}",
            store.len(),
            dir.display()
        );
        store
    }

    pub fn get(&self, model: &str) -> Option<Arc<PressConfiguration>> {
        self.by_model.get(model).cloned()
    }

    /// Number of distinct models.
    pub fn len(&self) -> usize {
        self.by_model.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty()
    }
}
