//! Service endpoints exposed by an accessory.
//!
//! An accessory is a parent with one or more child endpoints. Each endpoint has
//! a label (displayed in the controller app), a kind (determines the service
//! type) and the characteristics it exposes.

use super::characteristic::{ChangeNotifier, Characteristic, CharacteristicKind, Observable};
use std::sync::Arc;

/// Type of service an endpoint represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Light with on/off and optional brightness, color temperature and color
    Lightbulb,
    /// Switchable power outlet - on/off only
    Outlet,
    /// Door/window contact
    ContactSensor,
    /// Water leak detector
    LeakSensor,
    /// Motion / presence detector
    MotionSensor,
    /// One button of a remote, reporting press events
    StatelessProgrammableSwitch,
}

/// One child endpoint and the values it exposes.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Label displayed in the controller app
    pub label: String,
    pub kind: EndpointKind,
    pub characteristics: Vec<Arc<Characteristic>>,
}

impl Endpoint {
    pub fn new(label: impl Into<String>, kind: EndpointKind) -> Self {
        Self {
            label: label.into(),
            kind,
            characteristics: Vec::new(),
        }
    }

    pub fn with(mut self, characteristic: &Arc<Characteristic>) -> Self {
        self.characteristics.push(characteristic.clone());
        self
    }

    /// Add `characteristic` only if the device reports it.
    pub fn with_optional(self, characteristic: Option<&Arc<Characteristic>>) -> Self {
        match characteristic {
            Some(c) => self.with(c),
            None => self,
        }
    }

    pub fn characteristic(&self, kind: CharacteristicKind) -> Option<&Arc<Characteristic>> {
        self.characteristics.iter().find(|c| c.kind() == kind)
    }

    /// Attach `notifier` to every characteristic of this endpoint.
    pub fn set_notifier(&self, notifier: &ChangeNotifier) {
        for characteristic in &self.characteristics {
            characteristic.set_notifier(notifier.clone());
        }
    }
}
