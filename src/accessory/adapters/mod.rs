//! Service adapters: one per supported subdevice capability.
//!
//! An adapter owns the exposed characteristics of one subdevice, applies
//! inbound gateway state/config payloads to them and, for lights and outlets,
//! turns accessory commands into gateway writes.

mod battery;
pub mod binary_sensor;
pub mod contact_sensor;
pub mod leak_sensor;
pub mod light;
pub mod motion_sensor;
pub mod switch;

pub use binary_sensor::BinarySensor;
pub use light::{Light, LightFeatures};
pub use switch::ProgrammableSwitch;

use super::endpoint::Endpoint;
use super::press_config::PressConfigStore;
use crate::error::{BridgeError, Result};
use crate::gateway::{GatewayClient, ValueMap};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Write requested by the accessory engine (a user action in the controller app).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessoryCommand {
    SetOn(bool),
    /// Percent 0-100
    SetBrightness(u8),
    /// Mireds
    SetColorTemperature(u16),
    /// Degrees 0-360
    SetHue(f64),
    /// Percent 0-100
    SetSaturation(u8),
}

/// Bridge between one subdevice and its exposed endpoints.
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Short service name for logs and errors.
    fn service(&self) -> &'static str;

    /// Gateway unique id of the subdevice.
    fn subdevice_id(&self) -> &str;

    /// Apply an inbound state payload. Absent keys leave values untouched.
    fn apply_state(&self, state: &ValueMap);

    /// Apply an inbound config payload. Absent keys leave values untouched.
    fn apply_config(&self, config: &ValueMap);

    fn endpoints(&self) -> Vec<Endpoint>;

    /// Handle a write from the accessory engine.
    async fn handle_command(&self, command: AccessoryCommand) -> Result<()> {
        Err(BridgeError::UnsupportedCommand {
            service: self.service(),
            command: format!("{:?}", command),
        })
    }
}

/// Shared collaborators handed to adapter constructors.
#[derive(Clone)]
pub struct AdapterContext {
    pub client: Arc<dyn GatewayClient>,
    pub presses: Arc<PressConfigStore>,
}

impl AdapterContext {
    pub fn new(client: Arc<dyn GatewayClient>, presses: Arc<PressConfigStore>) -> Self {
        Self { client, presses }
    }
}

/// Suppresses gateway echoes of a locally issued command.
///
/// After a command the gateway reports intermediate states (transitions,
/// the old value) for a short while. Inbound state is ignored until the
/// window after the latest local command has elapsed.
pub struct FeedbackGuard {
    last_local_change: Mutex<Option<Instant>>,
    window: Duration,
}

impl FeedbackGuard {
    pub const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::with_window(Self::WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            last_local_change: Mutex::new(None),
            window,
        }
    }

    /// Mark a local command as issued now.
    pub fn record(&self) {
        *self.last_local_change.lock() = Some(Instant::now());
    }

    /// Forget the last local command, e.g. after the gateway rejected it.
    pub fn clear(&self) {
        *self.last_local_change.lock() = None;
    }

    /// Admit an inbound update.
    ///
    /// Returns `None` inside the suppression window. Otherwise the returned
    /// guard must be held while the update is applied, so that a concurrent
    /// command cannot interleave with it.
    pub fn admit(&self) -> Option<MutexGuard<'_, Option<Instant>>> {
        let guard = self.last_local_change.lock();
        let suppressed = guard.is_some_and(|at| at.elapsed() < self.window);
        if suppressed { None } else { Some(guard) }
    }
}

impl Default for FeedbackGuard {
    fn default() -> Self {
        Self::new()
    }
}
