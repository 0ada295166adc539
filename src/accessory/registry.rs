//! Device registry: builds all accessories once and routes gateway events.

use super::adapters::{AdapterContext, ServiceAdapter};
use super::characteristic::ChangeNotifier;
use super::device::AccessoryRecord;
use crate::gateway::DeviceDescriptor;
use crate::gateway::events::{ChangeEvent, EventType, ResourceType};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};

/// All exposed accessories plus a subdevice id lookup table.
///
/// The topology is fixed at build time; devices added to or removed from the
/// gateway later require a rebuild.
pub struct Registry {
    accessories: Vec<AccessoryRecord>,
    adapters: HashMap<String, Arc<dyn ServiceAdapter>>,
}

impl Registry {
    /// Build accessories for every device in `snapshot`.
    ///
    /// Devices that produce no accessory are skipped; building never fails.
    pub async fn build(ctx: &AdapterContext, snapshot: &[DeviceDescriptor]) -> Self {
        let mut accessories: Vec<AccessoryRecord> = Vec::with_capacity(snapshot.len());
        let mut adapters: HashMap<String, Arc<dyn ServiceAdapter>> = HashMap::new();

        for descriptor in snapshot {
            let record = match AccessoryRecord::build(ctx, descriptor).await {
                Ok(record) => record,
                Err(e) => {
                    debug!("[Registry] Skipping {}: {}", descriptor.unique_id, e);
                    continue;
                }
            };

            if let Some(existing) = accessories.iter().find(|a| a.id() == record.id()) {
                warn!(
                    "[Registry] {} has the same accessory id as {}, skipping",
                    record.unique_id(),
                    existing.unique_id()
                );
                continue;
            }

            // A shared subdevice would leave one of the two accessories without updates
            if let Some(claimed) = record
                .adapters()
                .iter()
                .find(|a| adapters.contains_key(a.subdevice_id()))
            {
                warn!(
                    "[Registry] Subdevice {} of {} is already claimed, skipping",
                    claimed.subdevice_id(),
                    record.unique_id()
                );
                continue;
            }

            for adapter in record.adapters() {
                adapters.insert(adapter.subdevice_id().to_string(), adapter.clone());
            }
            accessories.push(record);
        }

        info!(
            "[Registry] {} accessories with {} services from {} devices",
            accessories.len(),
            adapters.len(),
            snapshot.len()
        );

        Self {
            accessories,
            adapters,
        }
    }

    pub fn accessories(&self) -> &[AccessoryRecord] {
        &self.accessories
    }

    pub fn accessory(&self, id: u64) -> Option<&AccessoryRecord> {
        self.accessories.iter().find(|a| a.id() == id)
    }

    pub fn adapter(&self, subdevice_id: &str) -> Option<&Arc<dyn ServiceAdapter>> {
        self.adapters.get(subdevice_id)
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    /// Wake `signal` whenever a value of any accessory changes.
    pub fn attach_notifier(&self, signal: &Arc<Notify>) {
        for accessory in &self.accessories {
            let notifier = ChangeNotifier::new(signal.clone(), accessory.id());
            for endpoint in accessory.endpoints() {
                endpoint.set_notifier(&notifier);
            }
        }
    }

    /// Route one gateway event to its service adapter.
    ///
    /// Only `changed` events for lights and sensors are considered. Events
    /// for unknown subdevices are ignored.
    pub fn dispatch(&self, event: &ChangeEvent) {
        if event.event != EventType::Changed {
            return;
        }
        if !matches!(event.resource, ResourceType::Lights | ResourceType::Sensors) {
            return;
        }
        let Some(adapter) = event
            .unique_id
            .as_deref()
            .and_then(|id| self.adapters.get(id))
        else {
            return;
        };

        if let Some(state) = &event.state {
            adapter.apply_state(state);
        }
        if let Some(config) = &event.config {
            adapter.apply_config(config);
        }
    }

    /// Dispatch events from `rx` in arrival order until the sender is dropped.
    pub async fn run_dispatch(&self, mut rx: mpsc::Receiver<ChangeEvent>) {
        while let Some(event) = rx.recv().await {
            self.dispatch(&event);
        }
        debug!("[Registry] Event channel closed, dispatch stopped");
    }
}
