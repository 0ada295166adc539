//! Accessory side of the bridge.
//!
//! Gateway devices become accessories ([`device::AccessoryRecord`]) made of
//! service adapters, one per supported subdevice. The [`registry::Registry`]
//! owns them all and routes live gateway events to the right adapter.

pub mod adapters;
pub mod characteristic;
pub mod convert;
pub mod device;
pub mod endpoint;
pub mod identifier;
pub mod press_config;
pub mod press_generator;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use adapters::{AccessoryCommand, AdapterContext, ServiceAdapter};
pub use device::{AccessoryInfo, AccessoryRecord};
pub use press_config::PressConfigStore;
pub use registry::Registry;
