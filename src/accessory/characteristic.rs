//! Exposed accessory values.
//!
//! A [`Characteristic`] is the thread-safe shared value the accessory engine
//! reads and subscribes to. Adapters update it from gateway payloads; every
//! change bumps a version counter and wakes the engine through an optional
//! [`ChangeNotifier`].

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use tokio::sync::Notify;

/// What an exposed value means to the accessory engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicKind {
    /// Power state (0/1)
    On,
    /// Brightness in percent
    Brightness,
    /// Color temperature in mireds
    ColorTemperature,
    /// Hue in degrees
    Hue,
    /// Saturation in percent
    Saturation,
    /// 0 = contact detected (closed), 1 = not detected (open)
    ContactSensorState,
    /// 0/1
    LeakDetected,
    /// 0/1
    MotionDetected,
    /// Battery charge in percent
    BatteryLevel,
    /// 0 = normal, 1 = low
    StatusLowBattery,
    /// Stateless press event: 0 single, 1 double, 2 long
    ProgrammableSwitchEvent,
    /// Position of a button within its device
    ServiceLabelIndex,
}

/// Wakes the accessory engine when a value of one accessory changed.
#[derive(Clone)]
pub struct ChangeNotifier {
    signal: Arc<Notify>,
    accessory_id: u64,
}

impl ChangeNotifier {
    pub fn new(signal: Arc<Notify>, accessory_id: u64) -> Self {
        Self {
            signal,
            accessory_id,
        }
    }

    pub fn accessory_id(&self) -> u64 {
        self.accessory_id
    }

    /// Non-blocking. A pending wake-up is kept if nobody is waiting yet.
    pub fn notify(&self) {
        self.signal.notify_one();
    }
}

/// Something the engine can poll for changes.
pub trait Observable: Send + Sync {
    /// Incremented on every change.
    fn version(&self) -> u32;

    fn set_notifier(&self, notifier: ChangeNotifier);
}

/// Thread-safe integer value exposed to the accessory engine.
pub struct Characteristic {
    kind: CharacteristicKind,
    value: AtomicI32,
    min: i32,
    max: i32,
    valid_values: Vec<i32>,
    version: AtomicU32,
    notifier: RwLock<Option<ChangeNotifier>>,
}

impl Characteristic {
    pub fn new(kind: CharacteristicKind, initial: i32) -> Self {
        Self {
            kind,
            value: AtomicI32::new(initial),
            min: i32::MIN,
            max: i32::MAX,
            valid_values: Vec::new(),
            version: AtomicU32::new(0),
            notifier: RwLock::new(None),
        }
    }

    /// Restrict the value to `min..=max`. The current value is clamped too.
    pub fn with_bounds(mut self, min: i32, max: i32) -> Self {
        self.min = min;
        self.max = max;
        let clamped = self.value.load(Ordering::SeqCst).clamp(min, max);
        self.value.store(clamped, Ordering::SeqCst);
        self
    }

    /// Restrict the value to an explicit set, kept sorted.
    pub fn with_valid_values(mut self, mut values: Vec<i32>) -> Self {
        values.sort_unstable();
        values.dedup();
        self.valid_values = values;
        self
    }

    pub fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    pub fn get(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn get_bool(&self) -> bool {
        self.get() != 0
    }

    pub fn bounds(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    pub fn valid_values(&self) -> &[i32] {
        &self.valid_values
    }

    fn accepts(&self, value: i32) -> bool {
        self.valid_values.is_empty() || self.valid_values.contains(&value)
    }

    /// Store `value` (clamped to the bounds). Returns whether it changed.
    ///
    /// Values outside the valid set are ignored.
    pub fn set(&self, value: i32) -> bool {
        let value = value.clamp(self.min, self.max);
        if !self.accepts(value) {
            return false;
        }

        let old = self.value.swap(value, Ordering::SeqCst);
        if old != value {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn set_bool(&self, value: bool) -> bool {
        self.set(i32::from(value))
    }

    /// Store `value` and notify even if it did not change.
    ///
    /// For stateless events such as button presses, where a repeat of the
    /// same value is a new occurrence.
    pub fn emit(&self, value: i32) -> bool {
        if !self.accepts(value) {
            return false;
        }
        self.value.store(value, Ordering::SeqCst);
        self.bump();
        true
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        if let Some(notifier) = self.notifier.read().as_ref() {
            notifier.notify();
        }
    }
}

impl Observable for Characteristic {
    fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    fn set_notifier(&self, notifier: ChangeNotifier) {
        *self.notifier.write() = Some(notifier);
    }
}

impl std::fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Characteristic")
            .field("kind", &self.kind)
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let on = Characteristic::new(CharacteristicKind::On, 1);
        assert!(on.get_bool());
        assert_eq!(on.version(), 0);
    }

    #[test]
    fn test_set_increments_version_only_on_change() {
        let on = Characteristic::new(CharacteristicKind::On, 0);

        assert!(on.set_bool(true));
        assert_eq!(on.version(), 1);

        // Setting same value doesn't increment
        assert!(!on.set_bool(true));
        assert_eq!(on.version(), 1);

        assert!(on.set_bool(false));
        assert_eq!(on.version(), 2);
    }

    #[test]
    fn test_bounds_clamp() {
        let ct = Characteristic::new(CharacteristicKind::ColorTemperature, 100).with_bounds(153, 500);
        assert_eq!(ct.get(), 153);
        assert_eq!(ct.bounds(), (153, 500));

        ct.set(600);
        assert_eq!(ct.get(), 500);
        ct.set(370);
        assert_eq!(ct.get(), 370);
    }

    #[test]
    fn test_emit_always_increments_version() {
        let event = Characteristic::new(CharacteristicKind::ProgrammableSwitchEvent, 0)
            .with_valid_values(vec![2, 0, 0]);
        assert_eq!(event.valid_values(), &[0, 2]);

        assert!(event.emit(0));
        assert!(event.emit(0));
        assert_eq!(event.version(), 2);

        // Not a configured press type
        assert!(!event.emit(1));
        assert_eq!(event.version(), 2);
        assert!(!event.set(1));
    }

    #[tokio::test]
    async fn test_notifier_wakes_engine() {
        let signal = Arc::new(Notify::new());
        let brightness = Characteristic::new(CharacteristicKind::Brightness, 0).with_bounds(0, 100);
        let notifier = ChangeNotifier::new(signal.clone(), 42);
        assert_eq!(notifier.accessory_id(), 42);
        brightness.set_notifier(notifier);

        brightness.set(50);
        // The permit is stored, so this returns immediately
        tokio::time::timeout(std::time::Duration::from_secs(1), signal.notified())
            .await
            .unwrap();
    }
}
