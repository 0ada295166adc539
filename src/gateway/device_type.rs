//! Subdevice capability tags reported by the deCONZ REST API.
//!
//! Reference: the `devices/generic/constants.json` table of the deCONZ REST plugin.
//! Tags are parsed with [`std::str::FromStr`]; anything not listed here is an
//! unknown capability and is skipped by the device adapter.

use strum::{AsRefStr, Display, EnumIter, EnumString};

/// ZHA (Zigbee Home Automation) device type tag of a subdevice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
pub enum DeviceType {
    #[strum(serialize = "ZHAAirPurifier")]
    AirPurifier,
    #[strum(serialize = "ZHAAirQuality")]
    AirQuality,
    #[strum(serialize = "ZHAAlarm")]
    Alarm,
    #[strum(serialize = "ZHAAncillaryControl")]
    AncillaryControl,
    #[strum(serialize = "ZHABattery")]
    Battery,
    #[strum(serialize = "ZHACarbonDioxide")]
    CarbonDioxide,
    #[strum(serialize = "ZHACarbonMonoxide")]
    CarbonMonoxide,
    /// RGB light without white channel
    #[strum(serialize = "Color light")]
    ColorLight,
    /// Tunable white light
    #[strum(serialize = "Color temperature light")]
    ColorTemperatureLight,
    #[strum(serialize = "ZHAConsumption")]
    Consumption,
    #[strum(serialize = "Dimmable light")]
    DimmableLight,
    #[strum(serialize = "Dimmable plug-in unit")]
    DimmablePlugInUnit,
    #[strum(serialize = "Dimmer switch")]
    DimmerSwitch,
    #[strum(serialize = "ZHADoorLock")]
    DoorLock,
    #[strum(serialize = "Door lock controller")]
    DoorLockController,
    #[strum(serialize = "Door Lock")]
    DoorLockSensor,
    /// RGB light with tunable white channel
    #[strum(serialize = "Extended color light")]
    ExtendedColorLight,
    #[strum(serialize = "ZHAFire")]
    FireSensor,
    #[strum(serialize = "ZHAHumidity")]
    HumiditySensor,
    #[strum(serialize = "Level control switch")]
    LevelControlSwitch,
    #[strum(serialize = "ZHALightLevel")]
    LightLevelSensor,
    #[strum(serialize = "ZHAMoisture")]
    MoistureSensor,
    #[strum(serialize = "On/Off light")]
    OnOffLight,
    #[strum(serialize = "On/Off light switch")]
    OnOffLightSwitch,
    #[strum(serialize = "On/Off output")]
    OnOffOutput,
    #[strum(serialize = "On/Off plug-in unit")]
    OnOffPlugInUnit,
    #[strum(serialize = "On/Off switch")]
    OnOffSwitch,
    /// Door/window contact
    #[strum(serialize = "ZHAOpenClose")]
    OpenCloseSensor,
    #[strum(serialize = "ZHAParticulateMatter")]
    ParticulateMatter,
    /// Motion / presence detector
    #[strum(serialize = "ZHAPresence")]
    PresenceSensor,
    #[strum(serialize = "ZHAPressure")]
    Pressure,
    #[strum(serialize = "Range extender")]
    RangeExtender,
    #[strum(serialize = "ZHARelativeRotary")]
    RelativeRotary,
    #[strum(serialize = "Smart plug")]
    SmartPlug,
    #[strum(serialize = "ZHASpectral")]
    Spectral,
    /// Remote or wall switch reporting `buttonevent` codes
    #[strum(serialize = "ZHASwitch")]
    Switch,
    #[strum(serialize = "ZHATemperature")]
    Temperature,
    #[strum(serialize = "ZHAThermostat")]
    Thermostat,
    #[strum(serialize = "ZHATime")]
    Time,
    #[strum(serialize = "ZHAVibration")]
    Vibration,
    #[strum(serialize = "Warning device")]
    WarningDevice,
    /// Water leak detector
    #[strum(serialize = "ZHAWater")]
    Water,
    #[strum(serialize = "Window covering device")]
    WindowCovering,
}
