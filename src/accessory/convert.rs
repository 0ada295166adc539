//! Value conversions between gateway units and accessory units.
//!
//! | Quantity    | Gateway          | Accessory        |
//! |-------------|------------------|------------------|
//! | Brightness  | 0-255            | 0-100 %          |
//! | Saturation  | 0-255            | 0-100 %          |
//! | Hue         | 0-65535          | 0-360 degrees    |
//! | Color temp  | mireds           | mireds           |

const RAW_MAX: f64 = 255.0;
const RAW_HUE_MAX: f64 = 65535.0;

/// Gateway 0-255 level to a rounded percentage.
pub fn raw_to_percent(raw: u8) -> u8 {
    (f64::from(raw) * 100.0 / RAW_MAX).round() as u8
}

/// Percentage (clamped to 100) to the gateway 0-255 level.
pub fn percent_to_raw(percent: u8) -> u8 {
    (f64::from(percent.min(100)) * RAW_MAX / 100.0).round() as u8
}

/// Clamp an untrusted payload number into the 0-255 level range.
pub fn clamp_raw(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

pub fn raw_hue_to_degrees(raw: u16) -> f64 {
    f64::from(raw) * 360.0 / RAW_HUE_MAX
}

/// Degrees (clamped to 0..=360) to the gateway hue range.
pub fn degrees_to_raw_hue(degrees: f64) -> u16 {
    if degrees.is_nan() {
        return 0;
    }
    (degrees.clamp(0.0, 360.0) * RAW_HUE_MAX / 360.0).round() as u16
}

/// Approximate color temperature in Kelvin, for log output.
pub fn mired_to_kelvin(mired: u16) -> u32 {
    if mired == 0 {
        return 0;
    }
    (1_000_000.0 / f64::from(mired)).round() as u32
}
