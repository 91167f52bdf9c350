use std::fmt;
use std::time::Duration;

use crate::register::Symbol;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bmp280DeviceAddress {
    /// SDO tied to GND
    Primary,
    /// SDO tied to VDDIO
    Secondary,
}

impl Default for Bmp280DeviceAddress {
    fn default() -> Self {
        Self::Primary
    }
}

impl Bmp280DeviceAddress {
    pub const ADDR_PRIMARY: u16 = 0x76;
    pub const ADDR_SECONDARY: u16 = 0x77;

    pub fn value(&self) -> u16 {
        match *self {
            Self::Primary => Self::ADDR_PRIMARY,
            Self::Secondary => Self::ADDR_SECONDARY,
        }
    }
}

impl fmt::Display for Bmp280DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Primary => write!(f, "Primary/{:#04x}", self.value()),
            Self::Secondary => write!(f, "Secondary/{:#04x}", self.value()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bmp280ChipVariant {
    Bmp280,
    Bme280,
}

impl Bmp280ChipVariant {
    const CHIP_ID_BMP280: u8 = 0x58;
    const CHIP_ID_BME280: u8 = 0x60;

    pub fn from_chip_id(chip_id: u8) -> Option<Self> {
        match chip_id {
            Self::CHIP_ID_BMP280 => Some(Self::Bmp280),
            Self::CHIP_ID_BME280 => Some(Self::Bme280),
            _ => None,
        }
    }

    pub fn chip_id(&self) -> u8 {
        match *self {
            Self::Bmp280 => Self::CHIP_ID_BMP280,
            Self::Bme280 => Self::CHIP_ID_BME280,
        }
    }
}

impl fmt::Display for Bmp280ChipVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Bmp280 => write!(f, "BMP280/{:#04x}", self.chip_id()),
            Self::Bme280 => write!(f, "BME280/{:#04x}", self.chip_id()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bmp280PowerMode {
    Sleep,
    /// One conversion per read, the chip falls back to sleep afterwards.
    Forced,
    Normal,
}

impl Bmp280PowerMode {
    pub fn symbol(&self) -> Symbol {
        match *self {
            Self::Sleep => Symbol::Name("sleep"),
            Self::Forced => Symbol::Name("forced"),
            Self::Normal => Symbol::Name("normal"),
        }
    }
}

impl fmt::Display for Bmp280PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Sleep => write!(f, "Sleep"),
            Self::Forced => write!(f, "Forced"),
            Self::Normal => write!(f, "Normal"),
        }
    }
}

/// Measurement configuration applied by `setup`.
///
/// Oversampling factors are one of 1, 2, 4, 8, 16; the standby time is one
/// of 0.5, 62.5, 125, 250, 500, 1000, 2000, 4000 ms. Anything else is
/// rejected when the configuration is written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bmp280Settings {
    pub mode: Bmp280PowerMode,
    pub temperature_oversampling: u32,
    pub pressure_oversampling: u32,
    pub standby_ms: f64,
    pub iir_filter: u64,
}

impl Default for Bmp280Settings {
    fn default() -> Self {
        Bmp280Settings {
            mode: Bmp280PowerMode::Normal,
            temperature_oversampling: 16,
            pressure_oversampling: 16,
            standby_ms: 500.0,
            iir_filter: 2,
        }
    }
}

/// Cadence and bound of the wait for a forced conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval: Duration::from_millis(1),
            max_attempts: 1000,
        }
    }
}

/// Controller state. `Idle` and `Converting` are the two configured states:
/// a successful `setup` moves to `Idle`, a forced conversion runs in
/// `Converting` and returns to `Idle`, a soft reset goes back to `Uninitialized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bmp280State {
    Uninitialized,
    Idle,
    Converting,
}

impl Bmp280State {
    pub fn is_configured(&self) -> bool {
        *self != Self::Uninitialized
    }
}

impl fmt::Display for Bmp280State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Idle => write!(f, "Idle"),
            Self::Converting => write!(f, "Converting"),
        }
    }
}
