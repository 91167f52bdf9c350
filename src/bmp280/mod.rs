mod bmp280_calibration;
mod bmp280_core;
mod bmp280_enums;
mod bmp280_registers;

pub use bmp280_calibration::{altitude, Bmp280Calibration, TemperatureFine};
pub use bmp280_core::{Bmp280Reading, BMP280};
pub use bmp280_enums::*;
pub use bmp280_registers::{BMP280_ADDRESSES, BMP280_REGISTERS};
