#[allow(unused_imports)]
use log::debug;

use crate::device::Device;
use crate::error::Result;
use crate::i2cio::I2cBus;

/// Fine temperature produced by temperature compensation.
///
/// Pressure compensation needs the value from the same measurement cycle,
/// so it can only be obtained by compensating a temperature first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemperatureFine(f64);

impl TemperatureFine {
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Factory trimming coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bmp280Calibration {
    // -- temperature
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    // -- pressure
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl Bmp280Calibration {
    /// Reads the calibration block in one go.
    pub fn load<B: I2cBus>(device: &mut Device<B>) -> Result<Bmp280Calibration> {
        let block = device.get("CALIBRATION")?;
        let unsigned = |name: &str| -> Result<u16> { Ok(block.unsigned(name)? as u16) };
        let signed = |name: &str| -> Result<i16> { Ok(block.signed(name)? as i16) };
        let calib_data = Bmp280Calibration {
            dig_t1: unsigned("dig_t1")?,
            dig_t2: signed("dig_t2")?,
            dig_t3: signed("dig_t3")?,
            dig_p1: unsigned("dig_p1")?,
            dig_p2: signed("dig_p2")?,
            dig_p3: signed("dig_p3")?,
            dig_p4: signed("dig_p4")?,
            dig_p5: signed("dig_p5")?,
            dig_p6: signed("dig_p6")?,
            dig_p7: signed("dig_p7")?,
            dig_p8: signed("dig_p8")?,
            dig_p9: signed("dig_p9")?,
        };
        debug!("Got calibration data: {calib_data:#?}");
        Ok(calib_data)
    }

    /// Returns the temperature in °C and the fine temperature for the pressure step.
    pub fn compensate_temperature(&self, raw_temperature: u32) -> (f64, TemperatureFine) {
        let raw = raw_temperature as f64;
        let var1 = (raw / 16384.0 - (self.dig_t1 as f64) / 1024.0) * (self.dig_t2 as f64);
        let var2 = raw / 131072.0 - (self.dig_t1 as f64) / 8192.0;
        let var2 = var2 * var2 * (self.dig_t3 as f64);
        let t_fine = var1 + var2;
        (t_fine / 5120.0, TemperatureFine(t_fine))
    }

    /// Returns the pressure in Pa, or 0 if the coefficients would divide by zero.
    pub fn compensate_pressure(&self, raw_pressure: u32, t_fine: TemperatureFine) -> f64 {
        let var1 = t_fine.value() / 2.0 - 64000.0;
        let var2 = var1 * var1 * (self.dig_p6 as f64) / 32768.0;
        let var2 = var2 + var1 * (self.dig_p5 as f64) * 2.0;
        let var2 = var2 / 4.0 + (self.dig_p4 as f64) * 65536.0;
        let var1 = ((self.dig_p3 as f64) * var1 * var1 / 524288.0 + (self.dig_p2 as f64) * var1) / 524288.0;
        let var1 = (1.0 + var1 / 32768.0) * (self.dig_p1 as f64);
        if var1 == 0.0 {
            return 0.0;
        }
        let pressure = 1048576.0 - raw_pressure as f64;
        let pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
        let var1 = (self.dig_p9 as f64) * pressure * pressure / 2147483648.0;
        let var2 = pressure * (self.dig_p8 as f64) / 32768.0;
        pressure + (var1 + var2 + (self.dig_p7 as f64)) / 16.0
    }
}

/// Barometric altitude in m for a pressure in hPa and a temperature in °C.
pub fn altitude(qnh: f64, pressure: f64, temperature: f64) -> f64 {
    ((qnh / pressure).powf(1.0 / 5.257) - 1.0) * (temperature + 273.15) / 0.0065
}
