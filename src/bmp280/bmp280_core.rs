#[allow(unused_imports)]
use log::{debug, info};
use std::thread;

use crate::device::Device;
use crate::error::{Result, SensorError};
use crate::i2cio::I2cBus;
use crate::register::{FieldValue, Symbol};

use super::bmp280_calibration::{altitude, Bmp280Calibration};
use super::bmp280_enums::*;
use super::bmp280_registers::*;

/// Last compensated measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bmp280Reading {
    /// °C
    pub temperature: f64,
    /// hPa
    pub pressure: f64,
}

/// BMP280/BME280 pressure and temperature sensor on one bus address.
///
/// Every getter runs a full measurement cycle; nothing is cached between
/// calls. The first cycle configures the chip with the stored settings if
/// `setup` was not called before.
pub struct BMP280<B> {
    device: Device<B>,
    device_addr: Bmp280DeviceAddress,
    settings: Bmp280Settings,
    poll: PollConfig,
    state: Bmp280State,
    configured: Option<Configured>,
    reading: Bmp280Reading,
}

#[derive(Clone, Copy, Debug)]
struct Configured {
    chip: Bmp280ChipVariant,
    calib_data: Bmp280Calibration,
}

impl<B: I2cBus> BMP280<B> {
    pub fn new(bus: B, device_addr: Bmp280DeviceAddress) -> BMP280<B> {
        BMP280 {
            device: Device::new(bus, BMP280_ADDRESSES, BMP280_REGISTERS),
            device_addr,
            settings: Bmp280Settings::default(),
            poll: PollConfig::default(),
            state: Bmp280State::Uninitialized,
            configured: None,
            reading: Bmp280Reading::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn get_device_addr(&self) -> Bmp280DeviceAddress {
        self.device_addr
    }

    pub fn state(&self) -> Bmp280State {
        self.state
    }

    pub fn is_configured(&self) -> bool {
        self.configured.is_some()
    }

    pub fn chip(&self) -> Option<Bmp280ChipVariant> {
        self.configured.map(|c| c.chip)
    }

    pub fn settings(&self) -> &Bmp280Settings {
        &self.settings
    }

    pub fn calibration(&self) -> Option<&Bmp280Calibration> {
        self.configured.as_ref().map(|c| &c.calib_data)
    }

    /// Last reading taken by `update_sensor`.
    pub fn last_reading(&self) -> Bmp280Reading {
        self.reading
    }

    /// Identifies the chip, writes the measurement configuration and loads the calibration.
    ///
    /// Does nothing once the sensor is configured.
    pub fn setup(&mut self, settings: Bmp280Settings) -> Result<()> {
        self.configure(settings).map(|_| ())
    }

    fn configure(&mut self, settings: Bmp280Settings) -> Result<Configured> {
        if let Some(configured) = self.configured {
            debug!("BMP280 already configured, ignoring setup");
            return Ok(configured);
        }
        // -- kept even if setup fails, the next cycle retries with the same settings
        self.settings = settings;
        if self.device.address().is_none() {
            self.device.select_address(self.device_addr.value())?;
        }
        let chip_id = self.device.get("CHIP_ID")?.unsigned("id")? as u8;
        let chip = Bmp280ChipVariant::from_chip_id(chip_id).ok_or(SensorError::UnsupportedChip {
            address: self.device_addr.value(),
            chip_id,
        })?;
        debug!("Got chip id: {chip_id:#x} ({chip})");
        // -- forced mode stays asleep until a conversion is requested
        let mode = match settings.mode {
            Bmp280PowerMode::Forced => Bmp280PowerMode::Sleep,
            mode => mode,
        };
        // -- encode both registers before writing either of them
        let ctrl_meas = self.device.get("CTRL_MEAS")?;
        let mut ctrl_meas_raw = ctrl_meas.raw;
        ctrl_meas.register.encode(
            &mut ctrl_meas_raw,
            &[
                ("mode", FieldValue::Symbol(mode.symbol())),
                ("osrs_t", FieldValue::Symbol(Symbol::Number(settings.temperature_oversampling as f64))),
                ("osrs_p", FieldValue::Symbol(Symbol::Number(settings.pressure_oversampling as f64))),
            ],
        )?;
        let config = self.device.get("CONFIG")?;
        let mut config_raw = config.raw;
        config.register.encode(
            &mut config_raw,
            &[
                ("t_sb", FieldValue::Symbol(Symbol::Number(settings.standby_ms))),
                ("filter", FieldValue::Unsigned(settings.iir_filter)),
            ],
        )?;
        self.device.write_register(ctrl_meas.register, &ctrl_meas_raw)?;
        self.device.write_register(config.register, &config_raw)?;
        let calib_data = Bmp280Calibration::load(&mut self.device)?;
        let configured = Configured { chip, calib_data };
        self.configured = Some(configured);
        self.set_state(Bmp280State::Idle);
        Ok(configured)
    }

    /// Soft reset; the chip has to be set up again afterwards.
    pub fn reset(&mut self) -> Result<()> {
        if self.device.address().is_none() {
            self.device.select_address(self.device_addr.value())?;
        }
        debug!("Initiating soft reset");
        self.device.write("RESET", &[("reset", FieldValue::Unsigned(BMP280_SOFT_RESET_COMMAND))])?;
        self.configured = None;
        self.set_state(Bmp280State::Uninitialized);
        Ok(())
    }

    /// Runs one measurement cycle and stores the compensated values.
    pub fn update_sensor(&mut self) -> Result<Bmp280Reading> {
        let configured = self.configure(self.settings)?;
        if self.settings.mode == Bmp280PowerMode::Forced {
            self.device.set("CTRL_MEAS", &[("mode", FieldValue::Symbol(Bmp280PowerMode::Forced.symbol()))])?;
            self.set_state(Bmp280State::Converting);
            let waited = self.wait_for_conversion();
            self.set_state(Bmp280State::Idle);
            waited?;
        }
        let data = self.device.get("DATA")?;
        let raw_temperature = data.unsigned("temperature")? as u32;
        let raw_pressure = data.unsigned("pressure")? as u32;
        debug!("Got raw temperature {raw_temperature}, raw pressure {raw_pressure}");
        let (temperature, t_fine) = configured.calib_data.compensate_temperature(raw_temperature);
        let pressure = configured.calib_data.compensate_pressure(raw_pressure, t_fine) / 100.0;
        self.reading = Bmp280Reading { temperature, pressure };
        Ok(self.reading)
    }

    fn wait_for_conversion(&mut self) -> Result<()> {
        for _ in 0..self.poll.max_attempts {
            if self.device.get("STATUS")?.unsigned("measuring")? == 0 {
                return Ok(());
            }
            thread::sleep(self.poll.interval);
        }
        Err(SensorError::ConversionTimeout { attempts: self.poll.max_attempts })
    }

    fn set_state(&mut self, state: Bmp280State) {
        if self.state != state {
            debug!("BMP280 state {} -> {state}", self.state);
            self.state = state;
        }
    }

    /// Temperature in °C.
    pub fn get_temperature(&mut self) -> Result<f64> {
        Ok(self.update_sensor()?.temperature)
    }

    /// Pressure in hPa.
    pub fn get_pressure(&mut self) -> Result<f64> {
        Ok(self.update_sensor()?.pressure)
    }

    /// Altitude in m above the level where the pressure equals `qnh` (hPa).
    ///
    /// `manual_temperature` replaces the measured temperature when given.
    pub fn get_altitude(&mut self, qnh: f64, manual_temperature: Option<f64>) -> Result<f64> {
        let reading = self.update_sensor()?;
        let temperature = manual_temperature.unwrap_or(reading.temperature);
        Ok(altitude(qnh, reading.pressure, temperature))
    }

    #[cfg(test)]
    pub(crate) fn device_mut(&mut self) -> &mut Device<B> {
        &mut self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmp280::bmp280_calibration::tests::{datasheet, DATASHEET_CALIBRATION};
    use crate::i2cio::fake::{FakeBus, Transaction};
    use std::time::Duration;

    const REG_CHIP_ID: u8 = 0xd0;
    const REG_STATUS: u8 = 0xf3;
    const REG_CTRL_MEAS: u8 = 0xf4;
    const REG_CONFIG: u8 = 0xf5;

    // -- raw pressure 415148, raw temperature 519888
    const DATASHEET_DATA: [u8; 6] = [0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00];

    fn sensor(chip_id: u8) -> BMP280<FakeBus> {
        let mut bus = FakeBus::new();
        bus.load(REG_CHIP_ID, &[chip_id]);
        bus.load(0x88, &DATASHEET_CALIBRATION);
        bus.load(0xf7, &DATASHEET_DATA);
        BMP280::new(bus, Bmp280DeviceAddress::Primary).with_poll_config(PollConfig {
            interval: Duration::ZERO,
            max_attempts: 5,
        })
    }

    fn forced() -> Bmp280Settings {
        Bmp280Settings { mode: Bmp280PowerMode::Forced, ..Bmp280Settings::default() }
    }

    #[test]
    fn setup_bmp280() {
        let mut bmp280 = sensor(0x58);
        assert_eq!(bmp280.state(), Bmp280State::Uninitialized);
        bmp280.setup(Bmp280Settings::default()).unwrap();
        assert_eq!(bmp280.state(), Bmp280State::Idle);
        assert!(bmp280.state().is_configured() && bmp280.is_configured());
        assert_eq!(bmp280.chip(), Some(Bmp280ChipVariant::Bmp280));
        assert_eq!(bmp280.calibration(), Some(&datasheet()));
        let bus = bmp280.device_mut().bus();
        assert_eq!(bus.log[0], Transaction::SetSlave(0x76));
        // -- osrs_t x16, osrs_p x16, normal
        assert_eq!(bus.memory[REG_CTRL_MEAS as usize], 0b101_101_11);
        // -- 500 ms standby, filter 2
        assert_eq!(bus.memory[REG_CONFIG as usize], 0b100_010_00);
    }

    #[test]
    fn setup_bme280() {
        let mut bmp280 = sensor(0x60);
        bmp280.setup(Bmp280Settings::default()).unwrap();
        assert_eq!(bmp280.chip(), Some(Bmp280ChipVariant::Bme280));
    }

    #[test]
    fn setup_rejects_unknown_chip() {
        let mut bmp280 = sensor(0x00);
        let err = bmp280.setup(Bmp280Settings::default()).unwrap_err();
        assert!(matches!(err, SensorError::UnsupportedChip { address: 0x76, chip_id: 0x00 }));
        assert_eq!(bmp280.state(), Bmp280State::Uninitialized);
        assert!(bmp280.device_mut().bus().writes().is_empty());
    }

    #[test]
    fn setup_is_idempotent() {
        let mut bmp280 = sensor(0x58);
        bmp280.setup(forced()).unwrap();
        let log_len = bmp280.device_mut().bus().log.len();
        let calibration = bmp280.calibration().cloned();
        bmp280.setup(forced()).unwrap();
        assert_eq!(bmp280.device_mut().bus().log.len(), log_len);
        assert_eq!(bmp280.calibration().cloned(), calibration);
        assert_eq!(bmp280.settings().mode, Bmp280PowerMode::Forced);
    }

    #[test]
    fn setup_rejects_unknown_standby() {
        let mut bmp280 = sensor(0x58);
        let settings = Bmp280Settings { standby_ms: 300.0, ..Bmp280Settings::default() };
        let err = bmp280.setup(settings).unwrap_err();
        assert!(matches!(err, SensorError::UnknownSymbol { field: "t_sb", .. }));
        assert!(!bmp280.is_configured());
    }

    #[test]
    fn failed_setup_writes_nothing_and_keeps_settings() {
        let mut bmp280 = sensor(0x58);
        let settings = Bmp280Settings { standby_ms: 300.0, ..forced() };
        assert!(bmp280.setup(settings).is_err());
        assert!(bmp280.device_mut().bus().writes().is_empty());
        assert_eq!(bmp280.settings().mode, Bmp280PowerMode::Forced);
        // -- the next cycle retries the requested settings instead of the defaults
        let err = bmp280.get_temperature().unwrap_err();
        assert!(matches!(err, SensorError::UnknownSymbol { field: "t_sb", .. }));
        assert!(bmp280.device_mut().bus().writes().is_empty());
        assert_eq!(bmp280.device_mut().bus().memory[REG_CTRL_MEAS as usize], 0);
        assert!(!bmp280.is_configured());
    }

    #[test]
    fn setup_rejects_unknown_oversampling() {
        let mut bmp280 = sensor(0x58);
        let settings = Bmp280Settings { pressure_oversampling: 3, ..Bmp280Settings::default() };
        let err = bmp280.setup(settings).unwrap_err();
        assert!(matches!(err, SensorError::UnknownSymbol { field: "osrs_p", .. }));
    }

    #[test]
    fn setup_rejects_filter_overflow() {
        let mut bmp280 = sensor(0x58);
        let settings = Bmp280Settings { iir_filter: 8, ..Bmp280Settings::default() };
        let err = bmp280.setup(settings).unwrap_err();
        assert!(matches!(err, SensorError::FieldOverflow { field: "filter", .. }));
    }

    #[test]
    fn forced_mode_is_programmed_as_sleep() {
        let mut bmp280 = sensor(0x58);
        bmp280.setup(forced()).unwrap();
        let ctrl_meas = bmp280.device_mut().bus().memory[REG_CTRL_MEAS as usize];
        assert_eq!(ctrl_meas & 0b11, 0b00);
    }

    #[test]
    fn readings_match_datasheet() {
        let mut bmp280 = sensor(0x58);
        let temperature = bmp280.get_temperature().unwrap();
        let pressure = bmp280.get_pressure().unwrap();
        assert!((temperature - 25.08).abs() < 0.01, "{temperature}");
        assert!((pressure - 1006.53).abs() < 0.01, "{pressure}");
        assert!(bmp280.is_configured());
    }

    #[test]
    fn every_getter_reads_the_bus() {
        let mut bmp280 = sensor(0x58);
        bmp280.get_temperature().unwrap();
        bmp280.get_temperature().unwrap();
        let data_reads = bmp280
            .device_mut()
            .bus()
            .log
            .iter()
            .filter(|t| **t == Transaction::Read { register: 0xf7, len: 6 })
            .count();
        assert_eq!(data_reads, 2);
    }

    #[test]
    fn altitude_from_measurement() {
        let mut bmp280 = sensor(0x58);
        let altitude = bmp280.get_altitude(1013.25, None).unwrap();
        assert!((altitude - 58.09).abs() < 0.01, "{altitude}");
        let manual = bmp280.get_altitude(1013.25, Some(15.0)).unwrap();
        assert!(manual < altitude && manual > 50.0, "{manual}");
    }

    #[test]
    fn forced_conversion_waits_for_status() {
        let mut bmp280 = sensor(0x58);
        bmp280.setup(forced()).unwrap();
        bmp280.device_mut().bus_mut().script(REG_STATUS, &[0x08, 0x08, 0x00]);
        let reading = bmp280.update_sensor().unwrap();
        assert!((reading.pressure - 1006.53).abs() < 0.01);
        let bus = bmp280.device_mut().bus();
        let status_reads = bus.log.iter().filter(|t| **t == Transaction::Read { register: REG_STATUS, len: 1 }).count();
        assert_eq!(status_reads, 3);
        assert_eq!(bus.memory[REG_CTRL_MEAS as usize] & 0b11, 0b10);
        assert_eq!(bmp280.state(), Bmp280State::Idle);
    }

    #[test]
    fn forced_conversion_times_out() {
        let mut bmp280 = sensor(0x58);
        bmp280.setup(forced()).unwrap();
        bmp280.device_mut().bus_mut().load(REG_STATUS, &[0x08]);
        let err = bmp280.update_sensor().unwrap_err();
        assert!(matches!(err, SensorError::ConversionTimeout { attempts: 5 }));
        assert_eq!(bmp280.state(), Bmp280State::Idle);
    }

    #[test]
    fn bus_error_is_surfaced() {
        let mut bmp280 = sensor(0x58);
        bmp280.setup(Bmp280Settings::default()).unwrap();
        bmp280.device_mut().bus_mut().failing = true;
        assert!(matches!(bmp280.get_pressure(), Err(SensorError::Bus(_))));
    }

    #[test]
    fn reset_requires_new_setup() {
        let mut bmp280 = sensor(0x58);
        bmp280.setup(Bmp280Settings::default()).unwrap();
        bmp280.reset().unwrap();
        assert_eq!(bmp280.state(), Bmp280State::Uninitialized);
        assert!(!bmp280.state().is_configured() && !bmp280.is_configured());
        assert_eq!(bmp280.device_mut().bus().writes().last(), Some(&(0xe0, vec![0xb6])));
        bmp280.get_temperature().unwrap();
        assert!(bmp280.is_configured());
    }
}
