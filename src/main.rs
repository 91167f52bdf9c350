use chrono::Local;
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::path::Path;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use env_sensors::bmp280::*;
use env_sensors::i2cio;

const EXIT_CODE_SET_CTR_C_HNDLR_FAILED: u8 = 0x02;
const EXIT_CODE_OPEN_BUS_FAILED: u8 = 0x03;
const EXIT_CODE_BMP280_SETUP_FAILED: u8 = 0x51;

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Address {
    Primary,
    Secondary,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    Sleep,
    Forced,
    Normal,
}

#[derive(Parser)]
struct Args {
    // -- i2c bus device
    #[clap(env = "BMP280_BUS", default_value = "/dev/i2c-1")]
    bus_path: String,
    #[clap(long, value_enum, env = "BMP280_ADDRESS", default_value = "primary")]
    address: Address,
    #[clap(long, value_enum, env = "BMP280_MODE", default_value = "normal")]
    mode: Mode,
    #[clap(long, env = "BMP280_TEMPERATURE_OVERSAMPLING", default_value_t = 16)]
    temperature_oversampling: u32,
    #[clap(long, env = "BMP280_PRESSURE_OVERSAMPLING", default_value_t = 16)]
    pressure_oversampling: u32,
    // -- standby time in ms
    #[clap(long, env = "BMP280_STANDBY", default_value_t = 500.0)]
    standby: f64,
    #[clap(long, env = "BMP280_FILTER", default_value_t = 2)]
    filter: u64,
    // -- sea level pressure in hPa
    #[clap(long, env = "BMP280_QNH", default_value_t = 1013.25)]
    qnh: f64,
    // -- seconds between readings
    #[clap(long, env = "BMP280_INTERVAL", default_value_t = 10)]
    interval: u32,
}

impl Args {
    fn reading_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval))
    }
}

fn main() -> ExitCode {

    // -- read .env file
    dotenv::dotenv().ok();
    // -- setup logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let now = Local::now();
    info!("Starting up: {now}");

    let args = Args::parse();
    let reading_interval = args.reading_interval();
    let bus_path = args.bus_path;
    info!("Using i2c bus device {bus_path}");

    // -- set handler for Ctrl-C
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, terminating...");
        std::process::exit(0);
    }) {
        error!("ERROR - Failed to set Ctrl-C handler: {err}");
        return ExitCode::from(EXIT_CODE_SET_CTR_C_HNDLR_FAILED);
    }

    let i2c = match i2cio::get_bus(Path::new(&bus_path)) {
        Ok(i2c) => i2c,
        Err(err) => {
            error!("ERROR - Failed to open i2c bus {bus_path}: {err}");
            return ExitCode::from(EXIT_CODE_OPEN_BUS_FAILED);
        }
    };

    let dev_addr = match args.address {
        Address::Primary => Bmp280DeviceAddress::Primary,
        Address::Secondary => Bmp280DeviceAddress::Secondary,
    };
    let mode = match args.mode {
        Mode::Sleep => Bmp280PowerMode::Sleep,
        Mode::Forced => Bmp280PowerMode::Forced,
        Mode::Normal => Bmp280PowerMode::Normal,
    };
    let settings = Bmp280Settings {
        mode,
        temperature_oversampling: args.temperature_oversampling,
        pressure_oversampling: args.pressure_oversampling,
        standby_ms: args.standby,
        iir_filter: args.filter,
    };

    info!("Initializing BMP280 on {dev_addr} in mode {mode}");
    let mut bmp280 = BMP280::new(i2c, dev_addr);
    if let Err(err) = bmp280.setup(settings) {
        error!("ERROR - Failed to set up BMP280: {err}");
        return ExitCode::from(EXIT_CODE_BMP280_SETUP_FAILED);
    }
    if let Some(chip) = bmp280.chip() {
        info!("Found {chip}");
    }

    loop {
        // -- a failed reading skips this cycle, the next one retries
        match bmp280.get_altitude(args.qnh, None) {
            Ok(altitude) => {
                let reading = bmp280.last_reading();
                info!("temperature: {:.2} °C", reading.temperature);
                info!("pressure: {:.2} hPa", reading.pressure);
                info!("altitude: {altitude:.2} m");
            }
            Err(err) => error!("ERROR - Failed to read BMP280: {err}"),
        }
        // -- delay next reading
        thread::sleep(reading_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_reading_interval() {
        let args = Args::parse_from(["bmp280-poller", "/dev/i2c-5", "--interval", "4294967295"]);
        assert_eq!(args.reading_interval(), Duration::from_secs(4_294_967_295));
        assert_eq!(args.bus_path, "/dev/i2c-5");
    }
}
