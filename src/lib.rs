pub mod bmp280;
pub mod device;
pub mod error;
pub mod i2cio;
pub mod register;

pub use error::{Result, SensorError};
