use thiserror::Error;

/// Errors surfaced by the register layer and the sensor drivers.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("I2C bus error: {0}")]
    Bus(#[from] std::io::Error),

    #[error("Unsupported chip id '{chip_id:#04x}' on address '{address:#04x}'")]
    UnsupportedChip { address: u16, chip_id: u8 },

    #[error("Field '{field}' has no lookup entry for {value}")]
    UnknownSymbol { field: &'static str, value: String },

    #[error("Value {value} does not fit into the {width} bit(s) of field '{field}'")]
    FieldOverflow { field: &'static str, value: i128, width: u32 },

    #[error("Conversion still running after {attempts} status polls")]
    ConversionTimeout { attempts: u32 },

    #[error("Unknown register '{0}'")]
    UnknownRegister(String),

    #[error("Register '{register}' has no field '{field}'")]
    UnknownField { register: &'static str, field: String },

    #[error("Field '{0}' is read-only")]
    ReadOnlyField(&'static str),

    #[error("No device address selected")]
    AddressNotSelected,
}

pub type Result<T> = std::result::Result<T, SensorError>;
