#[allow(unused_imports)]
use log::{debug, info};

use crate::error::{Result, SensorError};
use crate::i2cio::I2cBus;
use crate::register::{FieldValue, RegisterDescriptor, RegisterValue};

/// A register-mapped device reachable on one of a fixed set of bus addresses.
///
/// `select_address` has to be called once before any register access; it is
/// not meant to be called again afterwards.
pub struct Device<B> {
    bus: B,
    candidates: &'static [u16],
    address: Option<u16>,
    registers: &'static [RegisterDescriptor],
}

/// A register read together with its descriptor.
#[derive(Debug)]
pub struct Readout {
    pub register: &'static RegisterDescriptor,
    pub raw: RegisterValue,
}

impl Readout {
    pub fn field(&self, name: &str) -> Result<FieldValue> {
        self.register.decode(&self.raw, name)
    }

    pub fn unsigned(&self, name: &str) -> Result<u64> {
        match self.field(name)? {
            FieldValue::Unsigned(value) => Ok(value),
            FieldValue::Signed(value) => u64::try_from(value).map_err(|_| self.overflow(name, value as i128)),
            other => Err(SensorError::UnknownSymbol { field: self.register.field(name)?.name, value: other.to_string() }),
        }
    }

    pub fn signed(&self, name: &str) -> Result<i64> {
        match self.field(name)? {
            FieldValue::Signed(value) => Ok(value),
            FieldValue::Unsigned(value) => i64::try_from(value).map_err(|_| self.overflow(name, value as i128)),
            other => Err(SensorError::UnknownSymbol { field: self.register.field(name)?.name, value: other.to_string() }),
        }
    }

    fn overflow(&self, name: &str, value: i128) -> SensorError {
        match self.register.field(name) {
            Ok(field) => SensorError::FieldOverflow { field: field.name, value, width: field.width },
            Err(err) => err,
        }
    }
}

impl<B: I2cBus> Device<B> {
    pub fn new(bus: B, candidates: &'static [u16], registers: &'static [RegisterDescriptor]) -> Self {
        Device { bus, candidates, address: None, registers }
    }

    pub fn candidates(&self) -> &'static [u16] {
        self.candidates
    }

    pub fn address(&self) -> Option<u16> {
        self.address
    }

    pub fn select_address(&mut self, address: u16) -> Result<()> {
        if !self.candidates.contains(&address) {
            let errmsg = format!("Address '{address:#04x}' is not one of {:#04x?}", self.candidates);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, errmsg).into());
        }
        self.bus.set_slave(address)?;
        debug!("Selected device address {address:#04x}");
        self.address = Some(address);
        Ok(())
    }

    pub fn register(&self, name: &str) -> Result<&'static RegisterDescriptor> {
        let registers = self.registers;
        registers.iter().find(|r| r.name == name).ok_or_else(|| SensorError::UnknownRegister(name.to_string()))
    }

    pub fn read_register(&mut self, register: &RegisterDescriptor) -> Result<RegisterValue> {
        self.address.ok_or(SensorError::AddressNotSelected)?;
        let mut data = vec![0; register.len()];
        self.bus.read_block(register.address, &mut data)?;
        Ok(RegisterValue::from_bytes(data))
    }

    pub fn write_register(&mut self, register: &RegisterDescriptor, raw: &RegisterValue) -> Result<()> {
        self.address.ok_or(SensorError::AddressNotSelected)?;
        debug!("Setting register {} {:#x} to value {raw}", register.name, register.address);
        self.bus.write_block(register.address, raw.as_bytes())?;
        Ok(())
    }

    /// Reads a register by name.
    pub fn get(&mut self, name: &str) -> Result<Readout> {
        let register = self.register(name)?;
        let raw = self.read_register(register)?;
        Ok(Readout { register, raw })
    }

    /// Read-modify-write of the named fields of a register.
    pub fn set(&mut self, name: &str, values: &[(&str, FieldValue)]) -> Result<()> {
        let register = self.register(name)?;
        let mut raw = self.read_register(register)?;
        register.encode(&mut raw, values)?;
        self.write_register(register, &raw)
    }

    /// Writes the named fields with every other bit cleared.
    pub fn write(&mut self, name: &str, values: &[(&str, FieldValue)]) -> Result<()> {
        let register = self.register(name)?;
        let mut raw = RegisterValue::zeroed(register.len());
        register.encode(&mut raw, values)?;
        self.write_register(register, &raw)
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &B {
        &self.bus
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}
