use i2c_linux::I2c;
use std::fs::File;
use std::io;
use std::path::Path;

/// Byte-level access to devices on an I2C bus.
///
/// Register reads and writes address the currently selected slave, so
/// `set_slave` has to be called before any transfer.
pub trait I2cBus {
    fn set_slave(&mut self, dev_addr: u16) -> io::Result<()>;

    /// Reads `data.len()` consecutive bytes starting at `register`.
    fn read_block(&mut self, register: u8, data: &mut [u8]) -> io::Result<()>;

    /// Writes `data` to consecutive registers starting at `register`.
    fn write_block(&mut self, register: u8, data: &[u8]) -> io::Result<()>;
}

impl I2cBus for I2c<File> {
    fn set_slave(&mut self, dev_addr: u16) -> io::Result<()> {
        self.smbus_set_slave_address(dev_addr, false)
    }

    fn read_block(&mut self, register: u8, data: &mut [u8]) -> io::Result<()> {
        if data.len() == 1 {
            data[0] = self.smbus_read_byte_data(register)?;
            return Ok(());
        }
        let bytes_read = self.i2c_read_block_data(register, data)?;
        if bytes_read != data.len() {
            let errmsg = format!("Short read at register {register:#04x}: got {bytes_read} of {} bytes", data.len());
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, errmsg));
        }
        Ok(())
    }

    fn write_block(&mut self, register: u8, data: &[u8]) -> io::Result<()> {
        match data {
            [byte] => self.smbus_write_byte_data(register, *byte),
            _ => self.i2c_write_block_data(register, data),
        }
    }
}

pub fn get_bus(bus_path: &Path) -> Result<I2c<File>, io::Error> {
    I2c::from_path(bus_path)
}
