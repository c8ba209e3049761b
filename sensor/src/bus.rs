//! I2C access for the kit's modules.
//!
//! The modules expect the register-select write and the data read to form a
//! single transaction (repeated start), so [I2cBus::write] can hold a write back
//! until the next read to the same device.

use std::fmt::{Debug, Formatter};
use embedded_hal::i2c::{ErrorKind, I2c};
use log::trace;
use crate::{SensorError, SensorResult};

/// Lowest and highest 7-bit addresses that are not reserved.
const SCAN_RANGE: std::ops::RangeInclusive<u8> = 0x08..=0x77;

/// Width, signedness and byte order of a number exchanged with a device.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NumberFormat {
    Int8LE,
    UInt8LE,
    Int16LE,
    UInt16LE,
    Int16BE,
    UInt16BE,
    Int32LE,
    UInt32LE,
    Int32BE,
    UInt32BE,
}

impl NumberFormat {
    /// Gets the size of the number in bytes.
    pub fn size(self) -> usize {
        use NumberFormat::*;

        match self {
            Int8LE | UInt8LE => 1,
            Int16LE | UInt16LE | Int16BE | UInt16BE => 2,
            Int32LE | UInt32LE | Int32BE | UInt32BE => 4,
        }
    }

    /// Encodes the value into bytes, truncating it to the format's width.
    pub fn encode(self, value: i64) -> Vec<u8> {
        use NumberFormat::*;

        match self {
            Int8LE | UInt8LE => vec![value as u8],
            Int16LE | UInt16LE => (value as u16).to_le_bytes().to_vec(),
            Int16BE | UInt16BE => (value as u16).to_be_bytes().to_vec(),
            Int32LE | UInt32LE => (value as u32).to_le_bytes().to_vec(),
            Int32BE | UInt32BE => (value as u32).to_be_bytes().to_vec(),
        }
    }

    /// Decodes a number from the first [size](Self::size) bytes.
    ///
    /// # Errors
    /// - `SensorError::InvalidArgument` if there are not enough bytes.
    pub fn decode(self, bytes: &[u8]) -> SensorResult<i64> {
        use NumberFormat::*;

        if bytes.len() < self.size() {
            return Err(SensorError::InvalidArgument);
        }
        let b = bytes;

        Ok(match self {
            Int8LE => b[0] as i8 as i64,
            UInt8LE => b[0] as i64,
            Int16LE => i16::from_le_bytes([b[0], b[1]]) as i64,
            UInt16LE => u16::from_le_bytes([b[0], b[1]]) as i64,
            Int16BE => i16::from_be_bytes([b[0], b[1]]) as i64,
            UInt16BE => u16::from_be_bytes([b[0], b[1]]) as i64,
            Int32LE => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
            UInt32LE => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
            Int32BE => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as i64,
            UInt32BE => u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as i64,
        })
    }
}

/// The raw I2C primitives the drivers are written against.
pub trait I2cBus: Debug {
    /// Writes bytes to the device at `address`.
    ///
    /// With `repeated`, no stop condition is sent, so the next read from the
    /// same address continues the transaction.
    fn write(&mut self, address: u8, bytes: &[u8], repeated: bool) -> SensorResult<()>;

    /// Fills `buf` with bytes read from the device at `address`.
    fn read(&mut self, address: u8, buf: &mut [u8]) -> SensorResult<()>;
}

impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    fn write(&mut self, address: u8, bytes: &[u8], repeated: bool) -> SensorResult<()> {
        (**self).write(address, bytes, repeated)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> SensorResult<()> {
        (**self).read(address, buf)
    }
}

impl<T: I2cBus + ?Sized> I2cBus for Box<T> {
    fn write(&mut self, address: u8, bytes: &[u8], repeated: bool) -> SensorResult<()> {
        (**self).write(address, bytes, repeated)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> SensorResult<()> {
        (**self).read(address, buf)
    }
}

/// Extension trait for I2C buses, providing number-level and register-level access.
pub trait I2cBusExt: I2cBus {
    /// Writes a number in the given format.
    fn write_number(
        &mut self,
        address: u8,
        value: i64,
        format: NumberFormat,
        repeated: bool,
    ) -> SensorResult<()> {
        self.write(address, &format.encode(value), repeated)
    }

    /// Reads a number in the given format.
    fn read_number(&mut self, address: u8, format: NumberFormat) -> SensorResult<i64> {
        let mut buf = [0u8; 4];
        let buf = &mut buf[..format.size()];
        self.read(address, buf)?;
        format.decode(buf)
    }

    /// Selects a register with a repeated-start write, then reads its value.
    fn read_register(
        &mut self,
        address: u8,
        selector: i64,
        selector_format: NumberFormat,
        format: NumberFormat,
    ) -> SensorResult<i64> {
        self.write_number(address, selector, selector_format, true)?;
        self.read_number(address, format)
    }

    /// Writes a value as a complete transaction.
    fn write_register(&mut self, address: u8, value: i64, format: NumberFormat) -> SensorResult<()> {
        self.write_number(address, value, format, false)
    }

    /// Checks whether a device acknowledges its address.
    ///
    /// # Errors
    /// Bus errors other than a missing acknowledge are passed through.
    fn probe(&mut self, address: u8) -> SensorResult<bool> {
        let mut buf = [0u8; 1];
        match self.read(address, &mut buf) {
            Ok(()) => Ok(true),
            Err(SensorError::Bus(ErrorKind::NoAcknowledge(_))) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Lists the addresses of every responding device.
    fn scan(&mut self) -> SensorResult<Vec<u8>> {
        let mut found = Vec::new();
        for address in SCAN_RANGE {
            if self.probe(address)? {
                found.push(address);
            }
        }
        Ok(found)
    }
}

impl<T: I2cBus + ?Sized> I2cBusExt for T {}

fn bus_error<E: embedded_hal::i2c::Error>(err: E) -> SensorError {
    SensorError::Bus(err.kind())
}

/// An [I2cBus] over any `embedded-hal` I2C implementation.
///
/// A repeated-start write is kept until the next read to the same address and
/// then issued together with it as a single write-read transaction.
pub struct HalI2cBus<I> {
    i2c: I,
    pending: Option<(u8, Vec<u8>)>,
}

impl<I> HalI2cBus<I> {
    pub fn new(i2c: I) -> Self {
        HalI2cBus { i2c, pending: None }
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }
}

impl<I> Debug for HalI2cBus<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.pending {
            Some((address, _)) => write!(f, "HalI2cBus(pending @ {:#04x})", address),
            None => write!(f, "HalI2cBus"),
        }
    }
}

impl<I: I2c> HalI2cBus<I> {
    fn flush(&mut self) -> SensorResult<()> {
        if let Some((address, bytes)) = self.pending.take() {
            trace!("{:#04x} <- {:02x?} (flushed)", address, bytes);
            self.i2c.write(address, &bytes).map_err(bus_error)?;
        }
        Ok(())
    }
}

impl<I: I2c> I2cBus for HalI2cBus<I> {
    fn write(&mut self, address: u8, bytes: &[u8], repeated: bool) -> SensorResult<()> {
        self.flush()?;

        if repeated {
            self.pending = Some((address, bytes.to_vec()));
            return Ok(());
        }

        trace!("{:#04x} <- {:02x?}", address, bytes);
        self.i2c.write(address, bytes).map_err(bus_error)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> SensorResult<()> {
        match self.pending.take() {
            Some((pending_address, bytes)) if pending_address == address => {
                self.i2c.write_read(address, &bytes, buf).map_err(bus_error)?;
                trace!("{:#04x} <- {:02x?} -> {:02x?}", address, bytes, buf);
            }
            pending => {
                self.pending = pending;
                self.flush()?;
                self.i2c.read(address, buf).map_err(bus_error)?;
                trace!("{:#04x} -> {:02x?}", address, buf);
            }
        }
        Ok(())
    }
}
