use std::fmt::{Debug, Formatter};
use std::thread;
use std::time::Duration;
use crc::{Crc, CRC_8_NRSC_5};
use log::debug;
use crate::bus::{I2cBus, I2cBusExt, NumberFormat};
use crate::{SensorError, SensorResult};

/// Single shot measurement, high repeatability.
const COMMAND_MEASURE: i64 = 0x2c06;
/// Polynomial 0x31, initial value 0xff, as used by Sensirion sensors.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClimateAttribute {
    /// Temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClimateReading {
    pub temperature: f32,
    pub humidity: f32,
}

impl ClimateReading {
    pub fn get(&self, attribute: ClimateAttribute) -> f32 {
        match attribute {
            ClimateAttribute::Temperature => self.temperature,
            ClimateAttribute::Humidity => self.humidity,
        }
    }

    /// Converts the raw measurement frame, verifying both checksums.
    pub fn from_frame(frame: &[u8; 6]) -> SensorResult<Self> {
        let temperature = checked_word(&frame[0..3])?;
        let humidity = checked_word(&frame[3..6])?;

        Ok(ClimateReading {
            temperature: temperature as f32 / 65535.0 * 175.0 - 45.0,
            humidity: humidity as f32 * 100.0 / 65535.0,
        })
    }
}

fn checked_word(chunk: &[u8]) -> SensorResult<u16> {
    let expected = CRC8.checksum(&chunk[..2]);
    let actual = chunk[2];
    if expected != actual {
        return Err(SensorError::Checksum { expected, actual });
    }
    Ok(u16::from_be_bytes([chunk[0], chunk[1]]))
}

/// The temperature and humidity module.
pub struct ClimateSensor<B> {
    bus: B,
    address: u8,
    /// Time given to the sensor to finish a measurement.
    pub measurement_time: Duration,
}

impl<B> Debug for ClimateSensor<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClimateSensor({:#04x})", self.address)
    }
}

impl<B: I2cBus> ClimateSensor<B> {
    pub const DEFAULT_ADDRESS: u8 = 68;

    pub fn new(bus: B) -> Self {
        Self::with_address(bus, Self::DEFAULT_ADDRESS)
    }

    pub fn with_address(bus: B, address: u8) -> Self {
        ClimateSensor {
            bus,
            address,
            measurement_time: Duration::from_millis(10),
        }
    }

    /// Triggers a measurement and reads it back.
    pub fn read(&mut self) -> SensorResult<ClimateReading> {
        self.bus.write_register(self.address, COMMAND_MEASURE, NumberFormat::UInt16BE)?;
        thread::sleep(self.measurement_time);

        let mut frame = [0u8; 6];
        self.bus.read(self.address, &mut frame)?;
        let reading = ClimateReading::from_frame(&frame)?;
        debug!("{:?}", reading);
        Ok(reading)
    }

    pub fn read_attribute(&mut self, attribute: ClimateAttribute) -> SensorResult<f32> {
        Ok(self.read()?.get(attribute))
    }
}
