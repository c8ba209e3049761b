//! Analog inputs through the Linux industrial I/O sysfs interface.

use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use crate::{AnalogInput, SensorError, SensorResult};

const IIO_DEVICES: &str = "/sys/bus/iio/devices";
/// Resolution of the readings [AnalogInput] promises.
const TARGET_BITS: u8 = 10;

pub struct IioAnalogInput {
    path: PathBuf,
    resolution_bits: u8,
}

impl IioAnalogInput {
    /// Opens a voltage channel of an IIO device.
    ///
    /// The ADC is assumed to have a 12-bit resolution, see [with_resolution_bits](Self::with_resolution_bits).
    pub fn open(device: usize, channel: u8) -> SensorResult<Self> {
        let path = Path::new(IIO_DEVICES)
            .join(format!("iio:device{}", device))
            .join(format!("in_voltage{}_raw", channel));
        if !path.exists() {
            return Err(SensorError::InvalidArgument);
        }
        Ok(Self::from_path(path))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        IioAnalogInput {
            path: path.into(),
            resolution_bits: 12,
        }
    }

    /// Sets the ADC resolution, clamped to `1..=32` bits.
    pub fn with_resolution_bits(mut self, resolution_bits: u8) -> Self {
        self.resolution_bits = resolution_bits.clamp(1, 32);
        self
    }
}

impl Debug for IioAnalogInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IioAnalogInput({:?})", self.path)
    }
}

impl AnalogInput for IioAnalogInput {
    fn read(&self) -> SensorResult<u16> {
        let content = std::fs::read_to_string(&self.path)?;
        let raw: u32 = content
            .trim()
            .parse()
            .map_err(|_| SensorError::Other("parsing ADC reading failed".to_string()))?;

        let scaled = if self.resolution_bits >= TARGET_BITS {
            raw >> (self.resolution_bits - TARGET_BITS)
        } else {
            raw << (TARGET_BITS - self.resolution_bits)
        };
        Ok(scaled.min(1023) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("hetao-iio-{}-{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn rescales_to_ten_bits() {
        let path = reading_file("12bit", "4095\n");
        assert_eq!(IioAnalogInput::from_path(&path).read(), Ok(1023));

        let path = reading_file("8bit", "64\n");
        let input = IioAnalogInput::from_path(&path).with_resolution_bits(8);
        assert_eq!(input.read(), Ok(256));
    }

    #[test]
    fn oversized_resolution_is_clamped() {
        let path = reading_file("64bit", "4194304\n");
        let input = IioAnalogInput::from_path(&path).with_resolution_bits(64);
        assert_eq!(input.read(), Ok(1));

        let input = IioAnalogInput::from_path(&path).with_resolution_bits(0);
        assert_eq!(input.read(), Ok(1023));
    }

    #[test]
    fn garbage_is_an_error() {
        let path = reading_file("garbage", "n/a\n");
        assert!(matches!(IioAnalogInput::from_path(&path).read(), Err(SensorError::Other(_))));
        assert_eq!(
            IioAnalogInput::from_path("/nonexistent/in_voltage0_raw").read(),
            Err(SensorError::Io(std::io::ErrorKind::NotFound))
        );
    }
}
