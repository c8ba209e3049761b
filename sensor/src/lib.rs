pub mod bus;
pub mod keypad;
pub mod audio;
pub mod sonar;
pub mod thermometer;
pub mod climate;
pub mod knob;
pub mod pulse;
pub mod gpiod;
pub mod iio;

#[cfg(test)]
mod mock;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum SensorError {
    #[error("I2C bus error: {0:?}")]
    Bus(embedded_hal::i2c::ErrorKind),
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::Io(err.kind())
    }
}

pub type SensorResult<T> = Result<T, SensorError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> SensorResult<usize>;

    /// Gets the GPIO pin at the given index.
    fn get_pin(&self, index: usize) -> SensorResult<Box<dyn GpioPin + '_>>;
}

/// Specifies the active level of the GPIO pin.
///
/// By default, the active level is high.
#[derive(Copy, Clone, Debug, Default)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

/// Specifies the bias of the GPIO pin.
///
/// The sonar trigger is driven without any pull resistor, while the
/// thermometer PWM line usually wants a pull-down so an unplugged module reads low.
#[derive(Copy, Clone, Debug, Default)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to input, allowing reading its state.
    fn as_input(&mut self) -> SensorResult<Box<dyn GpioInput + '_>>;
    /// Sets the GPIO pin function to output, allowing writing its state.
    fn as_output(&mut self) -> SensorResult<Box<dyn GpioOutput + '_>>;

    /// Gets the active level of the GPIO pin.
    fn active_level(&self) -> GpioActiveLevel {
        GpioActiveLevel::High
    }
    /// Sets the active level of the GPIO pin.
    ///
    /// # Errors
    /// - `SensorError::NotSupported` if the pin does not support active level.
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> SensorResult<()> {
        Err(SensorError::NotSupported)
    }

    /// Gets the bias of the GPIO pin.
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias of the GPIO pin.
    ///
    /// # Errors
    /// - `SensorError::NotSupported` if the pin does not support bias.
    fn set_bias(&mut self, _bias: GpioBias) -> SensorResult<()> {
        Err(SensorError::NotSupported)
    }
}

pub trait GpioInput: Debug {
    /// Reads the state of the GPIO pin.
    fn read(&self) -> SensorResult<bool>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> SensorResult<()>;
}

/// An analog input, read on the 10-bit `0..=1023` scale the kit's modules are specified against.
pub trait AnalogInput: Debug {
    fn read(&self) -> SensorResult<u16>;
}
