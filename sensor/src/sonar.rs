use std::fmt::{Debug, Formatter};
use std::time::Duration;
use log::debug;
use crate::pulse::pulse_in;
use crate::{GpioInput, GpioOutput, SensorResult};

/// Echo round trip time per centimeter of distance, in microseconds.
const MICROS_PER_CM: u32 = 58;
/// Echo round trip time per inch of distance, in microseconds.
const MICROS_PER_INCH: u32 = 148;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PingUnit {
    #[default] MicroSeconds,
    Centimeters,
    Inches,
}

impl PingUnit {
    /// Converts an echo time, truncating.
    pub fn convert(self, echo: Duration) -> u32 {
        let micros = u32::try_from(echo.as_micros()).unwrap_or(u32::MAX);
        match self {
            PingUnit::MicroSeconds => micros,
            PingUnit::Centimeters => micros / MICROS_PER_CM,
            PingUnit::Inches => micros / MICROS_PER_INCH,
        }
    }
}

/// An ultrasonic ranging module with separate trigger and echo pins.
pub struct Sonar<'a> {
    trig: &'a dyn GpioOutput,
    echo: &'a dyn GpioInput,
    /// Echoes from further away than this are treated as missing.
    pub max_distance_cm: u32,
}

impl Debug for Sonar<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sonar(trig: {:?}, echo: {:?})", self.trig, self.echo)
    }
}

impl<'a> Sonar<'a> {
    /// Creates a sonar on the given pins.
    ///
    /// The trigger pin should have no bias configured.
    pub fn new(trig: &'a dyn GpioOutput, echo: &'a dyn GpioInput) -> Self {
        Sonar {
            trig,
            echo,
            max_distance_cm: 500,
        }
    }

    pub fn with_max_distance_cm(mut self, max_distance_cm: u32) -> Self {
        self.max_distance_cm = max_distance_cm;
        self
    }

    /// Gets how long an echo from `max_distance_cm` takes to come back.
    pub fn echo_timeout(&self) -> Duration {
        Duration::from_micros(u64::from(self.max_distance_cm) * u64::from(MICROS_PER_CM))
    }

    /// Sends a ping and measures the echo.
    ///
    /// Returns `0` when no echo arrives within the range limit.
    pub fn ping(&self, unit: PingUnit) -> SensorResult<u32> {
        self.trig.write(false)?;
        spin_sleep::sleep(Duration::from_micros(2));
        self.trig.write(true)?;
        spin_sleep::sleep(Duration::from_micros(10));
        self.trig.write(false)?;

        match pulse_in(self.echo, true, self.echo_timeout())? {
            Some(echo) => Ok(unit.convert(echo)),
            None => {
                debug!("No echo within {} cm.", self.max_distance_cm);
                Ok(0)
            }
        }
    }
}
