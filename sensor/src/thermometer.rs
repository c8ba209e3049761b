//! The infrared thermometer module.
//!
//! Two revisions of the module exist. The newer one answers a register read
//! over I2C, the older one only outputs a PWM signal whose duty cycle encodes
//! the temperature. [Thermometer::start] finds out which one is connected.

use std::fmt::{Debug, Formatter};
use log::{debug, info, warn};
use crate::bus::{I2cBus, I2cBusExt, NumberFormat};
use crate::pulse::{EdgeSource, PulseMonitor};
use crate::SensorResult;

const TEMPERATURE_REGISTER: i64 = 128 + 3;

/// How temperature readings are obtained.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThermometerMode {
    /// [Thermometer::start] was not called yet.
    Uninitialized,
    /// Register reads over I2C.
    Digital,
    /// Duty cycle of the PWM output.
    Pwm,
}

pub struct Thermometer<B> {
    bus: B,
    address: u8,
    digital: bool,
    monitor: Option<PulseMonitor>,
}

impl<B> Debug for Thermometer<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Thermometer({:#04x}, digital: {}, {:?})", self.address, self.digital, self.monitor)
    }
}

impl<B: I2cBus> Thermometer<B> {
    pub const DEFAULT_ADDRESS: u8 = 16;

    pub fn new(bus: B) -> Self {
        Self::with_address(bus, Self::DEFAULT_ADDRESS)
    }

    pub fn with_address(bus: B, address: u8) -> Self {
        Thermometer {
            bus,
            address,
            digital: false,
            monitor: None,
        }
    }

    pub fn mode(&self) -> ThermometerMode {
        if self.digital {
            ThermometerMode::Digital
        } else if self.monitor.is_some() {
            ThermometerMode::Pwm
        } else {
            ThermometerMode::Uninitialized
        }
    }

    /// Detects the module revision.
    ///
    /// A non-zero register value selects digital readings, and once selected
    /// they stay selected. Otherwise `open_pwm` is called, only the first time,
    /// for the PWM line to monitor.
    pub fn start<E, F>(&mut self, open_pwm: F) -> SensorResult<ThermometerMode>
    where
        E: EdgeSource + Send + 'static,
        F: FnOnce() -> SensorResult<E>,
    {
        match self.read_raw() {
            Ok(raw) if raw != 0 => {
                if !self.digital {
                    info!("Infrared thermometer answers over I2C, using register readings.");
                }
                self.digital = true;
            }
            Ok(_) => debug!("Thermometer register reads zero."),
            Err(err) => warn!("Thermometer register read failed: {}", err),
        }

        if !self.digital && self.monitor.is_none() {
            let source = open_pwm()?;
            info!("Infrared thermometer is PWM only, monitoring {:?}.", source);
            self.monitor = Some(PulseMonitor::spawn(source)?);
        }

        Ok(self.mode())
    }

    /// Reads the body temperature in degrees Celsius.
    ///
    /// Returns `None` before [start](Self::start), and in PWM mode until a full
    /// period was measured.
    pub fn read_temperature(&mut self) -> SensorResult<Option<f32>> {
        if self.digital {
            let raw = self.read_raw()?;
            return Ok(Some(digital_celsius(raw)));
        }

        Ok(self
            .monitor
            .as_ref()
            .and_then(PulseMonitor::duty_cycle)
            .map(pwm_celsius))
    }

    fn read_raw(&mut self) -> SensorResult<i64> {
        self.bus.read_register(
            self.address,
            TEMPERATURE_REGISTER,
            NumberFormat::Int16LE,
            NumberFormat::Int32LE,
        )
    }
}

/// Converts a register value: the low word holds tenths of a degree shifted left by one.
pub fn digital_celsius(raw: i64) -> f32 {
    ((raw & 0xffff) >> 1) as f32 / 10.0
}

/// Converts the PWM duty cycle of the older module.
pub fn pwm_celsius(duty_cycle: f32) -> f32 {
    280.0 * duty_cycle - 53.4
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::mock::{no_acknowledge, MockBus};
    use crate::pulse::tests::{wait_until_stopped, ScriptedEdges};

    #[test]
    fn non_zero_register_selects_digital() {
        let opened = Cell::new(false);
        let mut bus = MockBus::default();
        bus.respond(&[0x2c, 0x03, 0x00, 0x00]).respond(&[0x2c, 0x03, 0x01, 0x00]);

        let mut thermometer = Thermometer::new(&mut bus);
        let mode = thermometer.start(|| {
            opened.set(true);
            Ok(ScriptedEdges::from_micros(&[]))
        });

        assert_eq!(mode, Ok(ThermometerMode::Digital));
        assert!(!opened.get());
        assert_eq!(thermometer.read_temperature(), Ok(Some(40.6)));
        assert_eq!(bus.writes[0], (16, vec![0x83, 0x00], true));
    }

    #[test]
    fn zero_register_falls_back_to_pwm() {
        let mut bus = MockBus::default();
        bus.respond(&[0, 0, 0, 0]);

        let mut thermometer = Thermometer::new(&mut bus);
        let mode = thermometer.start(|| {
            Ok(ScriptedEdges::from_micros(&[(true, 0), (false, 250), (true, 1000)]))
        });
        assert_eq!(mode, Ok(ThermometerMode::Pwm));

        wait_until_stopped(thermometer.monitor.as_ref().unwrap());
        let celsius = thermometer.read_temperature().unwrap().unwrap();
        assert!((celsius - 16.6).abs() < 1e-3);
    }

    #[test]
    fn failed_detection_falls_back_to_pwm_once() {
        let opened = Cell::new(0);
        let mut bus = MockBus::default();
        bus.fail(no_acknowledge());

        let mut thermometer = Thermometer::new(&mut bus);
        assert_eq!(thermometer.read_temperature(), Ok(None));

        for _ in 0..2 {
            let mode = thermometer.start(|| {
                opened.set(opened.get() + 1);
                Ok(ScriptedEdges::from_micros(&[]))
            });
            assert_eq!(mode, Ok(ThermometerMode::Pwm));
        }

        assert_eq!(opened.get(), 1);
        assert_eq!(thermometer.read_temperature(), Ok(None));
    }

    #[test]
    fn conversions() {
        assert_eq!(digital_celsius(0x0001_0000 | 740), 37.0);
        assert!((pwm_celsius(0.5) - 86.6).abs() < 1e-3);
    }
}
