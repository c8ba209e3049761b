//! GpiodDriver implementation for managing GPIO pins using the gpiod library.
use crate::pulse::{Edge, EdgeSource};
use crate::{
    GpioActiveLevel, GpioBias, GpioDriver, GpioInput, GpioOutput, GpioPin, SensorError,
    SensorResult,
};
use bitvec::vec::BitVec;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO pins.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        let bits = BitVec::repeat(false, n);
        Self {
            chip,
            used_pins: bits,
        }
    }

    /// Opens the GPIO chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> SensorResult<Self> {
        let chip = gpiod::Chip::new(path.as_ref())?;
        Ok(Self::new(chip))
    }

    /// Requests the pin as an input reporting both edges.
    ///
    /// The pin stays claimed for the rest of the process, since the source is
    /// usually handed to a [PulseMonitor](crate::pulse::PulseMonitor) thread.
    pub fn edge_source(&self, index: usize, bias: GpioBias) -> SensorResult<GpiodEdgeSource> {
        self.claim(index)?;

        let lines = self.chip.request_lines(
            gpiod::Options::input([index as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .bias(bias.into())
                .edge(gpiod::EdgeDetect::Both),
        )?;

        Ok(GpiodEdgeSource {
            chip_name: self.chip.name().to_string(),
            pin_index: index,
            lines,
        })
    }

    fn claim(&self, index: usize) -> SensorResult<()> {
        if index >= self.count()? {
            return Err(SensorError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(SensorError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);
        Ok(())
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> SensorResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> SensorResult<Box<dyn GpioPin + '_>> {
        self.claim(index)?;

        Ok(Box::new(GpiodPin {
            driver: self,
            pin_index: index,
            active_level: GpioActiveLevel::High,
            bias: GpioBias::None,
        }))
    }
}

impl From<GpioActiveLevel> for gpiod::Active {
    fn from(level: GpioActiveLevel) -> Self {
        match level {
            GpioActiveLevel::High => gpiod::Active::High,
            GpioActiveLevel::Low => gpiod::Active::Low,
        }
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

struct GpiodPin<'a> {
    driver: &'a GpiodDriver,
    pin_index: usize,
    active_level: GpioActiveLevel,
    bias: GpioBias,
}

impl Debug for GpiodPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for GpiodPin<'_> {
    fn as_input(&mut self) -> SensorResult<Box<dyn GpioInput + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::input([self.pin_index as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .active(self.active_level.into())
                .bias(self.bias.into()),
        )?;
        let input = GpiodInput { pin: self, line };
        Ok(Box::new(input))
    }

    fn as_output(&mut self) -> SensorResult<Box<dyn GpioOutput + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::output([self.pin_index as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .active(self.active_level.into())
                .bias(self.bias.into()),
        )?;
        let output = GpiodOutput { pin: self, line };
        Ok(Box::new(output))
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> SensorResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> SensorResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl Drop for GpiodPin<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}

struct GpiodInput<'a> {
    pin: &'a GpiodPin<'a>,
    line: gpiod::Lines<gpiod::Input>,
}

impl Debug for GpiodInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][input]", self.pin.driver, self.pin.pin_index)
    }
}

impl GpioInput for GpiodInput<'_> {
    fn read(&self) -> SensorResult<bool> {
        let values = self.line.get_values([false])?;
        Ok(values[0])
    }
}

struct GpiodOutput<'a> {
    pin: &'a GpiodPin<'a>,
    line: gpiod::Lines<gpiod::Output>,
}

impl Debug for GpiodOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.pin.driver, self.pin.pin_index)
    }
}

impl GpioOutput for GpiodOutput<'_> {
    fn write(&self, value: bool) -> SensorResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}

/// An input line with edge detection, owning its line request.
pub struct GpiodEdgeSource {
    chip_name: String,
    pin_index: usize,
    lines: gpiod::Lines<gpiod::Input>,
}

impl Debug for GpiodEdgeSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})[{}][edges]", self.chip_name, self.pin_index)
    }
}

impl EdgeSource for GpiodEdgeSource {
    fn next_edge(&mut self) -> SensorResult<Edge> {
        let event = self.lines.read_event()?;
        Ok(Edge {
            rising: matches!(event.edge, gpiod::Edge::Rising),
            timestamp: event.time,
        })
    }
}
