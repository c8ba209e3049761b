use std::fmt::Debug;
use std::ops::Range;
use std::str::FromStr;
use crate::{AnalogInput, SensorError, SensorResult};

/// Readings above this mean the switch is in position 0.
const POSITION_ZERO_THRESHOLD: u16 = 1000;

/// Reading ranges of positions 1 to 9. The resistor ladder does not put them in order.
const POSITIONS: [(u8, Range<u16>); 9] = [
    (1, 170..180),
    (2, 250..270),
    (3, 110..125),
    (4, 500..550),
    (5, 140..155),
    (6, 190..220),
    (7, 90..110),
    (8, 600..700),
    (9, 155..170),
];

/// The analog edge connector pins, with their legacy pin ids.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AnalogPin {
    P0 = 100,
    P1 = 101,
    P2 = 102,
}

impl AnalogPin {
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Gets the ADC channel the pin is wired to.
    pub fn channel(self) -> u8 {
        (self.id() - AnalogPin::P0.id()) as u8
    }
}

impl FromStr for AnalogPin {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "P0" | "p0" | "100" => Ok(AnalogPin::P0),
            "P1" | "p1" | "101" => Ok(AnalogPin::P1),
            "P2" | "p2" | "102" => Ok(AnalogPin::P2),
            _ => Err(SensorError::Other(format!("unknown analog pin {:?}", s))),
        }
    }
}

/// Maps an analog reading to a switch position.
pub fn position_from_reading(reading: u16) -> Option<u8> {
    if reading > POSITION_ZERO_THRESHOLD {
        return Some(0);
    }
    POSITIONS
        .iter()
        .find(|(_, range)| range.contains(&reading))
        .map(|&(position, _)| position)
}

/// The ten-position encoder switch, read through a resistor ladder.
#[derive(Debug)]
pub struct Knob<'a> {
    input: &'a dyn AnalogInput,
}

impl<'a> Knob<'a> {
    pub fn new(input: &'a dyn AnalogInput) -> Self {
        Knob { input }
    }

    pub fn read_position(&self) -> SensorResult<Option<u8>> {
        Ok(position_from_reading(self.input.read()?))
    }

    /// Reads the position, or `-1` between positions.
    pub fn read_knob(&self) -> SensorResult<i32> {
        Ok(self.read_position()?.map_or(-1, i32::from))
    }
}
