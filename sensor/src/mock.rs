//! Test doubles for the bus and pin traits.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use crate::bus::I2cBus;
use crate::{AnalogInput, GpioInput, GpioOutput, SensorError, SensorResult};

pub fn no_acknowledge() -> SensorError {
    SensorError::Bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
}

/// A bus that records writes and answers reads from a queue.
///
/// Reads with nothing queued return zeroes.
#[derive(Debug, Default)]
pub struct MockBus {
    pub writes: Vec<(u8, Vec<u8>, bool)>,
    pub reads: Vec<(u8, usize)>,
    pub responses: VecDeque<SensorResult<Vec<u8>>>,
}

impl MockBus {
    pub fn respond(&mut self, bytes: &[u8]) -> &mut Self {
        self.responses.push_back(Ok(bytes.to_vec()));
        self
    }

    pub fn fail(&mut self, err: SensorError) -> &mut Self {
        self.responses.push_back(Err(err));
        self
    }

    /// Gets the written words as big-endian 16-bit numbers.
    pub fn written_words(&self) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(_, bytes, _)| bytes.len() == 2)
            .map(|(_, bytes, _)| u16::from_be_bytes([bytes[0], bytes[1]]))
            .collect()
    }
}

impl I2cBus for MockBus {
    fn write(&mut self, address: u8, bytes: &[u8], repeated: bool) -> SensorResult<()> {
        self.writes.push((address, bytes.to_vec(), repeated));
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> SensorResult<()> {
        self.reads.push((address, buf.len()));
        match self.responses.pop_front() {
            Some(Ok(bytes)) => {
                for (dst, src) in buf.iter_mut().zip(bytes) {
                    *dst = src;
                }
                Ok(())
            }
            Some(Err(err)) => Err(err),
            None => {
                buf.fill(0);
                Ok(())
            }
        }
    }
}

/// An output pin that remembers every level written to it.
#[derive(Debug, Default)]
pub struct MockOutput {
    pub levels: RefCell<Vec<bool>>,
}

impl GpioOutput for MockOutput {
    fn write(&self, value: bool) -> SensorResult<()> {
        self.levels.borrow_mut().push(value);
        Ok(())
    }
}

/// An input pin that plays back a sequence of levels, repeating the last one.
#[derive(Debug, Default)]
pub struct MockInput {
    pub levels: RefCell<VecDeque<bool>>,
    pub reads: Cell<usize>,
}

impl MockInput {
    pub fn with_levels(levels: &[bool]) -> Self {
        MockInput {
            levels: RefCell::new(levels.iter().copied().collect()),
            reads: Cell::new(0),
        }
    }
}

impl GpioInput for MockInput {
    fn read(&self) -> SensorResult<bool> {
        self.reads.set(self.reads.get() + 1);
        let mut levels = self.levels.borrow_mut();
        if levels.len() > 1 {
            Ok(levels.pop_front().unwrap_or(false))
        } else {
            Ok(levels.front().copied().unwrap_or(false))
        }
    }
}

#[derive(Debug)]
pub struct MockAnalog(pub u16);

impl AnalogInput for MockAnalog {
    fn read(&self) -> SensorResult<u16> {
        Ok(self.0)
    }
}
