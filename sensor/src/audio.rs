//! The audio module: a microphone level meter with six recording slots.

use std::fmt::{Debug, Formatter};
use log::debug;
use crate::bus::{I2cBus, I2cBusExt, NumberFormat};
use crate::{SensorError, SensorResult};

const COMMAND_RECORD: u16 = 0x0100;
const COMMAND_PLAY: u16 = 0x0200;
const COMMAND_VOLUME: u16 = 0x0300;

/// One of the six recording slots.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SoundIndex {
    One = 1,
    Two,
    Three,
    Four,
    Five,
    Six,
}

impl TryFrom<u8> for SoundIndex {
    type Error = SensorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use SoundIndex::*;

        match value {
            1 => Ok(One),
            2 => Ok(Two),
            3 => Ok(Three),
            4 => Ok(Four),
            5 => Ok(Five),
            6 => Ok(Six),
            _ => Err(SensorError::InvalidArgument),
        }
    }
}

/// Playback volume in 20% steps.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SoundVolume {
    Percent20 = 1,
    Percent40,
    Percent60,
    Percent80,
    Percent100,
}

impl SoundVolume {
    pub fn percent(self) -> u8 {
        self as u8 * 20
    }
}

impl TryFrom<u8> for SoundVolume {
    type Error = SensorError;

    /// Converts a level from `1` (20%) to `5` (100%).
    fn try_from(level: u8) -> Result<Self, Self::Error> {
        use SoundVolume::*;

        match level {
            1 => Ok(Percent20),
            2 => Ok(Percent40),
            3 => Ok(Percent60),
            4 => Ok(Percent80),
            5 => Ok(Percent100),
            _ => Err(SensorError::InvalidArgument),
        }
    }
}

pub struct AudioModule<B> {
    bus: B,
    address: u8,
}

impl<B> Debug for AudioModule<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AudioModule({:#04x})", self.address)
    }
}

impl<B: I2cBus> AudioModule<B> {
    pub const DEFAULT_ADDRESS: u8 = 10;

    pub fn new(bus: B) -> Self {
        Self::with_address(bus, Self::DEFAULT_ADDRESS)
    }

    pub fn with_address(bus: B, address: u8) -> Self {
        AudioModule { bus, address }
    }

    /// Reads the sound intensity picked up by the microphone.
    pub fn volume(&mut self) -> SensorResult<u8> {
        let volume = self.bus.read_register(
            self.address,
            0,
            NumberFormat::UInt8LE,
            NumberFormat::UInt8LE,
        )?;
        Ok(volume as u8)
    }

    pub fn set_volume(&mut self, volume: SoundVolume) -> SensorResult<()> {
        debug!("Setting playback volume to {}%.", volume.percent());
        self.command(COMMAND_VOLUME + volume as u16)
    }

    pub fn play_sound(&mut self, index: SoundIndex) -> SensorResult<()> {
        debug!("Playing recording {}.", index as u8);
        self.command(COMMAND_PLAY + index as u16)
    }

    /// Starts recording into the slot, replacing what it held.
    pub fn record_sound(&mut self, index: SoundIndex) -> SensorResult<()> {
        debug!("Recording into slot {}.", index as u8);
        self.command(COMMAND_RECORD + index as u16)
    }

    pub fn stop_recording(&mut self) -> SensorResult<()> {
        debug!("Stopping recording.");
        self.command(COMMAND_RECORD)
    }

    fn command(&mut self, word: u16) -> SensorResult<()> {
        self.bus.write_register(self.address, word as i64, NumberFormat::UInt16BE)
    }
}
