use std::fmt::{Debug, Formatter};
use crate::bus::{I2cBus, I2cBusExt, NumberFormat};
use crate::keypad::{decode_scan_value, Keypad};
use crate::SensorResult;

/// The calculator keypad module, reporting the pressed key as a one-hot scan value.
pub struct I2cKeypad<B> {
    bus: B,
    address: u8,
}

impl<B> Debug for I2cKeypad<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "I2cKeypad({:#04x})", self.address)
    }
}

impl<B: I2cBus> I2cKeypad<B> {
    pub const DEFAULT_ADDRESS: u8 = 16;

    /// Creates a keypad at the default address.
    pub fn new(bus: B) -> Self {
        Self::with_address(bus, Self::DEFAULT_ADDRESS)
    }

    pub fn with_address(bus: B, address: u8) -> Self {
        I2cKeypad { bus, address }
    }

    /// Reads the current key as a legacy key code, without debouncing.
    ///
    /// Returns `-1` when no key is pressed.
    pub fn read_number_keys(&mut self) -> SensorResult<i32> {
        let scan = self.read_scan()?;
        Ok(decode_scan_value(scan))
    }
}

impl<B: I2cBus> Keypad for I2cKeypad<B> {
    fn read_scan(&mut self) -> SensorResult<u32> {
        let scan = self.bus.read_register(
            self.address,
            0,
            NumberFormat::UInt8LE,
            NumberFormat::UInt32LE,
        )?;
        Ok(scan as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    #[test]
    fn reads_scan_value_after_selecting_register_zero() {
        let mut bus = MockBus::default();
        bus.respond(&[0x00, 0x00, 0x02, 0x00]);

        let mut keypad = I2cKeypad::new(&mut bus);
        assert_eq!(keypad.read_number_keys(), Ok(9));

        assert_eq!(bus.writes, vec![(16, vec![0], true)]);
        assert_eq!(bus.reads, vec![(16, 4)]);
    }
}
