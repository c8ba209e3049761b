mod i2c;
mod decoder;
mod dispatch;

use std::fmt::Debug;
use crate::SensorResult;
pub use i2c::*;
pub use decoder::*;
pub use dispatch::*;

/// Legacy key code reported when no key is pressed.
pub const NO_KEY: i32 = -1;
/// Legacy key code matching any pressed key. Never produced by decoding.
pub const ANY_KEY: i32 = 17;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    /// Reads the raw scan value. Zero means no key is pressed.
    fn read_scan(&mut self) -> SensorResult<u32>;
}

impl<T: Keypad + ?Sized> Keypad for &mut T {
    fn read_scan(&mut self) -> SensorResult<u32> {
        (**self).read_scan()
    }
}

/// Represents the keys on the calculator keypad.
///
/// The discriminants are the legacy key codes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    /// The `0` key.
    Key0 = 0,
    /// The `1` key.
    Key1,
    /// The `2` key.
    Key2,
    /// The `3` key.
    Key3,
    /// The `4` key.
    Key4,
    /// The `5` key.
    Key5,
    /// The `6` key.
    Key6,
    /// The `7` key.
    Key7,
    /// The `8` key.
    Key8,
    /// The `9` key.
    Key9,
    /// The `+` key.
    KeyPlus,
    /// The `-` key.
    KeyMinus,
    /// The `*` key.
    KeyMultiply,
    /// The `/` key.
    KeyDivide,
    /// The `=` key.
    KeyEquals,
    /// The `.` key.
    KeyDot,
    /// The clear key.
    KeyClear,
}

impl KeypadKey {
    const KEYS: [KeypadKey; 17] = {
        use KeypadKey::*;
        [
            Key0, Key1, Key2, Key3, Key4, Key5, Key6, Key7, Key8, Key9,
            KeyPlus, KeyMinus, KeyMultiply, KeyDivide, KeyEquals, KeyDot, KeyClear,
        ]
    };

    /// Converts a legacy key code to a [KeypadKey].
    pub fn from_code(code: i32) -> Option<KeypadKey> {
        usize::try_from(code).ok().and_then(|index| Self::KEYS.get(index).copied())
    }

    /// Gets the legacy key code of the key.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Gets the digit value for digit keys.
    pub fn digit(self) -> Option<u8> {
        let code = self.code();
        (code <= 9).then_some(code as u8)
    }

    /// Whether the key is one of the non-digit keys, clear included.
    pub fn is_operator(self) -> bool {
        self.digit().is_none()
    }

    /// Converts the [KeypadKey] to its corresponding character.
    ///
    /// The clear key maps to `c`.
    pub fn to_char(self) -> char {
        use KeypadKey::*;

        match self {
            KeyPlus => '+',
            KeyMinus => '-',
            KeyMultiply => '*',
            KeyDivide => '/',
            KeyEquals => '=',
            KeyDot => '.',
            KeyClear => 'c',
            digit => char::from(b'0' + digit.code() as u8),
        }
    }
}

/// Maps a raw scan value to a legacy key code without any state.
///
/// The scan value has one bit set for the pressed key; bit 8 is the `0` key.
/// A scan value of `1` is the clear key. Codes outside `0..=16` do not name a key.
pub fn decode_scan_value(scan: u32) -> i32 {
    match scan {
        0 => NO_KEY,
        1 => KeypadKey::KeyClear.code(),
        _ => scan.ilog2() as i32 - 8,
    }
}

/// Selects the keys a dispatcher callback fires for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyMatch {
    /// A single key.
    Key(KeypadKey),
    /// Any decoded key press.
    Any,
    /// Polls where no key press was reported.
    Idle,
}

impl KeyMatch {
    /// Converts a legacy key code, including [NO_KEY] and [ANY_KEY].
    pub fn from_code(code: i32) -> Option<KeyMatch> {
        match code {
            NO_KEY => Some(KeyMatch::Idle),
            ANY_KEY => Some(KeyMatch::Any),
            _ => KeypadKey::from_code(code).map(KeyMatch::Key),
        }
    }

    /// Whether a callback registered for this match fires for the decoded key.
    pub fn matches(self, key: Option<KeypadKey>) -> bool {
        match (self, key) {
            (KeyMatch::Key(expected), Some(key)) => expected == key,
            (KeyMatch::Any, Some(_)) => true,
            (KeyMatch::Idle, None) => true,
            _ => false,
        }
    }
}

impl From<KeypadKey> for KeyMatch {
    fn from(key: KeypadKey) -> Self {
        KeyMatch::Key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_values_map_to_bit_positions() {
        assert_eq!(decode_scan_value(0), NO_KEY);
        assert_eq!(decode_scan_value(1), 16);
        assert_eq!(decode_scan_value(1 << 8), 0);
        assert_eq!(decode_scan_value(1 << 17), 9);
        assert_eq!(decode_scan_value(1 << 18), 10);
        assert_eq!(decode_scan_value((1 << 12) | 1), 4);
        assert_eq!(decode_scan_value(2), -7);
    }

    #[test]
    fn codes_round_trip_through_keys() {
        for code in 0..=16 {
            let key = KeypadKey::from_code(code).unwrap();
            assert_eq!(key.code(), code);
        }
        assert_eq!(KeypadKey::from_code(NO_KEY), None);
        assert_eq!(KeypadKey::from_code(ANY_KEY), None);
        assert_eq!(KeypadKey::Key7.to_char(), '7');
        assert_eq!(KeypadKey::KeyClear.to_char(), 'c');
        assert!(KeypadKey::KeyDot.is_operator());
        assert_eq!(KeypadKey::Key3.digit(), Some(3));
    }

    #[test]
    fn key_matches() {
        use KeypadKey::*;

        assert!(KeyMatch::from(Key5).matches(Some(Key5)));
        assert!(!KeyMatch::from(Key5).matches(Some(Key6)));
        assert!(!KeyMatch::from(Key5).matches(None));
        assert!(KeyMatch::Any.matches(Some(KeyClear)));
        assert!(!KeyMatch::Any.matches(None));
        assert!(KeyMatch::Idle.matches(None));
        assert_eq!(KeyMatch::from_code(ANY_KEY), Some(KeyMatch::Any));
        assert_eq!(KeyMatch::from_code(NO_KEY), Some(KeyMatch::Idle));
        assert_eq!(KeyMatch::from_code(18), None);
    }
}
