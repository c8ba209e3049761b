use log::{debug, warn};
use crate::keypad::{decode_scan_value, KeypadKey, NO_KEY};

/// Turns raw scan values into key presses.
///
/// A key is reported only on the poll where the scan value goes from zero to
/// non-zero; while it stays held every further poll reports no key. Digit keys
/// build up a number and operator keys are kept until consumed.
#[derive(Debug, Clone)]
pub struct ScanDecoder {
    last_key: Option<KeypadKey>,
    awaiting_press: bool,
    accumulated: Option<i64>,
    pending_function: Option<KeypadKey>,
}

impl Default for ScanDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanDecoder {
    /// Creates a decoder that treats the keypad as released.
    pub fn new() -> Self {
        ScanDecoder {
            last_key: None,
            awaiting_press: true,
            accumulated: None,
            pending_function: None,
        }
    }

    /// Decodes one scan value, updating the state, and returns the newly pressed key.
    pub fn decode(&mut self, scan: u32) -> Option<KeypadKey> {
        self.last_key = None;

        if scan == 0 {
            self.awaiting_press = true;
            return None;
        }
        if !self.awaiting_press {
            return None;
        }
        self.awaiting_press = false;

        let code = decode_scan_value(scan);
        let Some(key) = KeypadKey::from_code(code) else {
            warn!("Ignoring scan value {:#010x} (code {}).", scan, code);
            return None;
        };

        match key.digit() {
            Some(digit) => {
                let number = self.accumulated.unwrap_or(0);
                let number = number.saturating_mul(10).saturating_add(digit as i64);
                self.accumulated = Some(number);
            }
            None => {
                self.accumulated = None;
                self.pending_function = Some(key);
            }
        }

        debug!("Decoded {:?} (number: {:?}, function: {:?}).", key, self.accumulated, self.pending_function);
        self.last_key = Some(key);
        Some(key)
    }

    /// Gets the key reported by the last decode.
    pub fn last_key(&self) -> Option<KeypadKey> {
        self.last_key
    }

    /// Gets the key code reported by the last decode, or `-1`.
    pub fn last_key_code(&self) -> i32 {
        self.last_key.map_or(NO_KEY, KeypadKey::code)
    }

    /// Gets the number entered since the last operator.
    pub fn accumulated_number(&self) -> Option<i64> {
        self.accumulated
    }

    /// Gets the number entered since the last operator, or `-1` when none was.
    pub fn read_accumulated_number(&self) -> i64 {
        self.accumulated.unwrap_or(-1)
    }

    /// Consumes the operator decoded since the last call.
    pub fn take_pending_function(&mut self) -> Option<KeypadKey> {
        self.pending_function.take()
    }

    /// Consumes the operator decoded since the last call as its symbol, or `n` when there is none.
    pub fn read_pending_function(&mut self) -> char {
        self.take_pending_function().map_or('n', KeypadKey::to_char)
    }

    /// Whether an operator is waiting to be consumed.
    pub fn has_pending_function(&self) -> bool {
        self.pending_function.is_some()
    }
}
