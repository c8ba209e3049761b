//! The module for the calculator state and logic.

use std::fmt::{Debug, Formatter};
use log::{debug, info, warn};
use hetao_sensor::audio::{AudioModule, SoundIndex};
use hetao_sensor::bus::I2cBus;
use hetao_sensor::keypad::{KeypadKey, ScanDecoder};

/// A four-function calculator fed by decoded key presses.
///
/// Operators are applied left to right, without precedence.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Calculator {
    /// The result so far.
    total: Option<f64>,
    /// The operator waiting for its right operand.
    operator: Option<KeypadKey>,
    /// The operand being typed.
    entry: Option<f64>,
    /// The integer part of the operand, once `.` was pressed.
    integer_part: Option<f64>,
    fraction_digits: i32,
}

impl Calculator {
    /// Handles the key reported by the last decode.
    ///
    /// Returns the result when `=` was pressed.
    pub fn on_key(&mut self, decoder: &mut ScanDecoder) -> Option<f64> {
        let key = decoder.last_key()?;

        if let Some(digit) = key.digit() {
            let number = decoder.accumulated_number().unwrap_or(digit as i64);
            self.enter(number);
            return None;
        }

        match decoder.take_pending_function()? {
            KeypadKey::KeyClear => {
                *self = Calculator::default();
                None
            }
            KeypadKey::KeyDot => {
                match self.integer_part {
                    None => {
                        self.integer_part = Some(self.entry.unwrap_or(0.0).trunc());
                        self.entry = self.integer_part;
                        self.fraction_digits = 0;
                    }
                    // The decoder restarted its number, so the digits so far become the base.
                    Some(_) => self.integer_part = self.entry.or(self.integer_part),
                }
                None
            }
            KeypadKey::KeyEquals => {
                self.fold();
                self.operator = None;
                self.total
            }
            operator => {
                self.fold();
                if self.total.is_some() {
                    self.operator = Some(operator);
                }
                None
            }
        }
    }

    /// Sets the operand from the digits typed since the last operator.
    fn enter(&mut self, digits: i64) {
        if self.operator.is_none() && self.entry.is_none() {
            // A new number after `=` starts over.
            self.total = None;
        }

        self.entry = Some(match self.integer_part {
            Some(integer_part) => {
                self.fraction_digits += 1;
                integer_part + digits as f64 / 10f64.powi(self.fraction_digits)
            }
            None => digits as f64,
        });
    }

    /// Applies the pending operator to the typed operand.
    fn fold(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        self.integer_part = None;
        self.fraction_digits = 0;

        self.total = match (self.total, self.operator) {
            (Some(total), Some(operator)) => match operator {
                KeypadKey::KeyPlus => Some(total + entry),
                KeypadKey::KeyMinus => Some(total - entry),
                KeypadKey::KeyMultiply => Some(total * entry),
                KeypadKey::KeyDivide if entry == 0.0 => {
                    warn!("Division by zero, clearing.");
                    None
                }
                KeypadKey::KeyDivide => Some(total / entry),
                _ => Some(entry),
            },
            _ => Some(entry),
        };
        if self.total.is_none() {
            self.operator = None;
        }
    }

    /// Gets what a display would show: the operand being typed, or the result so far.
    pub fn display(&self) -> String {
        match self.entry.or(self.total) {
            Some(value) => format_number(value),
            None => "0".to_string(),
        }
    }
}

/// Formats a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// The main app state struct.
pub struct App<B> {
    calculator: Calculator,
    /// The audio module used to confirm results.
    audio: AudioModule<B>,
    /// The recording played when a result is shown.
    result_sound: Option<SoundIndex>,
}

impl<B> Debug for App<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("calculator", &self.calculator)
            .field("result_sound", &self.result_sound)
            .finish()
    }
}

impl<B: I2cBus> App<B> {
    pub fn new(audio: AudioModule<B>, result_sound: Option<SoundIndex>) -> Self {
        App {
            calculator: Calculator::default(),
            audio,
            result_sound,
        }
    }

    /// Feeds the decoded key to the calculator, showing and sounding results.
    pub fn on_key(&mut self, decoder: &mut ScanDecoder) {
        let Some(key) = decoder.last_key() else {
            return;
        };

        match self.calculator.on_key(decoder) {
            Some(result) => {
                info!("= {}", format_number(result));
                if let Some(sound) = self.result_sound {
                    if let Err(e) = self.audio.play_sound(sound) {
                        warn!("Failed to play result sound: {}", e);
                    }
                }
            }
            None => debug!("{} -> {}", key.to_char(), self.calculator.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetao_sensor::SensorResult;

    fn scan_of(key: KeypadKey) -> u32 {
        1 << (key.code() + 8)
    }

    fn key_of(c: char) -> KeypadKey {
        (0..17)
            .filter_map(KeypadKey::from_code)
            .find(|key| key.to_char() == c)
            .unwrap()
    }

    /// Types the keys, returning the last result shown.
    fn type_keys(calculator: &mut Calculator, keys: &str) -> Option<f64> {
        let mut decoder = ScanDecoder::new();
        let mut result = None;
        for c in keys.chars().filter(|c| !c.is_whitespace()) {
            decoder.decode(scan_of(key_of(c)));
            if let Some(value) = calculator.on_key(&mut decoder) {
                result = Some(value);
            }
            decoder.decode(0);
        }
        result
    }

    #[test]
    fn adds_and_multiplies_left_to_right() {
        let mut calculator = Calculator::default();
        assert_eq!(type_keys(&mut calculator, "12 + 3 ="), Some(15.0));
        assert_eq!(type_keys(&mut calculator, "2 + 3 * 4 ="), Some(20.0));
    }

    #[test]
    fn continues_from_result() {
        let mut calculator = Calculator::default();
        assert_eq!(type_keys(&mut calculator, "9 - 4 ="), Some(5.0));
        assert_eq!(type_keys(&mut calculator, "* 3 ="), Some(15.0));
        assert_eq!(calculator.display(), "15");
    }

    #[test]
    fn new_number_after_result_starts_over() {
        let mut calculator = Calculator::default();
        type_keys(&mut calculator, "9 - 4 =");
        assert_eq!(type_keys(&mut calculator, "7 ="), Some(7.0));
    }

    #[test]
    fn decimals() {
        let mut calculator = Calculator::default();
        let result = type_keys(&mut calculator, "1.05 + 2.5 =").unwrap();
        assert!((result - 3.55).abs() < 1e-9);
    }

    #[test]
    fn repeated_dot_keeps_fraction() {
        let mut calculator = Calculator::default();
        let result = type_keys(&mut calculator, "1.5.2 =").unwrap();
        assert!((result - 1.52).abs() < 1e-9);

        let result = type_keys(&mut calculator, "3..25 =").unwrap();
        assert!((result - 3.25).abs() < 1e-9);
    }

    #[test]
    fn division_by_zero_clears() {
        let mut calculator = Calculator::default();
        assert_eq!(type_keys(&mut calculator, "8 / 0 ="), None);
        assert_eq!(calculator.display(), "0");
        assert_eq!(type_keys(&mut calculator, "8 / 2 ="), Some(4.0));
    }

    #[test]
    fn clear_resets() {
        let mut calculator = Calculator::default();
        type_keys(&mut calculator, "42 + 1 c");
        assert_eq!(calculator, Calculator::default());
    }

    /// Records the words written to the audio module.
    #[derive(Debug, Default)]
    struct RecordingBus(Vec<(u8, Vec<u8>)>);

    impl I2cBus for RecordingBus {
        fn write(&mut self, address: u8, bytes: &[u8], _repeated: bool) -> SensorResult<()> {
            self.0.push((address, bytes.to_vec()));
            Ok(())
        }

        fn read(&mut self, _address: u8, buf: &mut [u8]) -> SensorResult<()> {
            buf.fill(0);
            Ok(())
        }
    }

    #[test]
    fn result_plays_sound() {
        let mut bus = RecordingBus::default();
        let mut app = App::new(AudioModule::new(&mut bus), Some(SoundIndex::Two));
        let mut decoder = ScanDecoder::new();
        for key in [KeypadKey::Key4, KeypadKey::KeyPlus, KeypadKey::Key4, KeypadKey::KeyEquals] {
            decoder.decode(scan_of(key));
            app.on_key(&mut decoder);
            decoder.decode(0);
            app.on_key(&mut decoder);
        }
        assert_eq!(app.calculator.display(), "8");
        drop(app);

        assert_eq!(bus.0, vec![(10, vec![0x02, 0x02])]);
    }

    #[test]
    fn formats_whole_numbers_without_fraction() {
        assert_eq!(format_number(15.0), "15");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(2.5), "2.5");
    }
}
