use std::fmt::{Debug, Formatter};
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, warn};
use crate::keypad::{KeyMatch, Keypad, KeypadKey, ScanDecoder};
use crate::{SensorError, SensorResult};

/// A callback run by the [KeypadDispatcher]. It gets the decoder so it can read
/// the entered number and consume the pending operator.
pub type KeyAction<'a> = Box<dyn FnMut(&mut ScanDecoder) + 'a>;

/// Polls a keypad, decodes presses and runs the callbacks registered for them.
pub struct KeypadDispatcher<'a, K> {
    keypad: K,
    decoder: ScanDecoder,
    callbacks: Vec<(KeyMatch, KeyAction<'a>)>,
}

impl<K: Debug> Debug for KeypadDispatcher<'_, K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeypadDispatcher({:?}, {} callbacks)", self.keypad, self.callbacks.len())
    }
}

impl<'a, K: Keypad> KeypadDispatcher<'a, K> {
    /// Creates a dispatcher with no callbacks and a released keypad.
    pub fn new(keypad: K) -> Self {
        KeypadDispatcher {
            keypad,
            decoder: ScanDecoder::new(),
            callbacks: Vec::new(),
        }
    }

    /// Gets the decoder state as left by the last poll.
    pub fn decoder(&self) -> &ScanDecoder {
        &self.decoder
    }

    /// Registers a callback. Callbacks run in registration order and the same
    /// key may be registered any number of times.
    pub fn register(
        &mut self,
        key: impl Into<KeyMatch>,
        action: impl FnMut(&mut ScanDecoder) + 'a,
    ) {
        self.callbacks.push((key.into(), Box::new(action)));
    }

    /// Registers a callback for a legacy key code, `17` being any key and `-1` no key.
    ///
    /// # Errors
    /// - `SensorError::InvalidArgument` if the code is outside `-1..=17`.
    pub fn register_code(
        &mut self,
        code: i32,
        action: impl FnMut(&mut ScanDecoder) + 'a,
    ) -> SensorResult<()> {
        let key = KeyMatch::from_code(code).ok_or(SensorError::InvalidArgument)?;
        self.register(key, action);
        Ok(())
    }

    /// Runs every callback matching the last decoded key and returns how many ran.
    pub fn dispatch(&mut self) -> usize {
        let key = self.decoder.last_key();
        let mut fired = 0;
        for (key_match, action) in self.callbacks.iter_mut() {
            if key_match.matches(key) {
                action(&mut self.decoder);
                fired += 1;
            }
        }
        fired
    }

    /// Runs one polling cycle: reads the keypad, decodes and dispatches.
    pub fn poll(&mut self) -> SensorResult<Option<KeypadKey>> {
        let scan = self.keypad.read_scan()?;
        let key = self.decoder.decode(scan);
        let fired = self.dispatch();
        if let Some(key) = key {
            debug!("{:?} pressed, {} callbacks fired.", key, fired);
        }
        Ok(key)
    }

    /// Polls forever, sleeping `interval` between cycles.
    ///
    /// A failed keypad read skips the cycle without touching the decoder.
    /// Callbacks are not isolated, so one that hangs stops the loop.
    pub fn run(&mut self, interval: Duration) -> ! {
        loop {
            let start = Instant::now();

            if let Err(err) = self.poll() {
                warn!("Keypad poll failed: {}", err);
            }

            let elapsed = start.elapsed();
            if elapsed > interval {
                warn!("Keypad cycle took {:?}, longer than the {:?} interval.", elapsed, interval);
            }

            thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use crate::mock::no_acknowledge;
    use KeypadKey::*;

    #[derive(Debug, Default)]
    struct ScriptedKeypad {
        scans: VecDeque<SensorResult<u32>>,
    }

    impl ScriptedKeypad {
        fn keys(keys: &[Option<KeypadKey>]) -> Self {
            let scans = keys
                .iter()
                .map(|key| Ok(key.map_or(0, |key| 1 << (key.code() + 8))))
                .collect();
            ScriptedKeypad { scans }
        }
    }

    impl Keypad for ScriptedKeypad {
        fn read_scan(&mut self) -> SensorResult<u32> {
            self.scans.pop_front().unwrap_or(Ok(0))
        }
    }

    #[test]
    fn callback_fires_once_per_press() {
        let fired = RefCell::new(0);
        let keypad = ScriptedKeypad::keys(&[None, Some(Key5), Some(Key5), Some(Key5), None, Some(Key6), None, Some(Key5)]);
        let mut dispatcher = KeypadDispatcher::new(keypad);
        dispatcher.register(Key5, |_| *fired.borrow_mut() += 1);

        for _ in 0..8 {
            dispatcher.poll().unwrap();
        }

        assert_eq!(*fired.borrow(), 2);
    }

    #[test]
    fn duplicate_registrations_fire_in_order() {
        let order = RefCell::new(Vec::new());
        let keypad = ScriptedKeypad::keys(&[Some(Key5)]);
        let mut dispatcher = KeypadDispatcher::new(keypad);
        dispatcher.register(Key5, |_| order.borrow_mut().push("first"));
        dispatcher.register(Key6, |_| order.borrow_mut().push("other"));
        dispatcher.register(Key5, |_| order.borrow_mut().push("second"));

        assert_eq!(dispatcher.poll(), Ok(Some(Key5)));

        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn legacy_codes_register_wildcard_and_idle() {
        let seen = RefCell::new(Vec::new());
        let idle = RefCell::new(0);
        let keypad = ScriptedKeypad::keys(&[Some(Key1), Some(Key1), None, Some(KeyPlus)]);
        let mut dispatcher = KeypadDispatcher::new(keypad);
        dispatcher
            .register_code(17, |decoder| seen.borrow_mut().push(decoder.last_key_code()))
            .unwrap();
        dispatcher.register_code(-1, |_| *idle.borrow_mut() += 1).unwrap();
        assert_eq!(dispatcher.register_code(18, |_| {}), Err(SensorError::InvalidArgument));

        for _ in 0..4 {
            dispatcher.poll().unwrap();
        }

        assert_eq!(*seen.borrow(), vec![1, 10]);
        assert_eq!(*idle.borrow(), 2);
    }

    #[test]
    fn callbacks_consume_decoder_state() {
        let captured = RefCell::new(Vec::new());
        let keypad = ScriptedKeypad::keys(&[Some(Key4), None, Some(Key2), None, Some(KeyMultiply)]);
        let mut dispatcher = KeypadDispatcher::new(keypad);
        dispatcher.register(KeyMatch::Any, |decoder| {
            let number = decoder.read_accumulated_number();
            let function = decoder.read_pending_function();
            captured.borrow_mut().push((number, function));
        });

        for _ in 0..5 {
            dispatcher.poll().unwrap();
        }

        assert_eq!(*captured.borrow(), vec![(4, 'n'), (42, 'n'), (-1, '*')]);
        assert!(!dispatcher.decoder().has_pending_function());
    }

    #[test]
    fn failed_read_leaves_decoder_untouched() {
        let fired = RefCell::new(0);
        let mut keypad = ScriptedKeypad::keys(&[Some(Key3)]);
        keypad.scans.push_front(Err(no_acknowledge()));
        let mut dispatcher = KeypadDispatcher::new(keypad);
        dispatcher.register(Key3, |_| *fired.borrow_mut() += 1);

        assert_eq!(dispatcher.poll(), Err(no_acknowledge()));
        assert_eq!(*fired.borrow(), 0);
        assert_eq!(dispatcher.poll(), Ok(Some(Key3)));
        assert_eq!(*fired.borrow(), 1);
    }
}
