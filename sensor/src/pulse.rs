//! Pulse timing on digital inputs.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, warn};
use crate::{GpioInput, SensorResult};

/// How often the monitor logs the measured widths. The log is written on
/// edges, so nothing is logged while the signal is stuck.
const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Measures the next pulse at `level` on the input.
///
/// Waits for the pulse to start, then for it to end. Returns `None` if either
/// does not happen within `timeout` of the call.
pub fn pulse_in(input: &dyn GpioInput, level: bool, timeout: Duration) -> SensorResult<Option<Duration>> {
    let start = Instant::now();

    while input.read()? != level {
        if start.elapsed() >= timeout {
            return Ok(None);
        }
    }

    let pulse_start = Instant::now();
    while input.read()? == level {
        if start.elapsed() >= timeout {
            return Ok(None);
        }
    }

    Ok(Some(pulse_start.elapsed()))
}

/// A level change on an input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Edge {
    /// Whether the input went from low to high.
    pub rising: bool,
    /// When the change happened, on a monotonic clock of the source's choosing.
    pub timestamp: Duration,
}

/// A blocking source of edges, such as an input line with edge detection.
pub trait EdgeSource: Debug {
    /// Waits for the next edge.
    fn next_edge(&mut self) -> SensorResult<Edge>;
}

#[derive(Debug, Default)]
struct PulseWidths {
    high_us: AtomicU32,
    low_us: AtomicU32,
    running: AtomicBool,
}

/// Tracks the width of the latest high and low pulses of a PWM signal on a
/// background thread.
///
/// The widths live in atomics, so reading them never blocks the tracking thread.
pub struct PulseMonitor {
    widths: Arc<PulseWidths>,
    handle: JoinHandle<()>,
}

impl Debug for PulseMonitor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PulseMonitor(high: {:?}, low: {:?})", self.high(), self.low())
    }
}

impl PulseMonitor {
    /// Starts tracking edges from the source.
    ///
    /// The thread runs until the source fails or the monitor is dropped and
    /// another edge arrives.
    pub fn spawn<E: EdgeSource + Send + 'static>(mut source: E) -> SensorResult<Self> {
        let widths = Arc::new(PulseWidths::default());
        widths.running.store(true, Ordering::Relaxed);

        let shared = Arc::clone(&widths);
        let handle = thread::Builder::new()
            .name("pulse-monitor".to_string())
            .spawn(move || track(&mut source, &shared))?;

        debug!("Pulse monitor started.");
        Ok(PulseMonitor { widths, handle })
    }

    /// Gets the width of the latest high pulse.
    pub fn high(&self) -> Duration {
        Duration::from_micros(self.widths.high_us.load(Ordering::Relaxed).into())
    }

    /// Gets the width of the latest low pulse.
    pub fn low(&self) -> Duration {
        Duration::from_micros(self.widths.low_us.load(Ordering::Relaxed).into())
    }

    /// Gets the fraction of the period spent high, once both halves were measured.
    pub fn duty_cycle(&self) -> Option<f32> {
        let high = self.widths.high_us.load(Ordering::Relaxed);
        let low = self.widths.low_us.load(Ordering::Relaxed);
        if high == 0 || low == 0 {
            return None;
        }
        Some(high as f32 / (high as f32 + low as f32))
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PulseMonitor {
    fn drop(&mut self) {
        self.widths.running.store(false, Ordering::Relaxed);
    }
}

fn track(source: &mut dyn EdgeSource, widths: &PulseWidths) {
    let mut previous: Option<Edge> = None;
    let mut last_report = Instant::now();

    while widths.running.load(Ordering::Relaxed) {
        let edge = match source.next_edge() {
            Ok(edge) => edge,
            Err(err) => {
                warn!("Pulse monitor on {:?} stopped: {}", source, err);
                break;
            }
        };

        if let Some(previous) = previous.filter(|previous| previous.rising != edge.rising) {
            let width = edge.timestamp.saturating_sub(previous.timestamp).as_micros();
            let width = u32::try_from(width).unwrap_or(u32::MAX);
            if edge.rising {
                widths.low_us.store(width, Ordering::Relaxed);
            } else {
                widths.high_us.store(width, Ordering::Relaxed);
            }
        }
        previous = Some(edge);

        if last_report.elapsed() >= REPORT_INTERVAL {
            debug!(
                "PWM high {} us, low {} us",
                widths.high_us.load(Ordering::Relaxed),
                widths.low_us.load(Ordering::Relaxed),
            );
            last_report = Instant::now();
        }
    }

    widths.running.store(false, Ordering::Relaxed);
}
