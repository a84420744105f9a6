//! Output side of a seat: the per-player indicator.
//!
//! The referee never talks to hardware. It drives a [`SignalSink`], which
//! a front end implements for LEDs, a terminal, or anything else. Calls are
//! fire-and-forget; an implementation must return promptly (a blink runs in
//! the background on real hardware).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Per-player indicator capability.
pub trait SignalSink: Send + Sync {
    /// Indicator to the "armed" state.
    fn turn_on(&self);

    /// Indicator back to idle.
    fn turn_off(&self);

    /// Flash `count` times, `on` lit then `off` dark each time.
    fn blink(&self, on: Duration, off: Duration, count: u32);
}

impl<T: SignalSink + ?Sized> SignalSink for Arc<T> {
    fn turn_on(&self) {
        (**self).turn_on();
    }

    fn turn_off(&self) {
        (**self).turn_off();
    }

    fn blink(&self, on: Duration, off: Duration, count: u32) {
        (**self).blink(on, off, count);
    }
}

impl<T: SignalSink + ?Sized> SignalSink for Box<T> {
    fn turn_on(&self) {
        (**self).turn_on();
    }

    fn turn_off(&self) {
        (**self).turn_off();
    }

    fn blink(&self, on: Duration, off: Duration, count: u32) {
        (**self).blink(on, off, count);
    }
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SignalSink for NullSink {
    fn turn_on(&self) {}
    fn turn_off(&self) {}
    fn blink(&self, _on: Duration, _off: Duration, _count: u32) {}
}

/// One call made on a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    On,
    Off,
    Blink { on: Duration, off: Duration, count: u32 },
}

/// Sink that remembers every call, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    signals: Mutex<Vec<Signal>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, signal: Signal) {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(signal);
    }
}

impl SignalSink for RecordingSink {
    fn turn_on(&self) {
        self.record(Signal::On);
    }

    fn turn_off(&self) {
        self.record(Signal::Off);
    }

    fn blink(&self, on: Duration, off: Duration, count: u32) {
        self.record(Signal::Blink { on, off, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.turn_on();
        sink.turn_off();
        sink.blink(Duration::from_millis(50), Duration::from_millis(50), 5);

        assert_eq!(
            sink.signals(),
            vec![
                Signal::On,
                Signal::Off,
                Signal::Blink {
                    on: Duration::from_millis(50),
                    off: Duration::from_millis(50),
                    count: 5
                }
            ]
        );
    }

    #[test]
    fn test_arc_sink_forwards() {
        let sink = Arc::new(RecordingSink::new());
        let boxed: Box<dyn SignalSink> = Box::new(Arc::clone(&sink));

        boxed.turn_on();

        assert_eq!(sink.signals(), vec![Signal::On]);
    }
}
