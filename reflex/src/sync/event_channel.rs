//! Unbounded blocking queue from the round loop to a single observer.
//!
//! - [`Publisher`] - write end; cloneable, [`publish`](Publisher::publish) never waits
//!   for the consumer
//! - [`Subscriber`] - read end; exactly one, parks until an event arrives
//!
//! Events are human-paced (a few per round) so the queue is unbounded.
//! Unlike the judging window, an idle observer must not spin.
//!
//! # Example
//!
//! ```
//! use reflex::sync::event_channel;
//!
//! let (publisher, subscriber) = event_channel::channel::<String>();
//!
//! std::thread::spawn(move || publisher.publish("Red wins in 212 milliseconds".to_string()));
//!
//! assert_eq!(subscriber.consume().as_deref(), Some("Red wins in 212 milliseconds"));
//! ```

use std::cell::Cell;
use std::marker::PhantomData;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};

/// Timeout specification for blocking operations.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Marker type to opt-out of `Sync` while remaining `Send`.
type PhantomUnsync = PhantomData<Cell<&'static ()>>;

/// Write end of the channel.
#[derive(Clone)]
pub struct Publisher<T> {
    sender: Sender<T>,
}

/// Read end of the channel.
///
/// `Send` but neither `Sync` nor `Clone`: there is exactly one consumer.
pub struct Subscriber<T> {
    receiver: Receiver<T>,
    _unsync: PhantomUnsync,
}

/// Creates a new channel.
#[must_use]
pub fn channel<T: Send>() -> (Publisher<T>, Subscriber<T>) {
    let (sender, receiver) = crossbeam::channel::unbounded();
    (
        Publisher { sender },
        Subscriber {
            receiver,
            _unsync: PhantomData,
        },
    )
}

impl<T> Publisher<T> {
    /// Queues `event` and wakes the subscriber.
    ///
    /// An event published after the subscriber is gone is dropped.
    pub fn publish(&self, event: T) {
        let _ = self.sender.send(event);
    }
}

impl<T> Subscriber<T> {
    /// Blocks until an event is available and returns it, oldest first.
    ///
    /// Returns `None` once every [`Publisher`] is gone and the queue is drained.
    #[must_use]
    pub fn consume(&self) -> Option<T> {
        self.consume_timeout(Timeout::Infinite)
    }

    /// Like [`consume`](Self::consume), giving up after `timeout`.
    #[must_use]
    pub fn consume_timeout(&self, timeout: impl Into<Timeout>) -> Option<T> {
        match timeout.into() {
            Timeout::Infinite => self.receiver.recv().ok(),
            Timeout::Duration(d) => match self.receiver.recv_timeout(d) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
        }
    }

    /// Pops an event if one is queued, without waiting.
    #[must_use]
    pub fn try_consume(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
