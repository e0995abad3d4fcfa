//! # Event bus for gate decisions and swallowed failures.
//!
//! [`Bus`] wraps a [`tokio::sync::broadcast`] channel. The gate publishes after
//! it released the table lock, so publishing must never wait on a receiver.
//!
//! ```text
//!   Gate::enter ──┐
//!   Gate::exit  ──┼── publish ──► [ring buffer] ──► subscriber_listener ──► SubscriberSet
//!   table load  ──┤                                 Gate::subscribe() receivers
//!   sub workers ──┘
//! ```
//!
//! A receiver that falls more than `capacity` events behind gets
//! `RecvError::Lagged(n)` and resumes from the oldest retained event. Events
//! published while nobody listens are gone.

use tokio::sync::broadcast;

use super::event::Event;

/// Fire-and-forget broadcast of [`Event`]s. Clones share one channel.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
    capacity: usize,
}

impl Bus {
    /// Creates a bus retaining up to `capacity` events per lagging receiver (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Sends `ev` to every live receiver; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        if self.sender.send(ev).is_err() {
            tracing::trace!("event published without receivers");
        }
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Ring buffer size after clamping.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live receivers.
    pub fn receivers(&self) -> usize {
        self.sender.receiver_count()
    }
}
