//! # Gate events emitted by the admission and release engines.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Decision events**: what the gate did with an execution (admitted, parked, promoted, ...)
//! - **Failure events**: swallowed failures (cancel, persist, load, unresolved capability)
//! - **Subscriber events**: fan-out problems (overflow, panic)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, job and segment
//! names, the execution ordinal and its counterpart.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use segvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Superseded)
//!     .with_job("app")
//!     .with_segment("build")
//!     .with_ordinal(2)
//!     .with_other(5);
//!
//! assert_eq!(ev.kind, EventKind::Superseded);
//! assert_eq!(ev.job.as_deref(), Some("app"));
//! assert_eq!(ev.other, Some(5));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::segments::Ordinal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of gate events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and reason (e.g., "full", "closed")
    SubscriberOverflow,

    // === Table lifecycle ===
    /// Segment table was loaded from the snapshot store.
    ///
    /// Sets:
    /// - `reason`: store name
    TableLoaded,

    /// Snapshot could not be read; the gate starts from an empty table.
    ///
    /// Sets:
    /// - `reason`: store error
    LoadFailed,

    /// Snapshot could not be written; in-memory state stays authoritative.
    ///
    /// Sets:
    /// - `job`: job whose call triggered the write
    /// - `reason`: store error
    PersistFailed,

    // === Admission decisions ===
    /// Execution entered a segment immediately.
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`
    Admitted,

    /// Execution became the sole waiter of a full segment.
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`
    Parked,

    /// Waiter was granted entry after a slot freed up.
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`: the promoted waiter
    /// - `other`: the execution whose departure freed the slot
    Promoted,

    /// Execution lost a waiter conflict and is being cancelled.
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`: the cancelled execution
    /// - `other`: the newer contender that displaced it
    Superseded,

    /// Execution left a segment (cross-segment release or exit).
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`
    Released,

    /// Execution tried to enter a segment it is already parked on.
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`
    Reentered,

    // === Swallowed failures ===
    /// Displaced execution could not be aborted.
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`
    /// - `other`: the execution that displaced it
    /// - `reason`: abort error
    CancelFailed,

    /// No live capability was known for a waiter and the resolver could not rebuild one.
    ///
    /// Sets:
    /// - `job`, `segment`, `ordinal`
    /// - `reason`: resume token
    ResumeUnresolved,
}

/// Gate event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Job identifier, if applicable.
    pub job: Option<Arc<str>>,
    /// Segment name, if applicable.
    pub segment: Option<Arc<str>>,
    /// Ordinal of the execution the event is about.
    pub ordinal: Option<Ordinal>,
    /// Ordinal of the counterpart execution (displacer, releaser).
    pub other: Option<Ordinal>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            segment: None,
            ordinal: None,
            other: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a job identifier.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a segment name.
    #[inline]
    pub fn with_segment(mut self, segment: impl Into<Arc<str>>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Attaches the ordinal of the execution this event is about.
    #[inline]
    pub fn with_ordinal(mut self, ordinal: Ordinal) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Attaches the ordinal of the counterpart execution.
    #[inline]
    pub fn with_other(mut self, other: Ordinal) -> Self {
        self.other = Some(other);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// True for events that report a swallowed failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::LoadFailed
                | EventKind::PersistFailed
                | EventKind::CancelFailed
                | EventKind::ResumeUnresolved
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::Admitted);
        let b = Event::new(EventKind::Parked);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_failure_classification() {
        assert!(Event::new(EventKind::PersistFailed).is_failure());
        assert!(Event::new(EventKind::ResumeUnresolved).is_failure());
        assert!(!Event::new(EventKind::Promoted).is_failure());
        assert!(Event::subscriber_overflow("log", "full").is_subscriber_overflow());
    }
}
