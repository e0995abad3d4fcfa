//! Deferred side effects of one gate call.
//!
//! Decisions are taken under the table lock, but signals to executions are only
//! delivered after the lock is released: a resumed execution may immediately call
//! back into the gate.

use crate::events::{Event, EventKind};
use crate::segments::{Ordinal, Waiter};

/// Signal owed to an execution once the lock is released.
pub(super) enum Effect {
    /// Let the execution in.
    Proceed {
        job: String,
        segment: String,
        waiter: Waiter,
    },
    /// Abort the execution: `by` took its place.
    Abort {
        job: String,
        segment: String,
        waiter: Waiter,
        by: Ordinal,
    },
}

/// Everything a single `enter`/`exit` produced.
#[derive(Default)]
pub(super) struct Transition {
    pub effects: Vec<Effect>,
    pub events: Vec<Event>,
    /// Whether the table was mutated (and must be persisted).
    pub changed: bool,
}

impl Transition {
    pub fn event(&mut self, kind: EventKind, job: &str, segment: &str, ordinal: Ordinal) -> &mut Event {
        self.events.push(
            Event::new(kind)
                .with_job(job)
                .with_segment(segment)
                .with_ordinal(ordinal),
        );
        let last = self.events.len() - 1;
        &mut self.events[last]
    }

    pub fn admit(&mut self, job: &str, segment: &str, waiter: Waiter) {
        self.event(EventKind::Admitted, job, segment, waiter.ordinal);
        self.proceed(job, segment, waiter);
    }

    /// `after` is the execution whose departure made room.
    pub fn promote(&mut self, job: &str, segment: &str, waiter: Waiter, after: Ordinal) {
        self.event(EventKind::Promoted, job, segment, waiter.ordinal).other = Some(after);
        self.proceed(job, segment, waiter);
    }

    pub fn supersede(&mut self, job: &str, segment: &str, waiter: Waiter, by: Ordinal) {
        self.event(EventKind::Superseded, job, segment, waiter.ordinal).other = Some(by);
        self.effects.push(Effect::Abort {
            job: job.to_string(),
            segment: segment.to_string(),
            waiter,
            by,
        });
    }

    fn proceed(&mut self, job: &str, segment: &str, waiter: Waiter) {
        self.effects.push(Effect::Proceed {
            job: job.to_string(),
            segment: segment.to_string(),
            waiter,
        });
    }
}
