use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Concurrency, Ordinal};
use crate::resume::{Resume, ResumeToken};

/// The single execution parked awaiting entry into a full segment.
///
/// Only `ordinal` and `token` are persisted; the live capability is known only
/// to the process that parked the execution (or rebuilt through a
/// [`Resolve`](crate::Resolve) after a restart).
#[derive(Clone, Serialize, Deserialize)]
pub struct Waiter {
    /// Ordinal of the parked execution.
    pub ordinal: Ordinal,
    /// Durable reference to its resumption capability.
    pub token: ResumeToken,
    #[serde(skip)]
    pub(crate) resume: Option<Arc<dyn Resume>>,
}

impl Waiter {
    /// Wraps a live capability.
    pub fn new(ordinal: Ordinal, resume: Arc<dyn Resume>) -> Self {
        Self {
            ordinal,
            token: resume.token(),
            resume: Some(resume),
        }
    }

    /// Returns the live capability, if this process knows it.
    pub fn resume(&self) -> Option<&Arc<dyn Resume>> {
        self.resume.as_ref()
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("ordinal", &self.ordinal)
            .field("token", &self.token)
            .field("live", &self.resume.is_some())
            .finish()
    }
}

/// One gated group within one job.
///
/// ## Invariants (maintained by the gate)
/// - `holding.len() <= concurrency` unless the limit was lowered while occupied
///   (a waiter promoted then keeps the overcommit).
/// - `waiting` is set only when the segment had no room for it.
/// - `waiting.ordinal` is never in `holding`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Segment {
    holding: BTreeSet<Ordinal>,
    concurrency: Concurrency,
    waiting: Option<Waiter>,
}

impl Segment {
    /// Ordinals currently occupying the segment, ascending.
    pub fn holding(&self) -> &BTreeSet<Ordinal> {
        &self.holding
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// The parked execution, if any.
    pub fn waiting(&self) -> Option<&Waiter> {
        self.waiting.as_ref()
    }

    pub fn waiting_ordinal(&self) -> Option<Ordinal> {
        self.waiting.as_ref().map(|w| w.ordinal)
    }

    /// True if one more holder fits under the current limit.
    pub fn has_room(&self) -> bool {
        self.concurrency.admits(self.holding.len())
    }

    /// Last writer wins; occupants above a lowered limit are not evicted.
    pub(crate) fn set_concurrency(&mut self, concurrency: Concurrency) {
        self.concurrency = concurrency;
    }

    /// Removes `ordinal` from the holders. Returns `true` if it was present.
    pub(crate) fn release(&mut self, ordinal: Ordinal) -> bool {
        self.holding.remove(&ordinal)
    }

    pub(crate) fn take_waiter(&mut self) -> Option<Waiter> {
        self.waiting.take()
    }

    /// Grants entry to `ordinal` and clears the waiting slot.
    pub(crate) fn admit(&mut self, ordinal: Ordinal) {
        self.waiting = None;
        self.holding.insert(ordinal);
    }

    pub(crate) fn park(&mut self, waiter: Waiter) {
        self.waiting = Some(waiter);
    }

    /// Moves the waiter into `holding`, returning it for signalling.
    ///
    /// Called after a holder left. The limit is not checked: a segment whose
    /// concurrency was lowered stays overcommitted instead of starving its waiter.
    pub(crate) fn promote(&mut self) -> Option<Waiter> {
        let waiter = self.waiting.take()?;
        self.holding.insert(waiter.ordinal);
        Some(waiter)
    }
}
