//! # Admission engine
//!
//! Every segment is a counting semaphore with a single waiting seat. When an
//! execution asks to enter a full segment, the seat goes to the **newest** contender:
//!
//! ## Waiter conflicts
//! - seat empty: the contender takes it (or enters directly if there is room);
//! - seat holds an **older** execution: the older one is aborted, the contender proceeds;
//! - seat holds a **newer** execution: the contender is aborted, and the rest of the
//!   algorithm runs on behalf of the seated waiter (it re-parks, or enters if the
//!   contender's concurrency just made room);
//! - seat holds the **same** execution: contract violation, [`GateError::Reentered`].
//!
//! ## Invariants
//! - Entering a segment vacates every other segment of the same job held by the
//!   execution, promoting their waiters.
//! - Stack-like, not queue-like: no fairness beyond "newest waiter wins".

use std::cmp::Ordering;

use super::effect::Transition;
use super::release::vacate;
use crate::error::GateError;
use crate::events::EventKind;
use crate::segments::{Ordinal, SegmentSpec, SegmentTable, Waiter};

/// What happened to the execution that called [`Gate::enter`](crate::Gate::enter).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Entered the segment; its capability was told to proceed.
    Admitted,

    /// Took the waiting seat; it will be resumed by a later `enter` or `exit`,
    /// or aborted by a newer contender.
    Parked,

    /// A newer execution already had the waiting seat; this one was aborted.
    Superseded,
}

pub(super) fn enter(
    table: &mut SegmentTable,
    job: &str,
    incoming: Waiter,
    spec: &SegmentSpec,
    tx: &mut Transition,
) -> Result<Admission, GateError> {
    let name = spec.name();
    let ordinal = incoming.ordinal;

    let segment = table.segment_or_insert(job, name);
    segment.set_concurrency(spec.concurrency());

    let mut contender = incoming;
    let mut superseded = false;
    if let Some(seated) = segment.take_waiter() {
        match seated.ordinal.cmp(&ordinal) {
            Ordering::Less => tx.supersede(job, name, seated, ordinal),
            Ordering::Greater => {
                let by = seated.ordinal;
                let older = std::mem::replace(&mut contender, seated);
                tx.supersede(job, name, older, by);
                superseded = true;
            }
            Ordering::Equal => {
                segment.park(seated);
                tx.event(EventKind::Reentered, job, name, ordinal);
                return Err(GateError::Reentered {
                    job: job.to_string(),
                    segment: name.to_string(),
                    ordinal,
                });
            }
        }
    }

    release_siblings(table, job, name, contender.ordinal, tx);

    let segment = table.segment_or_insert(job, name);
    let admission = if segment.has_room() || segment.holding().contains(&contender.ordinal) {
        segment.admit(contender.ordinal);
        tx.admit(job, name, contender);
        Admission::Admitted
    } else {
        tx.event(EventKind::Parked, job, name, contender.ordinal);
        segment.park(contender);
        Admission::Parked
    };
    tx.changed = true;

    Ok(if superseded {
        Admission::Superseded
    } else {
        admission
    })
}

/// Vacates every segment of `job` other than `except` held by `ordinal`.
fn release_siblings(
    table: &mut SegmentTable,
    job: &str,
    except: &str,
    ordinal: Ordinal,
    tx: &mut Transition,
) {
    for name in table.sibling_names(job, except) {
        if let Some(segment) = table.segment_mut(job, &name) {
            vacate(segment, job, &name, ordinal, tx);
        }
    }
}
