//! Release engine: vacating segments and promoting their waiters.

use super::effect::Transition;
use crate::events::EventKind;
use crate::segments::{Ordinal, Segment, SegmentTable};

/// Removes `ordinal` from one segment's holders and promotes its waiter.
///
/// Returns `true` if `ordinal` was a holder.
pub(super) fn vacate(
    segment: &mut Segment,
    job: &str,
    name: &str,
    ordinal: Ordinal,
    tx: &mut Transition,
) -> bool {
    if !segment.release(ordinal) {
        return false;
    }
    tx.changed = true;
    tx.event(EventKind::Released, job, name, ordinal);
    if let Some(waiter) = segment.promote() {
        tx.promote(job, name, waiter, ordinal);
    }
    true
}

/// Releases every segment of `job` held by a terminated execution.
///
/// A waiting seat still occupied by the execution is vacated as well, so a dead
/// waiter is never promoted. Returns the number of segments it was holding.
pub(super) fn exit(
    table: &mut SegmentTable,
    job: &str,
    ordinal: Ordinal,
    tx: &mut Transition,
) -> usize {
    let Some(segments) = table.job_mut(job) else {
        return 0;
    };

    let mut released = 0;
    for (name, segment) in segments.iter_mut() {
        if vacate(segment, job, name, ordinal, tx) {
            released += 1;
        } else if segment.waiting_ordinal() == Some(ordinal) {
            segment.take_waiter();
            tx.changed = true;
            tx.event(EventKind::Released, job, name, ordinal).reason = Some("waiting".into());
        }
    }
    released
}
