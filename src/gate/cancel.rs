//! Cancellation helper: aborting a displaced execution.
//!
//! Fire-and-forget. An execution that can no longer be aborted is treated as
//! already gone; the admission decision stands either way.

use crate::events::{Bus, Event, EventKind};
use crate::resume::{Interruption, Resume};
use crate::segments::Ordinal;

/// Attaches a "superseded by `by`" interruption to `resume` and asks it to unwind.
pub(super) fn cancel(
    bus: &Bus,
    resume: &dyn Resume,
    job: &str,
    segment: &str,
    ordinal: Ordinal,
    by: Ordinal,
) {
    let interruption = Interruption::superseded(job, segment, by);
    match resume.abort(&interruption) {
        Ok(()) => {
            tracing::debug!(job, segment, ordinal, by, "cancelled superseded execution");
        }
        Err(e) => {
            tracing::warn!(
                job,
                segment,
                ordinal,
                by,
                error = %e,
                "could not cancel superseded execution (perhaps since deleted?)"
            );
            bus.publish(
                Event::new(EventKind::CancelFailed)
                    .with_job(job)
                    .with_segment(segment)
                    .with_ordinal(ordinal)
                    .with_other(by)
                    .with_reason(e.as_message()),
            );
        }
    }
}
