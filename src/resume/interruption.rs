use std::fmt;

use crate::segments::Ordinal;

/// Why an execution was told to unwind.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cause {
    /// A newer contender took the waiting seat of a segment.
    Superseded {
        /// Job the segment belongs to.
        job: String,
        /// Segment name.
        segment: String,
        /// Ordinal of the newer execution.
        by: Ordinal,
    },

    /// The capability was dropped without ever being signalled.
    Detached,
}

/// Interruption record attached to an execution before it is aborted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interruption {
    pub cause: Cause,
}

impl Interruption {
    /// Creates a "superseded by a newer contender" interruption.
    pub fn superseded(job: impl Into<String>, segment: impl Into<String>, by: Ordinal) -> Self {
        Self {
            cause: Cause::Superseded {
                job: job.into(),
                segment: segment.into(),
                by,
            },
        }
    }

    pub fn detached() -> Self {
        Self {
            cause: Cause::Detached,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self.cause {
            Cause::Superseded { .. } => "superseded",
            Cause::Detached => "detached",
        }
    }
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Cause::Superseded { job, segment, by } => {
                write!(f, "superseded by #{by} waiting for segment {segment:?} of {job}")
            }
            Cause::Detached => f.write_str("resumption capability dropped"),
        }
    }
}

impl std::error::Error for Interruption {}
