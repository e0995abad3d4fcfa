//! Error types used by the gate, its snapshot store and resumption capabilities.
//!
//! This module defines three error enums:
//!
//! - [`GateError`]: errors surfaced to callers of the gate (contract violations, bad arguments).
//! - [`StoreError`]: failures of the durable snapshot store (logged and swallowed by the gate).
//! - [`AbortError`]: failures to abort a displaced execution (logged and swallowed by the gate).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

use crate::segments::Ordinal;

/// # Errors surfaced by the gate.
///
/// Only [`GateError::Reentered`] can come out of [`Gate::enter`](crate::Gate::enter).
/// The argument errors are produced while building a [`SegmentSpec`](crate::SegmentSpec);
/// `Full`/`Closed` come from the [`CompletionHandle`](crate::CompletionHandle).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The same execution tried to enter a segment it is already parked on.
    ///
    /// This is a logic error upstream and is never retried.
    #[error("execution #{ordinal} of job {job:?} is trying to reenter the segment {segment:?}")]
    Reentered {
        /// Job the segment belongs to.
        job: String,
        /// Segment name.
        segment: String,
        /// Ordinal of the offending execution.
        ordinal: Ordinal,
    },

    /// Segment name was absent or blank.
    #[error("must specify segment name")]
    MissingName,

    /// Concurrency was not a positive integer.
    #[error("invalid concurrency {value:?}: expected a positive integer")]
    InvalidConcurrency {
        /// Raw value as supplied by the caller.
        value: String,
    },

    /// Completion queue is full (try again later or use async `completed`).
    #[error("completion queue full")]
    Full,

    /// Completion channel is closed (the gate loop is gone).
    #[error("completion channel closed")]
    Closed,
}

impl GateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use segvisor::GateError;
    ///
    /// assert_eq!(GateError::MissingName.as_label(), "gate_missing_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            GateError::Reentered { .. } => "gate_reentered",
            GateError::MissingName => "gate_missing_name",
            GateError::InvalidConcurrency { .. } => "gate_invalid_concurrency",
            GateError::Full => "gate_full",
            GateError::Closed => "gate_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            GateError::Reentered {
                job,
                segment,
                ordinal,
            } => format!("reentered: job={job} segment={segment} ordinal={ordinal}"),
            GateError::MissingName => "missing segment name".to_string(),
            GateError::InvalidConcurrency { value } => format!("invalid concurrency: {value}"),
            GateError::Full => "completion queue full".to_string(),
            GateError::Closed => "completion channel closed".to_string(),
        }
    }
}

/// # Errors produced by a [`SnapshotStore`](crate::SnapshotStore).
///
/// The gate never surfaces these: in-memory state stays authoritative.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("snapshot codec failed: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Io(_) => "store_io",
            StoreError::Codec(_) => "store_codec",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StoreError::Io(e) => format!("io: {e}"),
            StoreError::Codec(e) => format!("codec: {e}"),
        }
    }
}

/// # Errors returned by [`Resume::abort`](crate::Resume::abort).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// The execution no longer exists (already finished or deleted).
    #[error("execution is gone")]
    Gone,

    /// The engine refused to abort the execution.
    #[error("abort refused: {reason}")]
    Refused {
        /// Engine-provided explanation.
        reason: String,
    },
}

impl AbortError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AbortError::Gone => "abort_gone",
            AbortError::Refused { .. } => "abort_refused",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            AbortError::Gone => "execution gone".to_string(),
            AbortError::Refused { reason } => format!("refused: {reason}"),
        }
    }
}
