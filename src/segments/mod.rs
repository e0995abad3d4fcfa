//! # Segment table: the gate's durable state.
//!
//! A job owns any number of named segments. Each segment behaves like a counting
//! semaphore whose waiting room has exactly one seat:
//!
//! ```text
//! SegmentTable
//!   └─ "app" (job)
//!        ├─ "build"  { holding: {7, 8}, concurrency: 2, waiting: Some(#9) }
//!        └─ "deploy" { holding: {6},    concurrency: 1, waiting: None     }
//! ```
//!
//! ## Invariants
//! - An ordinal is held in at most one segment per job.
//! - A segment has at most one waiter, and the waiter is not a holder.
//!
//! The table is plain data; every decision lives in [`Gate`](crate::Gate).

mod concurrency;
mod segment;
mod spec;
mod table;

pub use concurrency::Concurrency;
pub use segment::{Segment, Waiter};
pub use spec::SegmentSpec;
pub use table::SegmentTable;

/// Per-job execution number; strictly increasing, assigned by the engine.
pub type Ordinal = u64;
