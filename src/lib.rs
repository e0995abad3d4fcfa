//! # segvisor
//!
//! **Segvisor** is a named-segment admission gate for pipeline executions.
//!
//! Executions of the same job (numbered by a strictly increasing ordinal) ask to
//! enter named segments. Each segment admits at most `concurrency` executions at
//! once and keeps **one** waiting seat. When two executions compete for the seat,
//! the newer one wins and the older one is aborted: a pipeline never wastes time
//! on a build that a later commit already made obsolete.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  execution #7        execution #8        execution #9
//!       │                   │                   │
//!       │ enter("build")    │ enter("build")    │ enter("build")
//!       ▼                   ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Gate                                                             │
//! │  - SegmentTable (job → segment → holding / concurrency / waiter)  │
//! │  - SnapshotStore (whole table persisted after every mutation)     │
//! │  - Resolve (rebuilds capabilities of waiters after a restart)     │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!   proceed(#7)        abort(#8, by #9)     #9 parked          │
//!                                                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                 (capacity: GateConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          (per-sub queues)
//!                       ┌───────────┼───────────┐
//!                       ▼           ▼           ▼
//!                    worker1     worker2     workerN
//! ```
//!
//! ### Lifecycle of one execution
//! ```text
//! (signal, parked) = channel(token)
//! gate.enter(job, n, signal, spec)
//!   ├─ seat holds older #m   ─► abort #m, continue as n
//!   ├─ seat holds newer #m   ─► abort n, continue as #m      ─► Superseded
//!   ├─ seat holds n already  ─► GateError::Reentered
//!   ├─ vacate the job's other segments held by n (promote their waiters)
//!   ├─ room (or already holding) ─► admit, proceed(n)         ─► Admitted
//!   └─ full                      ─► take the seat             ─► Parked
//! parked.wait().await            (Ok = go, Err(Interruption) = unwind)
//! ...
//! gate.exit(job, n)              (or CompletionHandle::completed)
//!   └─ vacate every segment held by n, promote waiters
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Gate**          | Admission, release and completion loop.                      | [`Gate`], [`Admission`], [`CompletionHandle`] |
//! | **Segments**      | Durable table of segments and their waiters.                 | [`SegmentTable`], [`Segment`], [`SegmentSpec`] |
//! | **Resumption**    | Talk to the execution engine; survive restarts.              | [`Resume`], [`Resolve`], [`channel`]        |
//! | **Persistence**   | Whole-table snapshots.                                       | [`SnapshotStore`], [`FileStore`], [`MemoryStore`] |
//! | **Subscriber API**| Hook into gate events (logging, metrics, custom subscribers).| [`Subscribe`]                               |
//! | **Errors**        | Typed errors for callers, stores and capabilities.           | [`GateError`], [`StoreError`], [`AbortError`] |
//! | **Configuration** | Centralize gate settings.                                    | [`GateConfig`]                              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use segvisor::{Admission, Gate, GateConfig, SegmentSpec, channel};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = Gate::builder(GateConfig::default()).build();
//!     let build = SegmentSpec::limited("build", 1)?;
//!
//!     let (first, mut first_parked) = channel("app#1");
//!     assert_eq!(gate.enter("app", 1, first, &build).await?, Admission::Admitted);
//!     first_parked.wait().await?;
//!
//!     let (second, mut second_parked) = channel("app#2");
//!     assert_eq!(gate.enter("app", 2, second, &build).await?, Admission::Parked);
//!
//!     // #1 finishes: its slot goes to #2.
//!     gate.exit("app", 1).await;
//!     second_parked.wait().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod gate;
mod resume;
mod segments;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use config::GateConfig;
pub use error::{AbortError, GateError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use gate::{Admission, Completed, CompletionHandle, Gate, GateBuilder};
pub use resume::{Cause, Interruption, Parked, Resolve, Resume, ResumeToken, Signal, channel};
pub use segments::{Concurrency, Ordinal, Segment, SegmentSpec, SegmentTable, Waiter};
pub use store::{FileStore, MemoryStore, SNAPSHOT_FILE, SnapshotStore};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
