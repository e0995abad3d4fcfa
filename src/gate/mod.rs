//! # Gate: admission and release engines.
//!
//! ```text
//! execution ── enter(job, n, resume, spec) ──┐
//!                                            ▼
//!                               ┌──────────────────────────┐
//! engine hook ── exit(job, n) ─►│ lock(table)              │
//!   (or CompletionHandle ──►    │   admission / release    │── Transition { events, effects }
//!    Gate::run loop)            │   store.save(table)      │
//!                               └────────────┬─────────────┘
//!                                  unlock    ▼
//!                               Bus.publish(events)
//!                               resume.proceed() / cancel(resume)
//! ```
//!
//! Internal modules:
//! - [`admission`]: the `enter` state machine and [`Admission`] outcome;
//! - `release`: vacating segments and promoting waiters (`exit`);
//! - `cancel`: aborting superseded executions;
//! - `effect`: signals deferred until the lock is released;
//! - `completion`: channel-based completion reports.

pub mod admission;

mod builder;
mod cancel;
mod completion;
mod engine;
mod effect;
mod release;

#[cfg(test)]
mod tests;

pub use admission::Admission;
pub use builder::GateBuilder;
pub use completion::{Completed, CompletionHandle};
pub use engine::Gate;
