//! # Resumption capabilities.
//!
//! The gate never runs executions itself. It talks to the execution engine
//! through two traits:
//! - [`Resume`] - proceed / abort one suspended execution;
//! - [`Resolve`] - rebuild a [`Resume`] from its durable [`ResumeToken`] after a restart.
//!
//! [`channel`] provides a ready-made tokio implementation ([`Signal`] + [`Parked`]).

mod capability;
mod interruption;
mod signal;

pub use capability::{Resolve, Resume, ResumeToken};
pub use interruption::{Cause, Interruption};
pub use signal::{Parked, Signal, channel};
