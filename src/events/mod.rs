//! Gate events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the gate and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Gate::enter`, `Gate::exit`, the table loader,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the gate's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained through `Gate::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
