//! # Subscriber contract
//!
//! A [`Subscribe`] implementation receives every gate event (admissions,
//! promotions, supersessions, swallowed failures) on its own worker task, fed
//! by a bounded queue inside the [`SubscriberSet`](crate::SubscriberSet).
//!
//! A slow subscriber only delays itself. Once its queue is full, further events
//! are dropped for it and reported as `SubscriberOverflow`.
//!
//! ## Example
//! ```rust
//! use segvisor::{Event, EventKind, Subscribe};
//!
//! /// Counts executions cancelled by newer contenders.
//! struct Cancellations(std::sync::atomic::AtomicU64);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Cancellations {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::Superseded {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "cancellations" }
//!     fn queue_capacity(&self) -> usize { 256 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Queue size used when a subscriber does not pick one.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Receives gate events on a dedicated worker.
///
/// `on_event` runs on the tokio runtime: do not block the thread.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes one event. A panic here is caught and reported on the bus.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Bound of this subscriber's queue (min 1).
    fn queue_capacity(&self) -> usize {
        DEFAULT_QUEUE_CAPACITY
    }
}
