//! # Fan-out of gate events to subscribers.
//!
//! [`SubscriberSet::emit`] hands each event to every subscriber's bounded queue
//! with `try_send` and returns. One worker per subscriber drains its queue in
//! order and calls [`Subscribe::on_event`].
//!
//! ```text
//! emit(&Event) ─ Arc<Event> ─┬─► queue "log"    ─► worker ─► on_event
//!                            ├─► queue "audit"  ─► worker ─► on_event
//!                            └─► queue ...      ─► worker ─► on_event
//! ```
//!
//! - Order is kept per subscriber, not across subscribers.
//! - Full or closed queue: the event is dropped for that subscriber and a
//!   `SubscriberOverflow` event is published (never for an overflow event).
//! - A panicking `on_event` is caught; the worker publishes `SubscriberPanicked`
//!   and keeps going.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::Subscribe;
use crate::events::{Bus, Event};

struct Queue {
    subscriber: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Subscribers of one gate, each behind its own queue and worker.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber.
    ///
    /// Needs a tokio runtime unless `subs` is empty.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (queues, workers) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let queue = Queue {
                    subscriber: sub.name(),
                    tx,
                };
                (queue, spawn_worker(sub, rx, bus.clone()))
            })
            .unzip();

        Self {
            queues,
            workers,
            bus,
        }
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for queue in &self.queues {
            let reason = match queue.tx.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if event.is_subscriber_overflow() {
                continue;
            }
            tracing::debug!(subscriber = queue.subscriber, reason, seq = event.seq, "event dropped for subscriber");
            self.bus
                .publish(Event::subscriber_overflow(queue.subscriber, reason));
        }
    }

    /// Closes every queue and waits until the workers drained them.
    pub async fn shutdown(self) {
        drop(self.queues);
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "subscriber worker ended abnormally");
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }
}

fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let handled = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
            if let Err(payload) = handled {
                let info = panic_message(payload.as_ref());
                tracing::warn!(subscriber = sub.name(), %info, seq = ev.seq, "subscriber panicked");
                bus.publish(Event::subscriber_panicked(sub.name(), info));
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
