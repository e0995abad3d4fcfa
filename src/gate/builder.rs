use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::Gate;
use crate::{
    config::GateConfig,
    events::Bus,
    resume::Resolve,
    store::{FileStore, MemoryStore, SnapshotStore},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Gate`] with optional collaborators.
pub struct GateBuilder {
    cfg: GateConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    store: Option<Arc<dyn SnapshotStore>>,
    resolver: Option<Arc<dyn Resolve>>,
}

impl GateBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: GateConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            store: None,
            resolver: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive gate events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Overrides the snapshot store.
    ///
    /// Without it, the gate uses a [`FileStore`] at [`GateConfig::state_file`] or,
    /// if no state directory is configured, a [`MemoryStore`].
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the resolver used to rebuild capabilities of waiters loaded from storage.
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Builds and returns the gate.
    ///
    /// Must be called inside a tokio runtime when subscribers are configured.
    pub fn build(self) -> Arc<Gate> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let closing = CancellationToken::new();
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let listener = if subs.is_empty() {
            None
        } else {
            Some(subscriber_listener(&bus, subs, closing.clone()))
        };

        let store: Arc<dyn SnapshotStore> = match self.store {
            Some(store) => store,
            None => match self.cfg.state_file() {
                Some(path) => Arc::new(FileStore::new(path)),
                None => Arc::new(MemoryStore::new()),
            },
        };

        Arc::new(Gate::new_internal(
            &self.cfg,
            bus,
            store,
            self.resolver,
            listener,
            closing,
        ))
    }
}

/// Forwards bus events to the subscriber set until `closing` is cancelled.
///
/// Events still buffered at that point are forwarded before the workers drain.
fn subscriber_listener(
    bus: &Bus,
    set: SubscriberSet,
    closing: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = closing.cancelled() => break,
                recv = rx.recv() => match recv {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(&ev);
        }
        set.shutdown().await;
    })
}
