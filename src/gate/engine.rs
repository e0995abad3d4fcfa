use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    admission::{self, Admission},
    builder::GateBuilder,
    cancel,
    completion::{Completed, CompletionHandle},
    effect::{Effect, Transition},
    release,
};
use crate::{
    config::GateConfig,
    error::GateError,
    events::{Bus, Event, EventKind},
    resume::{Resolve, Resume},
    segments::{Ordinal, Segment, SegmentSpec, SegmentTable, Waiter},
    store::SnapshotStore,
};

/// Named-segment admission gate.
///
/// Owns the segment table (loaded lazily from its [`SnapshotStore`]) behind a
/// single lock: `enter` and `exit` are atomic with respect to each other.
/// Signals to executions are delivered after the lock is released.
pub struct Gate {
    bus: Bus,
    store: Arc<dyn SnapshotStore>,
    resolver: Option<Arc<dyn Resolve>>,

    // `None` until the first call loads the snapshot.
    table: Mutex<Option<SegmentTable>>,

    // Completion queue.
    tx: mpsc::Sender<Completed>,
    rx: Mutex<Option<mpsc::Receiver<Completed>>>,

    // Subscriber fan-out, stopped by `shutdown`.
    listener: Mutex<Option<JoinHandle<()>>>,
    closing: CancellationToken,
}

impl Gate {
    /// Starts building a gate.
    pub fn builder(cfg: GateConfig) -> GateBuilder {
        GateBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: &GateConfig,
        bus: Bus,
        store: Arc<dyn SnapshotStore>,
        resolver: Option<Arc<dyn Resolve>>,
        listener: Option<JoinHandle<()>>,
        closing: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(cfg.completion_capacity_clamped());
        Self {
            bus,
            store,
            resolver,
            table: Mutex::new(None),
            tx,
            rx: Mutex::new(Some(rx)),
            listener: Mutex::new(listener),
            closing,
        }
    }

    /// Registers execution `ordinal` of `job` as wanting to occupy `spec.name()`.
    ///
    /// The execution is either admitted (its `resume` is told to proceed), parked
    /// as the segment's only waiter, or aborted because a newer one is already
    /// waiting. Other executions may be resumed or aborted as a side effect.
    ///
    /// ## Errors
    /// - [`GateError::Reentered`] if `ordinal` is already this segment's waiter.
    pub async fn enter(
        &self,
        job: &str,
        ordinal: Ordinal,
        resume: Arc<dyn Resume>,
        spec: &SegmentSpec,
    ) -> Result<Admission, GateError> {
        let mut delivery = Delivery::new(self);
        let mut guard = self.table.lock().await;
        let table = self.loaded(&mut guard).await;
        let result = admission::enter(
            table,
            job,
            Waiter::new(ordinal, resume),
            spec,
            &mut delivery.tx,
        );
        if delivery.tx.changed {
            self.persist(job, table).await;
        }
        drop(guard);

        match &result {
            Ok(admission) => {
                tracing::debug!(job, segment = spec.name(), ordinal, ?admission, "entered")
            }
            Err(e) => tracing::warn!(job, segment = spec.name(), ordinal, error = %e, "rejected"),
        }
        result
    }

    /// Releases every segment held by execution `ordinal` of `job` and promotes
    /// the waiters of the freed segments.
    ///
    /// Call once per execution, whatever its outcome. Safe for executions that
    /// never entered a segment. Returns the number of segments released.
    pub async fn exit(&self, job: &str, ordinal: Ordinal) -> usize {
        let mut delivery = Delivery::new(self);
        let mut guard = self.table.lock().await;
        let table = self.loaded(&mut guard).await;
        let released = release::exit(table, job, ordinal, &mut delivery.tx);
        if delivery.tx.changed {
            self.persist(job, table).await;
        }
        drop(guard);

        tracing::debug!(job, ordinal, released, "exited");
        released
    }

    /// Returns a clone of the current table.
    pub async fn snapshot(&self) -> SegmentTable {
        let mut guard = self.table.lock().await;
        self.loaded(&mut guard).await.clone()
    }

    /// Returns a clone of one segment, if it exists.
    pub async fn segment(&self, job: &str, name: &str) -> Option<Segment> {
        let mut guard = self.table.lock().await;
        self.loaded(&mut guard).await.segment(job, name).cloned()
    }

    /// Creates a receiver for subsequent gate events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Returns a handle for reporting finished executions.
    pub fn handle(&self) -> CompletionHandle {
        CompletionHandle::new(self.tx.clone())
    }

    /// Starts the completion loop (spawns in background).
    ///
    /// Every [`CompletionHandle::completed`] report becomes an [`exit`](Gate::exit).
    pub fn run(self: Arc<Self>, token: CancellationToken) {
        tokio::spawn(async move {
            if let Err(e) = self.run_inner(token).await {
                tracing::error!(error = %e, "gate completion loop failed");
            }
        });
    }

    /// Delivers already published events to subscribers, then stops their workers.
    ///
    /// Events published afterwards still reach [`subscribe`](Gate::subscribe)
    /// receivers but no longer reach subscribers. Calling it twice is a no-op.
    pub async fn shutdown(&self) {
        self.closing.cancel();
        let Some(listener) = self.listener.lock().await.take() else {
            return;
        };
        if let Err(e) = listener.await {
            tracing::warn!(error = %e, "subscriber listener ended abnormally");
        }
    }

    async fn run_inner(&self, token: CancellationToken) -> anyhow::Result<()> {
        let mut rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow::anyhow!("gate completion loop already running"))?;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                Some(done) = rx.recv() => {
                    self.exit(&done.job, done.ordinal).await;
                }
            }
        }

        Ok(())
    }

    /// Returns the table, loading it from the store on first access.
    async fn loaded<'a>(&self, slot: &'a mut Option<SegmentTable>) -> &'a mut SegmentTable {
        if slot.is_none() {
            *slot = Some(self.load().await);
        }
        slot.get_or_insert_with(SegmentTable::new)
    }

    async fn load(&self) -> SegmentTable {
        match self.store.load().await {
            Ok(Some(table)) => {
                tracing::debug!(store = self.store.name(), "segment table loaded");
                self.bus
                    .publish(Event::new(EventKind::TableLoaded).with_reason(self.store.name()));
                table
            }
            Ok(None) => SegmentTable::new(),
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "could not load segment table");
                self.bus
                    .publish(Event::new(EventKind::LoadFailed).with_reason(e.as_message()));
                SegmentTable::new()
            }
        }
    }

    async fn persist(&self, job: &str, table: &SegmentTable) {
        if let Err(e) = self.store.save(table).await {
            tracing::warn!(job, store = self.store.name(), error = %e, "could not persist segment table");
            self.bus.publish(
                Event::new(EventKind::PersistFailed)
                    .with_job(job)
                    .with_reason(e.as_message()),
            );
        }
    }

    /// Publishes the transition's events, then delivers its signals in order.
    fn dispatch(&self, tx: Transition) {
        for ev in tx.events {
            self.bus.publish(ev);
        }
        for effect in tx.effects {
            match effect {
                Effect::Proceed {
                    job,
                    segment,
                    waiter,
                } => {
                    if let Some(resume) = self.capability(&job, &segment, &waiter) {
                        resume.proceed();
                    }
                }
                Effect::Abort {
                    job,
                    segment,
                    waiter,
                    by,
                } => {
                    if let Some(resume) = self.capability(&job, &segment, &waiter) {
                        cancel::cancel(&self.bus, resume.as_ref(), &job, &segment, waiter.ordinal, by);
                    }
                }
            }
        }
    }

    /// Live capability of `waiter`, rebuilt through the resolver if needed.
    fn capability(&self, job: &str, segment: &str, waiter: &Waiter) -> Option<Arc<dyn Resume>> {
        if let Some(resume) = waiter.resume() {
            return Some(Arc::clone(resume));
        }
        let resolved = self
            .resolver
            .as_ref()
            .and_then(|r| r.resolve(job, &waiter.token));
        if resolved.is_none() {
            tracing::warn!(
                job,
                segment,
                ordinal = waiter.ordinal,
                token = %waiter.token,
                "no capability for waiter; signal dropped"
            );
            self.bus.publish(
                Event::new(EventKind::ResumeUnresolved)
                    .with_job(job)
                    .with_segment(segment)
                    .with_ordinal(waiter.ordinal)
                    .with_reason(waiter.token.as_str()),
            );
        }
        resolved
    }
}

/// Delivers a transition's signals when dropped.
///
/// Once the table is mutated the signals must go out, even if the caller's
/// future is dropped while the snapshot is being written.
struct Delivery<'a> {
    gate: &'a Gate,
    tx: Transition,
}

impl<'a> Delivery<'a> {
    fn new(gate: &'a Gate) -> Self {
        Self {
            gate,
            tx: Transition::default(),
        }
    }
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        self.gate.dispatch(std::mem::take(&mut self.tx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AbortError;
    use crate::resume::{Interruption, ResumeToken};
    use std::sync::Weak;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records whether the table lock was free when the gate signalled.
    struct LockProbe {
        gate: Weak<Gate>,
        unlocked: AtomicBool,
    }

    impl Resume for LockProbe {
        fn proceed(&self) {
            let gate = self.gate.upgrade().expect("gate alive");
            self.unlocked
                .store(gate.table.try_lock().is_ok(), Ordering::SeqCst);
        }
        fn abort(&self, _cause: &Interruption) -> Result<(), AbortError> {
            Ok(())
        }
        fn token(&self) -> ResumeToken {
            ResumeToken::new("probe")
        }
    }

    #[tokio::test]
    async fn test_signals_are_delivered_outside_the_lock() {
        let gate = Gate::builder(GateConfig::default()).build();
        let probe = Arc::new(LockProbe {
            gate: Arc::downgrade(&gate),
            unlocked: AtomicBool::new(false),
        });

        let spec = SegmentSpec::limited("build", 1).expect("spec");
        let admission = gate.enter("app", 1, probe.clone(), &spec).await;

        assert_eq!(admission, Ok(Admission::Admitted));
        assert!(probe.unlocked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_twice_fails_second_loop() {
        let gate = Gate::builder(GateConfig::default()).build();
        let token = CancellationToken::new();

        let first = gate.run_inner(token.clone());
        let second = gate.run_inner(token.clone());
        token.cancel();

        let (a, b) = tokio::join!(first, second);
        assert!(a.is_ok() ^ b.is_ok());
    }
}
