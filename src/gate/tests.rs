use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::{Admission, Gate};
use crate::config::GateConfig;
use crate::error::{AbortError, GateError, StoreError};
use crate::events::{Event, EventKind};
use crate::resume::{self, Cause, Interruption, Resolve, Resume, ResumeToken};
use crate::segments::{Ordinal, SegmentSpec, SegmentTable};
use crate::store::{MemoryStore, SnapshotStore};
use crate::subscribers::Subscribe;

/// Capability that records what the gate asked of it.
#[derive(Default)]
struct Probe {
    token: String,
    gone: bool,
    proceeded: AtomicUsize,
    aborted: Mutex<Vec<Interruption>>,
}

impl Probe {
    fn new(ordinal: Ordinal) -> Arc<Self> {
        Arc::new(Self {
            token: format!("app#{ordinal}"),
            ..Default::default()
        })
    }

    fn vanished(ordinal: Ordinal) -> Arc<Self> {
        Arc::new(Self {
            token: format!("app#{ordinal}"),
            gone: true,
            ..Default::default()
        })
    }

    fn proceeded(&self) -> usize {
        self.proceeded.load(Ordering::SeqCst)
    }

    fn aborted(&self) -> Vec<Interruption> {
        self.aborted.lock().unwrap().clone()
    }
}

impl Resume for Probe {
    fn proceed(&self) {
        self.proceeded.fetch_add(1, Ordering::SeqCst);
    }

    fn abort(&self, cause: &Interruption) -> Result<(), AbortError> {
        if self.gone {
            return Err(AbortError::Gone);
        }
        self.aborted.lock().unwrap().push(cause.clone());
        Ok(())
    }

    fn token(&self) -> ResumeToken {
        ResumeToken::new(self.token.clone())
    }
}

/// Resolver backed by a fixed token → capability map.
#[derive(Default)]
struct Registry(Mutex<HashMap<String, Arc<Probe>>>);

impl Registry {
    fn register(&self, probe: &Arc<Probe>) {
        self.0
            .lock()
            .unwrap()
            .insert(probe.token.clone(), Arc::clone(probe));
    }
}

impl Resolve for Registry {
    fn resolve(&self, _job: &str, token: &ResumeToken) -> Option<Arc<dyn Resume>> {
        let probe = self.0.lock().unwrap().get(token.as_str()).cloned()?;
        Some(probe as Arc<dyn Resume>)
    }
}

/// Store whose writes always fail.
struct BrokenStore;

#[async_trait]
impl SnapshotStore for BrokenStore {
    async fn load(&self) -> Result<Option<SegmentTable>, StoreError> {
        Err(std::io::Error::other("unreadable").into())
    }

    async fn save(&self, _table: &SegmentTable) -> Result<(), StoreError> {
        Err(std::io::Error::other("disk full").into())
    }
}

/// In-memory store whose writes take a while.
#[derive(Default)]
struct SlowStore(MemoryStore);

#[async_trait]
impl SnapshotStore for SlowStore {
    async fn load(&self) -> Result<Option<SegmentTable>, StoreError> {
        self.0.load().await
    }

    async fn save(&self, table: &SegmentTable) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.0.save(table).await
    }
}

/// Subscriber remembering the kinds it was handed.
#[derive(Default)]
struct Kinds(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Kinds {
    async fn on_event(&self, event: &Event) {
        self.0.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "kinds"
    }
}

fn gate() -> Arc<Gate> {
    Gate::builder(GateConfig::default()).build()
}

fn build(n: u32) -> SegmentSpec {
    SegmentSpec::limited("build", n).expect("spec")
}

async fn holding(gate: &Gate, name: &str) -> Vec<Ordinal> {
    gate.segment("app", name)
        .await
        .map(|s| s.holding().iter().copied().collect())
        .unwrap_or_default()
}

async fn waiting(gate: &Gate, name: &str) -> Option<Ordinal> {
    gate.segment("app", name)
        .await
        .and_then(|s| s.waiting_ordinal())
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test]
async fn test_waiter_promoted_when_holder_exits() {
    let gate = gate();
    let (p1, p2) = (Probe::new(1), Probe::new(2));

    assert_eq!(gate.enter("app", 1, p1.clone(), &build(1)).await, Ok(Admission::Admitted));
    assert_eq!(holding(&gate, "build").await, vec![1]);
    assert_eq!(p1.proceeded(), 1);

    assert_eq!(gate.enter("app", 2, p2.clone(), &build(1)).await, Ok(Admission::Parked));
    assert_eq!(waiting(&gate, "build").await, Some(2));
    assert_eq!(p2.proceeded(), 0);

    assert_eq!(gate.exit("app", 1).await, 1);
    assert_eq!(holding(&gate, "build").await, vec![2]);
    assert_eq!(waiting(&gate, "build").await, None);
    assert_eq!(p2.proceeded(), 1);
}

#[tokio::test]
async fn test_older_contender_is_cancelled() {
    let gate = gate();
    let (p1, p2, p3) = (Probe::new(1), Probe::new(2), Probe::new(3));

    gate.enter("app", 1, p1.clone(), &build(1)).await.expect("enter 1");
    gate.enter("app", 3, p3.clone(), &build(1)).await.expect("enter 3");

    let admission = gate.enter("app", 2, p2.clone(), &build(1)).await;
    assert_eq!(admission, Ok(Admission::Superseded));

    assert_eq!(p2.aborted(), vec![Interruption::superseded("app", "build", 3)]);
    assert_eq!(p2.proceeded(), 0);
    assert!(p3.aborted().is_empty());
    assert_eq!(p3.proceeded(), 0);
    assert_eq!(waiting(&gate, "build").await, Some(3));
    assert_eq!(holding(&gate, "build").await, vec![1]);
}

#[tokio::test]
async fn test_newer_contender_displaces_waiter() {
    let gate = gate();
    let (p1, p2, p5) = (Probe::new(1), Probe::new(2), Probe::new(5));

    gate.enter("app", 1, p1.clone(), &build(1)).await.expect("enter 1");
    gate.enter("app", 2, p2.clone(), &build(1)).await.expect("enter 2");

    let admission = gate.enter("app", 5, p5.clone(), &build(1)).await;
    assert_eq!(admission, Ok(Admission::Parked));

    let aborted = p2.aborted();
    assert_eq!(aborted.len(), 1);
    assert_eq!(
        aborted[0].cause,
        Cause::Superseded {
            job: "app".into(),
            segment: "build".into(),
            by: 5
        }
    );
    assert_eq!(waiting(&gate, "build").await, Some(5));
    assert_eq!(holding(&gate, "build").await, vec![1]);
}

#[tokio::test]
async fn test_same_waiter_reentering_is_rejected() {
    let gate = gate();
    let before = {
        gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
        gate.enter("app", 2, Probe::new(2), &build(1)).await.expect("enter 2");
        gate.snapshot().await
    };

    let err = gate
        .enter("app", 2, Probe::new(2), &build(1))
        .await
        .expect_err("reentry");
    assert_eq!(
        err,
        GateError::Reentered {
            job: "app".into(),
            segment: "build".into(),
            ordinal: 2
        }
    );
    assert_eq!(waiting(&gate, "build").await, Some(2));
    assert_eq!(
        gate.snapshot().await.segment("app", "build").map(|s| s.holding().clone()),
        before.segment("app", "build").map(|s| s.holding().clone())
    );
}

#[tokio::test]
async fn test_entering_next_segment_releases_previous() {
    let gate = gate();
    let x = SegmentSpec::limited("x", 1).expect("spec");
    let y = SegmentSpec::limited("y", 1).expect("spec");
    let (p1, p2) = (Probe::new(1), Probe::new(2));

    gate.enter("app", 1, p1.clone(), &x).await.expect("1 -> x");
    gate.enter("app", 2, p2.clone(), &x).await.expect("2 waits x");
    assert_eq!(p2.proceeded(), 0);

    assert_eq!(gate.enter("app", 1, Probe::new(1), &y).await, Ok(Admission::Admitted));

    assert_eq!(holding(&gate, "x").await, vec![2]);
    assert_eq!(waiting(&gate, "x").await, None);
    assert_eq!(holding(&gate, "y").await, vec![1]);
    assert_eq!(p2.proceeded(), 1);
}

#[tokio::test]
async fn test_cross_segment_release_cascades_to_other_execution() {
    let gate = gate();
    let x = SegmentSpec::limited("x", 1).expect("spec");
    let y = SegmentSpec::limited("y", 1).expect("spec");
    let (p2, p3) = (Probe::new(2), Probe::new(3));

    // #1 holds y, #2 holds x, #3 waits on x.
    gate.enter("app", 1, Probe::new(1), &y).await.expect("1 -> y");
    gate.enter("app", 2, p2.clone(), &x).await.expect("2 -> x");
    gate.enter("app", 3, p3.clone(), &x).await.expect("3 waits x");

    // #2 moves on to y: it leaves x (promoting #3) and parks behind #1.
    assert_eq!(gate.enter("app", 2, Probe::new(2), &y).await, Ok(Admission::Parked));
    assert_eq!(p3.proceeded(), 1);
    assert_eq!(holding(&gate, "x").await, vec![3]);
    assert_eq!(waiting(&gate, "y").await, Some(2));
}

#[tokio::test]
async fn test_exit_releases_and_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let gate = Gate::builder(GateConfig::default())
        .with_store(store.clone())
        .build();

    gate.enter("app", 1, Probe::new(1), &SegmentSpec::unbounded("build").expect("spec"))
        .await
        .expect("enter");
    let saves = store.saves();

    assert_eq!(gate.exit("app", 1).await, 1);
    assert_eq!(store.saves(), saves + 1);
    assert!(holding(&gate, "build").await.is_empty());

    assert_eq!(gate.exit("app", 1).await, 0);
    assert_eq!(gate.exit("ghost", 7).await, 0);
    assert_eq!(store.saves(), saves + 1);
}

#[tokio::test]
async fn test_exit_of_parked_waiter_frees_the_seat() {
    let gate = gate();
    let p2 = Probe::new(2);

    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    gate.enter("app", 2, p2.clone(), &build(1)).await.expect("enter 2");

    gate.exit("app", 2).await;
    assert_eq!(waiting(&gate, "build").await, None);

    gate.exit("app", 1).await;
    assert!(holding(&gate, "build").await.is_empty());
    assert_eq!(p2.proceeded(), 0);
}

#[tokio::test]
async fn test_holder_reentering_own_segment_stays_admitted() {
    let gate = gate();
    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");

    let again = Probe::new(1);
    assert_eq!(gate.enter("app", 1, again.clone(), &build(1)).await, Ok(Admission::Admitted));
    assert_eq!(again.proceeded(), 1);
    assert_eq!(holding(&gate, "build").await, vec![1]);
    assert_eq!(waiting(&gate, "build").await, None);
}

#[tokio::test]
async fn test_older_contender_raising_concurrency_admits_waiter() {
    let gate = gate();
    let (p2, p3) = (Probe::new(2), Probe::new(3));

    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    gate.enter("app", 3, p3.clone(), &build(1)).await.expect("enter 3");

    let admission = gate.enter("app", 2, p2.clone(), &build(2)).await;
    assert_eq!(admission, Ok(Admission::Superseded));
    assert_eq!(p2.aborted().len(), 1);
    assert_eq!(p3.proceeded(), 1);
    assert_eq!(holding(&gate, "build").await, vec![1, 3]);
}

#[tokio::test]
async fn test_shrinking_concurrency_does_not_evict() {
    let gate = gate();
    let p3 = Probe::new(3);
    gate.enter("app", 1, Probe::new(1), &build(2)).await.expect("enter 1");
    gate.enter("app", 2, Probe::new(2), &build(2)).await.expect("enter 2");

    assert_eq!(gate.enter("app", 3, p3.clone(), &build(1)).await, Ok(Admission::Parked));
    assert_eq!(holding(&gate, "build").await, vec![1, 2]);

    // A departing holder hands its slot to the waiter even above the new limit.
    gate.exit("app", 1).await;
    assert_eq!(holding(&gate, "build").await, vec![2, 3]);
    assert_eq!(waiting(&gate, "build").await, None);
    assert_eq!(p3.proceeded(), 1);

    // Still over the limit: a newcomer parks.
    assert_eq!(gate.enter("app", 4, Probe::new(4), &build(1)).await, Ok(Admission::Parked));
}

#[tokio::test]
async fn test_jobs_are_independent() {
    let gate = gate();
    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("app");
    let other = Probe::new(1);
    assert_eq!(gate.enter("lib", 1, other.clone(), &build(1)).await, Ok(Admission::Admitted));
    assert_eq!(other.proceeded(), 1);
}

#[tokio::test]
async fn test_capacity_and_single_waiter_hold_under_churn() {
    let gate = gate();
    let mut seed: u64 = 0x5eed;
    let mut next = 1;
    let mut live: Vec<Ordinal> = Vec::new();

    for _ in 0..300 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let roll = (seed >> 33) % 10;
        if roll < 6 || live.is_empty() {
            let name = if roll % 2 == 0 { "build" } else { "test" };
            let spec = SegmentSpec::limited(name, 2).expect("spec");
            gate.enter("app", next, Probe::new(next), &spec).await.expect("enter");
            live.push(next);
            next += 1;
        } else {
            let victim = live.remove((seed as usize >> 7) % live.len());
            gate.exit("app", victim).await;
        }

        let table = gate.snapshot().await;
        let segments = table.job("app").expect("job");
        let mut seen = std::collections::HashSet::new();
        for seg in segments.values() {
            assert!(seg.holding().len() <= 2, "over capacity: {seg:?}");
            if let Some(w) = seg.waiting_ordinal() {
                assert!(!seg.holding().contains(&w));
                assert!(!seg.has_room(), "waiter with free slot: {seg:?}");
            }
            for o in seg.holding() {
                assert!(seen.insert(*o), "#{o} holds two segments");
            }
        }
    }
}

#[tokio::test]
async fn test_reload_behaves_the_same() {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(Registry::default());

    let first = Gate::builder(GateConfig::default())
        .with_store(store.clone())
        .build();
    first.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    first.enter("app", 2, Probe::new(2), &build(1)).await.expect("enter 2");
    drop(first);

    // Fresh process: the waiter's capability is rebuilt from its token.
    let revived = Probe::new(2);
    registry.register(&revived);
    let second = Gate::builder(GateConfig::default())
        .with_store(store.clone())
        .with_resolver(registry.clone())
        .build();
    let mut rx = second.subscribe();

    assert_eq!(waiting(&second, "build").await, Some(2));
    assert!(drain(&mut rx).iter().any(|e| e.kind == EventKind::TableLoaded));

    let newcomer = Probe::new(3);
    assert_eq!(second.enter("app", 3, newcomer.clone(), &build(1)).await, Ok(Admission::Parked));
    assert_eq!(revived.aborted().len(), 1);

    assert_eq!(second.exit("app", 1).await, 1);
    assert_eq!(newcomer.proceeded(), 1);
    assert_eq!(holding(&second, "build").await, vec![3]);
}

#[tokio::test]
async fn test_unresolved_waiter_is_reported() {
    let store = Arc::new(MemoryStore::new());
    let first = Gate::builder(GateConfig::default())
        .with_store(store.clone())
        .build();
    first.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    first.enter("app", 2, Probe::new(2), &build(1)).await.expect("enter 2");

    let second = Gate::builder(GateConfig::default()).with_store(store).build();
    let mut rx = second.subscribe();
    second.exit("app", 1).await;

    assert_eq!(holding(&second, "build").await, vec![2]);
    let events = drain(&mut rx);
    let unresolved = events
        .iter()
        .find(|e| e.kind == EventKind::ResumeUnresolved)
        .expect("unresolved event");
    assert_eq!(unresolved.reason.as_deref(), Some("app#2"));
}

#[tokio::test]
async fn test_store_failures_are_swallowed() {
    let gate = Gate::builder(GateConfig::default())
        .with_store(Arc::new(BrokenStore))
        .build();
    let mut rx = gate.subscribe();
    let p1 = Probe::new(1);

    assert_eq!(gate.enter("app", 1, p1.clone(), &build(1)).await, Ok(Admission::Admitted));
    assert_eq!(p1.proceeded(), 1);
    assert_eq!(holding(&gate, "build").await, vec![1]);

    let kinds: Vec<EventKind> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::LoadFailed));
    assert!(kinds.contains(&EventKind::PersistFailed));
    assert!(kinds.contains(&EventKind::Admitted));
}

#[tokio::test]
async fn test_cancel_failure_does_not_block_admission() {
    let gate = gate();
    let mut rx = gate.subscribe();

    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    gate.enter("app", 2, Probe::vanished(2), &build(1)).await.expect("enter 2");

    assert_eq!(gate.enter("app", 4, Probe::new(4), &build(1)).await, Ok(Admission::Parked));
    assert_eq!(waiting(&gate, "build").await, Some(4));

    let failed = drain(&mut rx)
        .into_iter()
        .find(|e| e.kind == EventKind::CancelFailed)
        .expect("cancel failure reported");
    assert_eq!(failed.ordinal, Some(2));
    assert_eq!(failed.other, Some(4));
}

#[tokio::test]
async fn test_file_snapshot_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = GateConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..GateConfig::default()
    };

    let first = Gate::builder(cfg.clone()).build();
    first.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    first.enter("app", 2, Probe::new(2), &build(1)).await.expect("enter 2");
    assert!(dir.path().join("segments.json").exists());

    let second = Gate::builder(cfg).build();
    assert_eq!(holding(&second, "build").await, vec![1]);
    assert_eq!(waiting(&second, "build").await, Some(2));
}

#[tokio::test]
async fn test_signal_pair_end_to_end() {
    let gate = gate();

    let (s1, mut w1) = resume::channel("app#1");
    gate.enter("app", 1, s1, &build(1)).await.expect("enter 1");
    assert_eq!(w1.wait().await, Ok(()));

    let (s2, mut w2) = resume::channel("app#2");
    gate.enter("app", 2, s2, &build(1)).await.expect("enter 2");
    let (s3, mut w3) = resume::channel("app#3");
    gate.enter("app", 3, s3, &build(1)).await.expect("enter 3");

    assert_eq!(w2.wait().await, Err(Interruption::superseded("app", "build", 3)));
    assert!(w2.is_aborted());

    gate.exit("app", 1).await;
    assert_eq!(w3.wait().await, Ok(()));
}

#[tokio::test]
async fn test_completion_loop_drives_exit() {
    let gate = gate();
    let token = CancellationToken::new();
    Arc::clone(&gate).run(token.clone());
    let handle = gate.handle();

    let p2 = Probe::new(2);
    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    gate.enter("app", 2, p2.clone(), &build(1)).await.expect("enter 2");

    let mut rx = gate.subscribe();
    handle.completed("app", 1).await.expect("queued");

    let promoted = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == EventKind::Promoted => return ev,
                Ok(_) => continue,
                Err(e) => panic!("bus closed: {e}"),
            }
        }
    })
    .await
    .expect("promotion within timeout");

    assert_eq!(promoted.ordinal, Some(2));
    assert_eq!(promoted.other, Some(1));
    assert_eq!(p2.proceeded(), 1);
    token.cancel();
}

#[tokio::test]
async fn test_try_completed_reports_full_queue() {
    let cfg = GateConfig {
        completion_capacity: 1,
        ..GateConfig::default()
    };
    let gate = Gate::builder(cfg).build();
    let handle = gate.handle();

    handle.try_completed("app", 1).expect("first fits");
    assert_eq!(handle.try_completed("app", 2), Err(GateError::Full));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_exit_still_promotes_waiter() {
    let gate = Gate::builder(GateConfig::default())
        .with_store(Arc::new(SlowStore::default()))
        .build();
    let p2 = Probe::new(2);

    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    gate.enter("app", 2, p2.clone(), &build(1)).await.expect("enter 2");

    // Gives up while the snapshot is still being written.
    let gave_up = tokio::time::timeout(Duration::from_millis(5), gate.exit("app", 1)).await;
    assert!(gave_up.is_err());

    assert_eq!(p2.proceeded(), 1);
    assert_eq!(holding(&gate, "build").await, vec![2]);
    assert_eq!(waiting(&gate, "build").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_enter_still_aborts_displaced_waiter() {
    let gate = Gate::builder(GateConfig::default())
        .with_store(Arc::new(SlowStore::default()))
        .build();
    let (p2, p3) = (Probe::new(2), Probe::new(3));

    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    gate.enter("app", 2, p2.clone(), &build(1)).await.expect("enter 2");

    let segments3 = build(1);
    let entering = gate.enter("app", 3, p3.clone(), &segments3);
    assert!(tokio::time::timeout(Duration::from_millis(5), entering).await.is_err());

    assert_eq!(p2.aborted(), vec![Interruption::superseded("app", "build", 3)]);
    assert_eq!(waiting(&gate, "build").await, Some(3));
}

#[tokio::test]
async fn test_shutdown_drains_subscribers() {
    let kinds = Arc::new(Kinds::default());
    let gate = Gate::builder(GateConfig::default())
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .build();

    gate.enter("app", 1, Probe::new(1), &build(1)).await.expect("enter 1");
    gate.enter("app", 2, Probe::new(2), &build(1)).await.expect("enter 2");
    gate.shutdown().await;

    let seen = kinds.0.lock().unwrap().clone();
    assert_eq!(seen, vec![EventKind::Admitted, EventKind::Parked]);

    // Later events no longer reach the stopped subscriber.
    gate.exit("app", 1).await;
    gate.shutdown().await;
    assert_eq!(kinds.0.lock().unwrap().len(), 2);
}
