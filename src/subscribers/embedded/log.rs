//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [admitted] job="app" segment="build" run=1
//! [parked] job="app" segment="build" run=2
//! [superseded] job="app" segment="build" run=2 by=5
//! [released] job="app" segment="build" run=1
//! [promoted] job="app" segment="build" run=5 after=1
//! [persist-failed] job="app" err="io: disk full"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.as_deref().unwrap_or("-");
        let segment = e.segment.as_deref().unwrap_or("-");
        let err = e.reason.as_deref().unwrap_or("unknown");
        let run = e.ordinal.map_or_else(|| "-".to_string(), |o| o.to_string());
        let other = e.other.map_or_else(|| "-".to_string(), |o| o.to_string());
        match e.kind {
            EventKind::Admitted => {
                println!("[admitted] job={job:?} segment={segment:?} run={run}");
            }
            EventKind::Parked => {
                println!("[parked] job={job:?} segment={segment:?} run={run}");
            }
            EventKind::Promoted => {
                println!(
                    "[promoted] job={job:?} segment={segment:?} run={run} after={other}"
                );
            }
            EventKind::Superseded => {
                println!(
                    "[superseded] job={job:?} segment={segment:?} run={run} by={other}"
                );
            }
            EventKind::Released => {
                println!("[released] job={job:?} segment={segment:?} run={run}");
            }
            EventKind::Reentered => {
                println!("[reentered] job={job:?} segment={segment:?} run={run}");
            }
            EventKind::TableLoaded => println!("[table-loaded] store={err}"),
            EventKind::LoadFailed => println!("[load-failed] err={err:?}"),
            EventKind::PersistFailed => println!("[persist-failed] job={job:?} err={err:?}"),
            EventKind::CancelFailed => {
                println!(
                    "[cancel-failed] job={job:?} segment={segment:?} run={run} err={err:?}"
                );
            }
            EventKind::ResumeUnresolved => {
                println!(
                    "[resume-unresolved] job={job:?} segment={segment:?} run={run} token={err:?}"
                );
            }
            EventKind::SubscriberOverflow => println!("[subscriber-overflow] {err}"),
            EventKind::SubscriberPanicked => println!("[subscriber-panicked] {err}"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
