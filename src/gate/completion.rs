use tokio::sync::mpsc;

use crate::error::GateError;
use crate::segments::Ordinal;

/// Report that an execution terminated (success, failure or abort).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completed {
    pub job: String,
    pub ordinal: Ordinal,
}

/// Handle for reporting finished executions to a running [`Gate`](crate::Gate).
///
/// Meant to be wired into the engine's completion-notification hook; the gate's
/// loop turns each report into [`Gate::exit`](crate::Gate::exit).
#[derive(Clone)]
pub struct CompletionHandle {
    tx: mpsc::Sender<Completed>,
}

impl CompletionHandle {
    pub(super) fn new(tx: mpsc::Sender<Completed>) -> Self {
        Self { tx }
    }

    /// Reports a finished execution (async, waits if queue is full).
    pub async fn completed(&self, job: impl Into<String>, ordinal: Ordinal) -> Result<(), GateError> {
        let done = Completed {
            job: job.into(),
            ordinal,
        };
        self.tx.send(done).await.map_err(|_| GateError::Closed)
    }

    /// Try to report without blocking (fails if queue full).
    pub fn try_completed(&self, job: impl Into<String>, ordinal: Ordinal) -> Result<(), GateError> {
        let done = Completed {
            job: job.into(),
            ordinal,
        };
        self.tx.try_send(done).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GateError::Full,
            mpsc::error::TrySendError::Closed(_) => GateError::Closed,
        })
    }
}
