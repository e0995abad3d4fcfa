//! # Tokio-backed resumption capability.
//!
//! [`channel`] returns a pair: the [`Signal`] handed to the gate and the
//! [`Parked`] side kept by the execution.
//!
//! ```text
//! execution                                  gate
//!    │ (signal, parked) = channel(token)
//!    │ gate.enter(job, n, signal, spec) ───────► admits / parks / supersedes
//!    │ parked.wait().await                         │
//!    │        ◄──────── Signal::proceed() ─────────┤  Ok(())
//!    │        ◄──────── Signal::abort(cause) ──────┘  Err(Interruption)
//! ```
//!
//! ## Rules
//! - The first signal settles the outcome; later ones do not change it.
//! - `abort` always cancels the pair's [`CancellationToken`], so work that
//!   already started can observe it.
//! - `abort` on a pair whose `Parked` side is gone returns [`AbortError::Gone`].

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{Interruption, Resume, ResumeToken};
use crate::error::AbortError;

#[derive(Clone, Debug)]
enum Outcome {
    Pending,
    Proceed,
    Aborted(Interruption),
}

impl Outcome {
    fn is_settled(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// Settles a pending outcome; returns whether receivers must be notified.
fn settle(slot: &mut Outcome, next: Outcome) -> bool {
    if slot.is_settled() {
        return false;
    }
    *slot = next;
    true
}

/// Creates a connected [`Signal`]/[`Parked`] pair.
pub fn channel(token: impl Into<ResumeToken>) -> (Arc<Signal>, Parked) {
    let (tx, rx) = watch::channel(Outcome::Pending);
    let cancel = CancellationToken::new();
    let signal = Signal {
        token: token.into(),
        tx,
        cancel: cancel.clone(),
    };
    (Arc::new(signal), Parked { rx, cancel })
}

/// Gate-facing half: implements [`Resume`].
pub struct Signal {
    token: ResumeToken,
    tx: watch::Sender<Outcome>,
    cancel: CancellationToken,
}

impl Resume for Signal {
    fn proceed(&self) {
        self.tx.send_if_modified(|o| settle(o, Outcome::Proceed));
    }

    fn abort(&self, cause: &Interruption) -> Result<(), AbortError> {
        if self.tx.is_closed() {
            return Err(AbortError::Gone);
        }
        self.tx
            .send_if_modified(|o| settle(o, Outcome::Aborted(cause.clone())));
        self.cancel.cancel();
        Ok(())
    }

    fn token(&self) -> ResumeToken {
        self.token.clone()
    }
}

/// Execution-facing half: waits for the gate's verdict.
pub struct Parked {
    rx: watch::Receiver<Outcome>,
    cancel: CancellationToken,
}

impl Parked {
    /// Waits until the gate lets the execution in or aborts it.
    ///
    /// Returns [`Interruption::detached`] if the `Signal` was dropped unsignalled.
    pub async fn wait(&mut self) -> Result<(), Interruption> {
        let settled = self
            .rx
            .wait_for(Outcome::is_settled)
            .await
            .map(|o| o.clone());
        match settled {
            Ok(Outcome::Proceed) => Ok(()),
            Ok(Outcome::Aborted(cause)) => Err(cause),
            Ok(Outcome::Pending) | Err(_) => Err(Interruption::detached()),
        }
    }

    /// Token cancelled when the gate aborts this execution.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// True once the gate has requested an abort.
    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
