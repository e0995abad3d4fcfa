use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Interruption;
use crate::error::AbortError;

/// Opaque, durable reference to a resumption capability.
///
/// The gate stores it next to a parked waiter and hands it back to a
/// [`Resolve`] after a restart. Its contents mean nothing to the gate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(String);

impl ResumeToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ResumeToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResumeToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// # Handle to a suspended execution.
///
/// Supplied by the execution engine on every `enter`. The gate never inspects it;
/// it only stores it and later tells it to go on or to give up.
///
/// Both methods are called **after** the gate released its lock, so an
/// implementation may synchronously re-enter the gate (e.g. by spawning the
/// next step).
pub trait Resume: Send + Sync + 'static {
    /// Resume the execution with a successful result.
    ///
    /// Called at most once by the gate per admission.
    fn proceed(&self);

    /// Record `cause` on the execution and force it to unwind.
    ///
    /// Failure (the execution vanished, the engine refused) is logged and
    /// ignored by the gate.
    fn abort(&self, cause: &Interruption) -> Result<(), AbortError>;

    /// Durable reference used to rebuild this capability after a restart.
    fn token(&self) -> ResumeToken;
}

/// # Rebuilds capabilities of waiters loaded from storage.
///
/// A freshly started process only knows the [`ResumeToken`] of executions that
/// were parked before the restart.
pub trait Resolve: Send + Sync + 'static {
    /// Returns a live capability for `token`, or `None` if the execution is gone.
    fn resolve(&self, job: &str, token: &ResumeToken) -> Option<Arc<dyn Resume>>;
}
