//! # Gate configuration.
//!
//! Provides [`GateConfig`] centralized settings for a [`Gate`](crate::Gate).
//!
//! ## Sentinel values
//! - `state_dir = None` → no file store; the table lives in a [`MemoryStore`](crate::MemoryStore)
//!   unless the builder is given another store explicitly.

use std::path::PathBuf;

use crate::store::SNAPSHOT_FILE;

/// Global configuration for the gate.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `completion_capacity`: Completion queue size (min 1)
/// - `state_dir`: Directory holding the snapshot file
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Capacity of the completion queue feeding [`Gate::run`](crate::Gate::run).
    ///
    /// When full, `CompletionHandle::completed()` waits and `try_completed()` fails.
    pub completion_capacity: usize,

    /// Directory for the durable snapshot (`segments.json`).
    pub state_dir: Option<PathBuf>,
}

impl GateConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn completion_capacity_clamped(&self) -> usize {
        self.completion_capacity.max(1)
    }

    /// Full path of the snapshot file, if a state directory is configured.
    pub fn state_file(&self) -> Option<PathBuf> {
        self.state_dir.as_ref().map(|dir| dir.join(SNAPSHOT_FILE))
    }
}

impl Default for GateConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `completion_capacity = 1024`
    /// - `state_dir = None` (in-memory)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            completion_capacity: 1024,
            state_dir: None,
        }
    }
}
