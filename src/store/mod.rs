//! # Durable snapshots of the segment table.
//!
//! The gate persists the **whole** table after every mutating call and reads it
//! back once, lazily, on first access. Stores only move bytes; the gate decides
//! what a failure means (it logs and carries on).
//!
//! ## Contents
//! - [`SnapshotStore`] the contract
//! - [`FileStore`] JSON file, written atomically (temp file + rename)
//! - [`MemoryStore`] in-process bytes, for tests and storage-less deployments

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::segments::SegmentTable;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Well-known snapshot file name inside the state directory.
pub const SNAPSHOT_FILE: &str = "segments.json";

/// Contract for the durable key-value snapshot of the table.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Reads the last saved table. `Ok(None)` on first use.
    async fn load(&self) -> Result<Option<SegmentTable>, StoreError>;

    /// Replaces the saved table with `table`.
    async fn save(&self, table: &SegmentTable) -> Result<(), StoreError>;

    /// Human-readable name (for logs/events).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
