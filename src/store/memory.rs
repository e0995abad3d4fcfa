use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::SnapshotStore;
use crate::error::StoreError;
use crate::segments::SegmentTable;

/// Keeps the encoded snapshot in memory.
///
/// The table still goes through the JSON codec, so sharing one `MemoryStore`
/// between two gates behaves like a restart against the same file.
#[derive(Default)]
pub struct MemoryStore {
    bytes: Mutex<Option<Vec<u8>>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<SegmentTable>, StoreError> {
        match self.bytes.lock().await.as_deref() {
            Some(data) => Ok(Some(serde_json::from_slice(data)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, table: &SegmentTable) -> Result<(), StoreError> {
        let data = serde_json::to_vec(table)?;
        *self.bytes.lock().await = Some(data);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MemoryStore"
    }
}
