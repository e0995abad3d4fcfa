use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::SnapshotStore;
use crate::error::StoreError;
use crate::segments::SegmentTable;

/// JSON snapshot on the local filesystem.
///
/// Writes go to `<path>.tmp`, are synced to disk and only then renamed over
/// `<path>`, so a crash or power loss mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store backed by the file at `path` (need not exist yet).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self) -> Result<Option<SegmentTable>, StoreError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn save(&self, table: &SegmentTable) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(table)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FileStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::Concurrency;

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("segments.json"));
        assert!(store.load().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_empty_file_loads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("segments.json");
        std::fs::write(&path, b"\n").expect("write");
        assert!(FileStore::new(path).load().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("state").join("segments.json"));

        let mut table = SegmentTable::new();
        let seg = table.segment_or_insert("app", "build");
        seg.set_concurrency(Concurrency::Limited(2));
        seg.admit(3);
        store.save(&table).await.expect("save");

        let back = store.load().await.expect("load").expect("some");
        let seg = back.segment("app", "build").expect("segment");
        assert_eq!(seg.concurrency(), Concurrency::Limited(2));
        assert!(seg.holding().contains(&3));
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("segments.json"));

        let mut table = SegmentTable::new();
        table.segment_or_insert("app", "build").admit(1);
        store.save(&table).await.expect("first save");

        table.segment_or_insert("app", "build").release(1);
        table.segment_or_insert("app", "build").admit(2);
        store.save(&table).await.expect("second save");

        let back = store.load().await.expect("load").expect("some");
        let held: Vec<_> = back
            .segment("app", "build")
            .expect("segment")
            .holding()
            .iter()
            .copied()
            .collect();
        assert_eq!(held, vec![2]);
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_codec_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("segments.json");
        std::fs::write(&path, b"{not json").expect("write");

        let err = FileStore::new(path).load().await.expect_err("corrupt");
        assert_eq!(err.as_label(), "store_codec");
    }
}
