use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Segment;

/// Durable mapping `job -> segment name -> Segment`.
///
/// Jobs and segments are created lazily on first use and never deleted.
/// Both levels are ordered maps so a snapshot always serializes identically.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SegmentTable {
    jobs: BTreeMap<String, BTreeMap<String, Segment>>,
}

impl SegmentTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up one segment.
    pub fn segment(&self, job: &str, name: &str) -> Option<&Segment> {
        self.jobs.get(job)?.get(name)
    }

    /// All segments of a job, ordered by name.
    pub fn job(&self, job: &str) -> Option<&BTreeMap<String, Segment>> {
        self.jobs.get(job)
    }

    /// Iterates over known job identifiers.
    pub fn jobs(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn segment_mut(&mut self, job: &str, name: &str) -> Option<&mut Segment> {
        self.jobs.get_mut(job)?.get_mut(name)
    }

    pub(crate) fn job_mut(&mut self, job: &str) -> Option<&mut BTreeMap<String, Segment>> {
        self.jobs.get_mut(job)
    }

    /// Resolves `(job, name)`, creating the job map and the segment on first use.
    pub(crate) fn segment_or_insert(&mut self, job: &str, name: &str) -> &mut Segment {
        self.jobs
            .entry(job.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
    }

    /// Snapshot of the job's segment names other than `except`.
    ///
    /// Taken up front so the caller can mutate segments while walking the list.
    pub(crate) fn sibling_names(&self, job: &str, except: &str) -> Vec<String> {
        self.jobs
            .get(job)
            .map(|segments| {
                segments
                    .keys()
                    .filter(|name| name.as_str() != except)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation() {
        let mut table = SegmentTable::new();
        assert!(table.segment("app", "build").is_none());

        table.segment_or_insert("app", "build").admit(1);
        table.segment_or_insert("app", "test");

        assert_eq!(table.jobs().collect::<Vec<_>>(), vec!["app"]);
        assert!(table.segment("app", "build").expect("created").holding().contains(&1));
        assert_eq!(table.job("app").map(|j| j.len()), Some(2));
    }

    #[test]
    fn test_sibling_names_excludes_target() {
        let mut table = SegmentTable::new();
        for name in ["build", "deploy", "test"] {
            table.segment_or_insert("app", name);
        }
        table.segment_or_insert("other", "lint");

        assert_eq!(table.sibling_names("app", "deploy"), vec!["build", "test"]);
        assert!(table.sibling_names("missing", "x").is_empty());
    }
}
