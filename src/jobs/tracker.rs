//! Concurrent job store
//!
//! Maps job ids to their status records. Background download tasks write
//! through [`JobTracker::update`]; polling handlers read snapshots through
//! [`JobTracker::get`]. Records are never evicted.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::record::Job;
use crate::error::{AppError, Result};

#[derive(Debug, Default)]
pub struct JobTracker {
    jobs: DashMap<String, Job>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record. Returns false if the id is already taken; the
    /// existing record is left untouched.
    pub fn create(&self, id: &str, job: Job) -> bool {
        match self.jobs.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(job);
                true
            }
        }
    }

    /// Snapshot of the current record
    pub fn get(&self, id: &str) -> Result<Job> {
        self.jobs
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| AppError::JobNotFound(id.to_string()))
    }

    /// Apply `mutate` to the record if present. Unknown ids are a no-op.
    pub fn update<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        match self.jobs.get_mut(id) {
            Some(mut job) => {
                mutate(job.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs per status
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.jobs.iter() {
            *counts.entry(entry.value().status.as_str()).or_insert(0) += 1;
        }
        counts
    }
}
