// src/ledger.rs - In-memory set of known print jobs
use chrono::NaiveDateTime;

use crate::print_job::{JobStatus, PrintJob};

pub const DEFAULT_LEDGER_LIMIT: usize = 100;
pub const DEFAULT_LEDGER_KEEP: usize = 50;

/// Jobs unique by (name, start time), kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct JobLedger {
    jobs: Vec<PrintJob>,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job, or merge it into the entry with the same identity.
    ///
    /// Returns `true` when a new entry was created.
    pub fn add(&mut self, job: PrintJob) -> bool {
        let Some(existing) = self.find_mut(&job.name, job.started_at) else {
            self.jobs.push(job);
            return true;
        };
        existing.status = job.status;
        if !existing.has_details() {
            existing.weight_grams = job.weight_grams;
            existing.materials = job.materials;
        }
        existing.merge_errors(job.errors.iter().map(String::as_str));
        false
    }

    pub fn find(&self, name: &str, started_at: NaiveDateTime) -> Option<&PrintJob> {
        self.jobs.iter().find(|j| j.is(name, started_at))
    }

    pub fn find_mut(&mut self, name: &str, started_at: NaiveDateTime) -> Option<&mut PrintJob> {
        self.jobs.iter_mut().find(|j| j.is(name, started_at))
    }

    pub fn exists(&self, name: &str, started_at: NaiveDateTime) -> bool {
        self.find(name, started_at).is_some()
    }

    /// All jobs, optionally only those whose status matches `status` (ignoring case).
    pub fn all(&self, status: Option<&str>) -> Vec<&PrintJob> {
        self.jobs
            .iter()
            .filter(|j| status.is_none_or(|s| j.status.matches(s)))
            .collect()
    }

    pub fn latest(&self) -> Option<&PrintJob> {
        self.jobs.iter().max_by_key(|j| j.started_at)
    }

    pub fn oldest_in_progress(&self) -> Option<&PrintJob> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Printing)
            .min_by_key(|j| j.started_at)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Once the ledger holds more than `limit` jobs, keep only the `keep` most recently
    /// inserted. Returns how many were dropped.
    pub fn truncate_to(&mut self, limit: usize, keep: usize) -> usize {
        if self.jobs.len() <= limit {
            return 0;
        }
        let dropped = self.jobs.len().saturating_sub(keep);
        self.jobs.drain(..dropped);
        tracing::debug!("Dropped {} old jobs from ledger", dropped);
        dropped
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(&self.jobs)
        } else {
            serde_json::to_string(&self.jobs)
        }
    }
}
