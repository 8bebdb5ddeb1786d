// src/mirror/mod.rs - Spreadsheet mirror of the job ledger
pub mod csv_sheet;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::print_job::{DATE_FORMAT, JobStatus, LIST_SEPARATOR, ParseError, PrintJob, error_listed};

pub use csv_sheet::CsvSheet;
pub use memory::MemorySheet;

/// Number of columns written per job.
pub const COLUMNS: usize = 8;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Rows are 1-indexed, got row {0}")]
    InvalidRow(usize),
    #[error("Store task failed: {0}")]
    Task(String),
}

/// A tabular store addressed by 1-indexed rows of text cells.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError>;
    async fn write_row(&self, index: usize, values: &[String]) -> Result<(), StoreError>;
}

/// Keeps one row per job identity in a `MirrorStore`.
pub struct MirrorSync<S> {
    store: S,
}

impl<S: MirrorStore> MirrorSync<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write `job` over its existing row, or append it. Returns the row written.
    pub async fn upsert(&self, job: &PrintJob) -> Result<usize, StoreError> {
        let rows = self.store.read_all_rows().await?;
        let (index, stored) = match find_job_row(&rows, &job.name, job.started_at) {
            Some(index) => (index, rows.get(index - 1).map(Vec::as_slice)),
            None => (rows.len() + 1, None),
        };
        let values = job_to_row(job, stored);
        self.store.write_row(index, &values).await?;
        tracing::info!("Mirrored {} ({}) to row {}", job.name, job.status, index);
        Ok(index)
    }

    /// Oldest recorded job whose status is still `Printing`.
    pub async fn query_oldest_in_progress(&self) -> Result<Option<PrintJob>, StoreError> {
        Ok(self
            .parsed_rows()
            .await?
            .into_iter()
            .filter(|j| j.status == JobStatus::Printing)
            .min_by_key(|j| j.started_at))
    }

    pub async fn query_most_recent(&self) -> Result<Option<PrintJob>, StoreError> {
        Ok(self
            .parsed_rows()
            .await?
            .into_iter()
            .max_by_key(|j| j.started_at))
    }

    async fn parsed_rows(&self) -> Result<Vec<PrintJob>, StoreError> {
        let rows = self.store.read_all_rows().await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| match row_to_job(row) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::debug!("Skipping mirror row {}: {}", i + 1, e);
                    None
                }
            })
            .collect())
    }
}

/// 1-indexed row holding the job with this identity.
pub fn find_job_row(rows: &[Vec<String>], name: &str, started_at: NaiveDateTime) -> Option<usize> {
    rows.iter().position(|row| {
        if row.len() < 3 {
            return false;
        }
        let Ok(row_date) = NaiveDateTime::parse_from_str(row[2].trim(), DATE_FORMAT) else {
            return false;
        };
        row[0].trim() == name && row_date == started_at
    })
    .map(|i| i + 1)
}

/// Cells for `job`. Errors already stored in the row are kept alongside the job's own.
pub fn job_to_row(job: &PrintJob, stored: Option<&[String]>) -> Vec<String> {
    let mut errors = job.errors.clone();
    if let Some(cell) = stored.and_then(|row| row.get(7)) {
        for item in split_list(cell) {
            if !error_listed(&errors, &item) {
                errors.push(item);
            }
        }
    }
    vec![
        job.name.clone(),
        job.status.to_string(),
        job.started_at.format(DATE_FORMAT).to_string(),
        job.duration_hours.to_string(),
        job.machine.clone(),
        job.weight_grams.to_string(),
        job.materials.join(LIST_SEPARATOR),
        errors.join(LIST_SEPARATOR),
    ]
}

pub fn row_to_job(row: &[String]) -> Result<PrintJob, ParseError> {
    if row.len() < COLUMNS - 1 {
        return Err(ParseError::MissingColumns(row.len()));
    }
    let date = row[2].trim();
    let started_at = NaiveDateTime::parse_from_str(date, DATE_FORMAT).map_err(|e| {
        ParseError::InvalidDate {
            value: date.to_string(),
            reason: e.to_string(),
        }
    })?;
    let mut job = PrintJob::new(
        row[0].trim(),
        JobStatus::parse(&row[1]),
        started_at,
        parse_number(&row[3])?,
        row[4].trim(),
    );
    job.weight_grams = parse_number(&row[5])?;
    job.materials = split_list(&row[6]);
    job.errors = row.get(7).map(|cell| split_list(cell)).unwrap_or_default();
    Ok(job)
}

fn parse_number(cell: &str) -> Result<f64, ParseError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(0.0);
    }
    cell.parse().map_err(|_| ParseError::Number(cell.to_string()))
}

fn split_list(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
