// src/print_job.rs - Print jobs as read from the companion app
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Timestamp format used by both the app labels and the mirror rows.
pub const DATE_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Joins materials and errors into a single mirror cell.
pub const LIST_SEPARATOR: &str = ", ";

static EMBEDDED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d{2}/\d{2}/\d{4}) (\d{2}:\d{2})\)").expect("static regex")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*([A-Za-z]+)\s*$").expect("static regex")
});

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Could not find date/time in: {0:?}")]
    MissingDate(String),
    #[error("Invalid date/time {value:?}: {reason}")]
    InvalidDate { value: String, reason: String },
    #[error("Unrecognised duration: {0:?}")]
    Duration(String),
    #[error("Unrecognised weight: {0:?}")]
    Weight(String),
    #[error("Unrecognised number: {0:?}")]
    Number(String),
    #[error("History entry has {0} fields, expected 6 or 7")]
    EntryShape(usize),
    #[error("Row has {0} columns, expected at least 7")]
    MissingColumns(usize),
}

/// Job status as shown by the app. The set is open; comparisons ignore case.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Printing,
    Finished,
    Failed,
    Stopped,
    Other(String),
}

impl JobStatus {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        [JobStatus::Printing, JobStatus::Finished, JobStatus::Failed, JobStatus::Stopped]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label))
            .unwrap_or_else(|| JobStatus::Other(label.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Printing => "Printing",
            JobStatus::Finished => "Finished",
            JobStatus::Failed => "Failed",
            JobStatus::Stopped => "Stopped",
            JobStatus::Other(label) => label,
        }
    }

    pub fn is_printing(&self) -> bool {
        matches!(self, JobStatus::Printing)
    }

    pub fn matches(&self, label: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(label.trim())
    }
}

impl PartialEq for JobStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }
}

impl Eq for JobStatus {}

impl FromStr for JobStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The (name, start time) pair that names a job across the app, the ledger and the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobIdentity {
    pub name: String,
    pub started_at: NaiveDateTime,
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.started_at.format(DATE_FORMAT))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintJob {
    pub name: String,
    pub status: JobStatus,
    pub started_at: NaiveDateTime,
    pub duration_hours: f64,
    pub machine: String,
    pub weight_grams: f64,
    pub materials: Vec<String>,
    pub errors: Vec<String>,
}

impl PrintJob {
    pub fn new(
        name: impl Into<String>,
        status: JobStatus,
        started_at: NaiveDateTime,
        duration_hours: f64,
        machine: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            started_at,
            duration_hours,
            machine: machine.into(),
            weight_grams: 0.0,
            materials: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Decode one history list entry.
    ///
    /// Entries carry `[cover, status, name, duration, machine, date label]`; some app
    /// versions insert an extra field at index 3, which is dropped.
    pub fn from_entry(fields: &[String]) -> Result<Self, ParseError> {
        let mut fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        if fields.len() == 7 {
            fields.remove(3);
        }
        let [_, status, name, duration, machine, date] = fields[..] else {
            return Err(ParseError::EntryShape(fields.len()));
        };
        Ok(Self::new(
            name,
            JobStatus::parse(status),
            parse_job_date(date)?,
            parse_duration_hours(duration)?,
            machine,
        ))
    }

    pub fn identity(&self) -> JobIdentity {
        JobIdentity {
            name: self.name.clone(),
            started_at: self.started_at,
        }
    }

    pub fn is(&self, name: &str, started_at: NaiveDateTime) -> bool {
        self.name == name && self.started_at == started_at
    }

    /// Append an error unless its text is already recorded.
    pub fn push_error(&mut self, error: &str) -> bool {
        let error = error.trim();
        if error.is_empty() || error_listed(&self.errors, error) {
            return false;
        }
        self.errors.push(error.to_string());
        true
    }

    pub fn merge_errors<'a>(&mut self, errors: impl IntoIterator<Item = &'a str>) -> usize {
        errors.into_iter().filter(|e| self.push_error(e)).count()
    }

    /// Weight and materials come from the detail page and are filled at most once.
    pub fn has_details(&self) -> bool {
        self.weight_grams != 0.0 || !self.materials.is_empty()
    }
}

/// Whether `text` already appears in `errors`, either as one entry or as a run of
/// consecutive entries. Warning texts may contain the list separator, so a stored cell
/// split back into pieces must still match the original message.
pub fn error_listed(errors: &[String], text: &str) -> bool {
    if errors.iter().any(|e| e == text) {
        return true;
    }
    let joined = format!("{LIST_SEPARATOR}{}{LIST_SEPARATOR}", errors.join(LIST_SEPARATOR));
    joined.contains(&format!("{LIST_SEPARATOR}{text}{LIST_SEPARATOR}"))
}

/// Extract the `(MM/DD/YYYY HH:MM)` timestamp embedded in a label such as
/// `Plate 1 (10/10/2025 23:41)`.
pub fn parse_job_date(label: &str) -> Result<NaiveDateTime, ParseError> {
    let caps = EMBEDDED_DATE
        .captures(label)
        .ok_or_else(|| ParseError::MissingDate(label.to_string()))?;
    let value = format!("{} {}", &caps[1], &caps[2]);
    NaiveDateTime::parse_from_str(&value, DATE_FORMAT).map_err(|e| ParseError::InvalidDate {
        value,
        reason: e.to_string(),
    })
}

/// Normalise a duration label (`90s`, `90min`, `2h`) to hours, rounded to one decimal.
pub fn parse_duration_hours(text: &str) -> Result<f64, ParseError> {
    let caps = DURATION
        .captures(text)
        .ok_or_else(|| ParseError::Duration(text.to_string()))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| ParseError::Duration(text.to_string()))?;
    let hours = match caps[2].to_ascii_lowercase().as_str() {
        "s" | "sec" => value / 3600.0,
        "m" | "min" => value / 60.0,
        "h" => value,
        _ => return Err(ParseError::Duration(text.to_string())),
    };
    Ok((hours * 10.0).round() / 10.0)
}

/// Parse a weight label such as `12.5g` or `12.5 g`.
pub fn parse_weight_grams(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('g').unwrap_or(trimmed).trim();
    number
        .parse()
        .map_err(|_| ParseError::Weight(text.to_string()))
}
