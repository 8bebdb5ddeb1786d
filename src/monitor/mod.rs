// src/monitor/mod.rs - Screen-state reconciliation
/// Unwrap a `Result<Outcome<T>, _>`, returning early on errors and restarts.
macro_rules! proceed {
    ($step:expr) => {
        match $step? {
            $crate::monitor::Outcome::Completed(value) => value,
            $crate::monitor::Outcome::Restart(reason) => {
                return Ok($crate::monitor::Outcome::Restart(reason));
            }
        }
    };
}
pub(crate) use proceed;

pub mod navigator;
pub mod reconciler;

use std::fmt;

use thiserror::Error;

use crate::device::DeviceError;
use crate::mirror::StoreError;
use crate::print_job::{JobIdentity, ParseError};
use crate::screen::ScreenError;

pub use navigator::Navigator;
pub use reconciler::Reconciler;

/// Failures that abandon the current polling cycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Screen error: {0}")]
    Screen(#[from] ScreenError),
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Mirror error: {0}")]
    Store(#[from] StoreError),
}

impl MonitorError {
    /// Only a device that cannot be driven at all ends the daemon.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MonitorError::Device(e) if e.is_fatal())
    }
}

/// Why a cycle gave up and must start over from the history screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    /// The list stopped scrolling without showing this job.
    JobNotFound(JobIdentity),
    /// The list moved between reading an entry and tapping it.
    ScreenDrift { entry: String },
    /// The history screen showed no job entries at all.
    EmptyHistory,
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::JobNotFound(identity) => write!(f, "Job {} not found", identity),
            RestartReason::ScreenDrift { entry } => {
                write!(f, "Screen changed while reading entry '{}'", entry)
            }
            RestartReason::EmptyHistory => f.write_str("Printing history is empty"),
        }
    }
}

/// Result of a reconciliation step that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Restart(RestartReason),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Restart(reason) => Outcome::Restart(reason),
        }
    }

    pub fn is_restart(&self) -> bool {
        matches!(self, Outcome::Restart(_))
    }
}

/// What one full polling cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub discovered: usize,
    pub refreshed: usize,
    pub dropped: usize,
    pub ledger_size: usize,
}
