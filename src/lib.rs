//! printwatch - mirrors a printer fleet's print history from its Android companion app.
//!
//! The app is read through uiautomator dumps and driven with taps and swipes
//! ([`device`]). Dumps become [`screen::Snapshot`]s, history entries become
//! [`print_job::PrintJob`]s held in a [`ledger::JobLedger`], and the
//! [`monitor::Reconciler`] keeps that ledger and the [`mirror`] sheet in step.

pub mod config;
pub mod device;
pub mod ledger;
pub mod mirror;
pub mod monitor;
pub mod print_job;
pub mod screen;

pub use config::Config;
pub use ledger::JobLedger;
pub use monitor::{Outcome, Reconciler, RestartReason};
pub use print_job::{JobIdentity, JobStatus, PrintJob};
