// src/monitor/reconciler.rs - Polling state machine over the printing history
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::device::DeviceDriver;
use crate::ledger::JobLedger;
use crate::mirror::{MirrorStore, MirrorSync};
use crate::print_job::{JobIdentity, JobStatus, ParseError, PrintJob, parse_weight_grams};
use crate::screen::{Bounds, ParseMode, ScreenKey, Snapshot};

use super::navigator::{BACK, Navigator};
use super::{CycleReport, MonitorError, Outcome, RestartReason, proceed};

/// Label preceding the weight and material list on a job's detail page.
pub const FILAMENTS: &str = "Filaments";
/// Present on a device page while the printer reports a problem.
pub const WARNING: &str = "Warning";

/// Owns the ledger and reconciles it against the app and the mirror.
pub struct Reconciler<D, S> {
    nav: Navigator<D>,
    mirror: MirrorSync<S>,
    ledger: JobLedger,
    settings: MonitorConfig,
}

impl<D: DeviceDriver, S: MirrorStore> Reconciler<D, S> {
    pub fn new(device: D, store: S, settings: MonitorConfig) -> Self {
        Self {
            nav: Navigator::new(device),
            mirror: MirrorSync::new(store),
            ledger: JobLedger::new(),
            settings,
        }
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut JobLedger {
        &mut self.ledger
    }

    pub fn navigator(&self) -> &Navigator<D> {
        &self.nav
    }

    pub fn mirror(&self) -> &MirrorSync<S> {
        &self.mirror
    }

    /// Run one cycle and decide how long to wait before the next.
    ///
    /// Restarts and non-fatal errors send the app back to the printing history and
    /// schedule a retry; only a fatal device error is returned.
    pub async fn drive_cycle(&mut self) -> Result<Duration, MonitorError> {
        match self.run_cycle().await {
            Ok(Outcome::Completed(report)) => {
                tracing::info!(
                    "Cycle complete: {} new, {} updated, {} dropped, {} tracked",
                    report.discovered,
                    report.refreshed,
                    report.dropped,
                    report.ledger_size
                );
                tracing::info!("Waiting {}s before next check", self.settings.poll_interval_secs);
                Ok(self.settings.poll_interval())
            }
            Ok(Outcome::Restart(reason)) => {
                tracing::warn!("{}. Restarting loop...", reason);
                self.recover().await?;
                Ok(self.settings.retry_delay())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::error!("Error occurred: {}. Restarting loop...", e);
                self.recover().await?;
                Ok(self.settings.retry_delay())
            }
        }
    }

    /// Seek the latest known job, pick up newer ones, then refresh jobs still printing.
    pub async fn run_cycle(&mut self) -> Result<Outcome<CycleReport>, MonitorError> {
        if self.ledger.is_empty() {
            proceed!(self.seed().await);
        }

        tracing::info!("Checking for new jobs...");
        self.nav.go_to_printing_history().await?;
        let baseline = self.ledger.latest().map(PrintJob::identity);
        if let Some(latest) = &baseline {
            proceed!(self.seek_job(latest).await);
        }
        let discovered = proceed!(self.discover_new(baseline.as_ref()).await);

        tracing::info!("Updating in-progress jobs...");
        let refreshed = proceed!(self.refresh_in_progress().await);

        let dropped = self
            .ledger
            .truncate_to(self.settings.ledger_limit, self.settings.ledger_keep);
        self.export_ledger().await;

        Ok(Outcome::Completed(CycleReport {
            discovered,
            refreshed,
            dropped,
            ledger_size: self.ledger.len(),
        }))
    }

    /// Pick the job to resume from: the oldest one the mirror still shows printing, else
    /// the newest mirrored job, else the first entry in the app's history.
    pub async fn seed(&mut self) -> Result<Outcome<PrintJob>, MonitorError> {
        let job = if let Some(job) = self.mirror.query_oldest_in_progress().await? {
            tracing::info!("Resuming from oldest in-progress job {}", job.name);
            job
        } else if let Some(job) = self.mirror.query_most_recent().await? {
            tracing::info!("Resuming from most recent recorded job {}", job.name);
            job
        } else {
            tracing::info!("No recorded jobs, starting from the first history entry");
            let job = proceed!(self.first_gui_entry().await);
            self.mirror.upsert(&job).await?;
            job
        };
        self.ledger.add(job.clone());
        Ok(Outcome::Completed(job))
    }

    /// Scroll down through the history until `target` is visible and return its live entry.
    pub async fn seek_job(&self, target: &JobIdentity) -> Result<Outcome<PrintJob>, MonitorError> {
        tracing::info!("Scrolling down to locate job {}...", target.name);
        let mut previous: Option<Snapshot> = None;

        for _ in 0..self.settings.max_scroll_iterations {
            let snapshot = self.nav.snapshot(ParseMode::List).await?;
            if previous.as_ref() == Some(&snapshot) {
                break;
            }
            for key in snapshot.keys() {
                if let Some(job) = decode_entry(key)? {
                    if job.is(&target.name, target.started_at) {
                        return Ok(Outcome::Completed(job));
                    }
                }
            }
            self.nav.scroll_down(&snapshot).await?;
            previous = Some(snapshot);
        }

        tracing::warn!("Job {} not found", target);
        Ok(Outcome::Restart(RestartReason::JobNotFound(target.clone())))
    }

    /// Record every visible job newer than `baseline` that the ledger does not know,
    /// scrolling up until the list stops changing. Entries started before the baseline
    /// sit below it in the history and are left alone. Returns how many jobs were added.
    pub async fn discover_new(
        &mut self,
        baseline: Option<&JobIdentity>,
    ) -> Result<Outcome<usize>, MonitorError> {
        tracing::info!("Checking for more recent jobs...");
        let mut snapshot = self.nav.snapshot(ParseMode::List).await?;
        let mut added = 0;

        for _ in 0..self.settings.max_scroll_iterations {
            for (key, bounds) in snapshot.iter() {
                let Some(mut job) = decode_entry(key)? else {
                    continue;
                };
                if baseline.is_some_and(|b| job.started_at < b.started_at)
                    || self.ledger.exists(&job.name, job.started_at)
                {
                    continue;
                }

                let current = self.nav.snapshot(ParseMode::List).await?;
                if current.get(key) != Some(bounds) {
                    return Ok(Outcome::Restart(RestartReason::ScreenDrift {
                        entry: key.to_string(),
                    }));
                }

                self.fetch_details(*bounds, &mut job).await?;
                tracing::info!("New job {} on {} ({})", job.name, job.machine, job.status);
                self.ledger.add(job.clone());
                self.mirror.upsert(&job).await?;
                added += 1;
            }

            self.nav.scroll_up(&snapshot).await?;
            let next = self.nav.snapshot(ParseMode::List).await?;
            if next == snapshot {
                return Ok(Outcome::Completed(added));
            }
            snapshot = next;
        }

        tracing::warn!(
            "History still changing after {} scrolls, ending scan",
            self.settings.max_scroll_iterations
        );
        Ok(Outcome::Completed(added))
    }

    /// Re-read every printing job's status and collect warnings from its machine.
    /// Returns how many jobs changed.
    pub async fn refresh_in_progress(&mut self) -> Result<Outcome<usize>, MonitorError> {
        let targets: Vec<JobIdentity> = self
            .ledger
            .all(Some(JobStatus::Printing.as_str()))
            .into_iter()
            .map(PrintJob::identity)
            .collect();
        let mut changed = 0;

        for identity in targets {
            tracing::info!("Checking in-progress job {}...", identity.name);
            self.nav.go_to_printing_history().await?;
            let live = proceed!(self.seek_job(&identity).await);
            let Some(mut job) = self.ledger.find(&identity.name, identity.started_at).cloned() else {
                continue;
            };

            let mut dirty = false;
            if live.status.is_printing() {
                dirty |= self.check_machine_errors(&mut job).await?;
            }
            if live.status != job.status {
                tracing::info!("Job {} is now {} (was {})", job.name, live.status, job.status);
                job.status = live.status;
                dirty = true;
            }

            if dirty {
                self.ledger.add(job.clone());
                self.mirror.upsert(&job).await?;
                changed += 1;
            }
        }

        Ok(Outcome::Completed(changed))
    }

    /// Open a job's detail page and read its weight and materials.
    pub async fn fetch_details(&self, bounds: Bounds, job: &mut PrintJob) -> Result<(), MonitorError> {
        tracing::info!("Getting details for {}...", job.name);
        self.nav.tap_bounds(bounds).await?;
        let detail = self.nav.snapshot(ParseMode::Innermost).await?;
        if !apply_filament_block(&detail.labels(), job)? {
            tracing::warn!("No filament details for {}", job.name);
        }
        self.nav.tap_by_desc(BACK).await?;
        Ok(())
    }

    /// Open the job's machine page and record its warning text, if any.
    pub async fn check_machine_errors(&self, job: &mut PrintJob) -> Result<bool, MonitorError> {
        tracing::info!("Checking errors on {}...", job.machine);
        if !self.nav.go_to_device_page(&job.machine).await? {
            tracing::warn!("Could not open the page for {}, skipping error check", job.machine);
            return Ok(false);
        }
        if self.nav.find_by_desc(WARNING).await?.is_none() {
            return Ok(false);
        }

        let content = self.nav.snapshot(ParseMode::Innermost).await?;
        let labels = content.labels();
        let Some(text) = labels.get(1) else {
            tracing::warn!("{} shows a warning without a message", job.machine);
            return Ok(false);
        };
        let added = job.push_error(text);
        if added {
            tracing::info!("New warning on {}: {}", job.machine, text);
        }
        Ok(added)
    }

    async fn first_gui_entry(&self) -> Result<Outcome<PrintJob>, MonitorError> {
        self.nav.go_to_printing_history().await?;
        let snapshot = self.nav.snapshot(ParseMode::List).await?;
        for (key, bounds) in snapshot.iter() {
            if let Some(mut job) = decode_entry(key)? {
                self.fetch_details(*bounds, &mut job).await?;
                return Ok(Outcome::Completed(job));
            }
        }
        Ok(Outcome::Restart(RestartReason::EmptyHistory))
    }

    async fn recover(&self) -> Result<(), MonitorError> {
        match self.nav.go_to_printing_history().await {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Could not return to printing history: {}", e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn export_ledger(&self) {
        let Some(path) = &self.settings.ledger_export else {
            return;
        };
        let json = match self.ledger.to_json(true) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize ledger: {}", e);
                return;
            }
        };
        if let Err(e) = tokio::fs::write(path, json).await {
            tracing::warn!("Failed to export ledger to {}: {}", path.display(), e);
        }
    }
}

/// History entries are multi-line; single labels are headers and buttons.
fn decode_entry(key: &ScreenKey) -> Result<Option<PrintJob>, ParseError> {
    key.fields().map(PrintJob::from_entry).transpose()
}

/// Fill weight and materials from a detail page's leaf labels.
///
/// After the landmark come the weight, then material names followed by the same number
/// of AMS slot labels, then one trailing control. Returns `false` when the landmark is
/// missing or the job already has details.
pub fn apply_filament_block(labels: &[&str], job: &mut PrintJob) -> Result<bool, ParseError> {
    let Some(index) = labels.iter().position(|l| *l == FILAMENTS) else {
        return Ok(false);
    };
    if job.has_details() {
        return Ok(false);
    }
    let Some(weight) = labels.get(index + 1) else {
        return Ok(false);
    };
    job.weight_grams = parse_weight_grams(weight)?;

    let start = index + 2;
    let end = labels.len().saturating_sub(1);
    if start < end {
        let slots = &labels[start..end];
        job.materials
            .extend(slots[..slots.len() / 2].iter().map(|m| m.to_string()));
    }
    Ok(true)
}
