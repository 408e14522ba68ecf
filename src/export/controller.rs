//! Export job controller
//!
//! [`ExportJobController`] owns exactly one [`ExportJob`] and drives it from
//! submission through polling to download. All mutation happens under a single
//! lock and is tagged with a generation number that is bumped on every
//! `start`/`reset`/`cancel`; background work (the poll loop and the progress
//! animation) carries the generation it was spawned for and drops anything it
//! observes once the generation has moved on. Polls are issued from one
//! sequential loop, so a new status check is never sent while another is in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::clock::{Clock, TokioClock};
use super::error::{ExportError, JobError};
use super::filter::ExportFilter;
use super::progress::ProgressAnimator;
use super::traits::ExportBackend;
use super::types::{AuthToken, DownloadedFile, ExportJob, ExportStatus, JobId, StatusReport};
use crate::observability::{ExportMetrics, MetricsSnapshot};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(500);
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Timing and give-up policy for one controller
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    pub animation_duration: Duration,
    pub frame_interval: Duration,
    /// Force the job to fail once polling has run this long
    pub max_poll_duration: Option<Duration>,
    /// Force the job to fail after this many consecutive failed status checks
    pub max_poll_failures: Option<u32>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            animation_duration: DEFAULT_ANIMATION_DURATION,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            max_poll_duration: None,
            max_poll_failures: None,
        }
    }
}

struct JobState {
    job: ExportJob,
    generation: u64,
    /// Cancels the poll loop and animation of the current generation
    cancel: CancellationToken,
    animation: Option<CancellationToken>,
    animator: ProgressAnimator,
}

struct Core {
    backend: Arc<dyn ExportBackend>,
    clock: Arc<dyn Clock>,
    token: AuthToken,
    options: ControllerOptions,
    metrics: ExportMetrics,
    state: Mutex<JobState>,
    snapshot_tx: watch::Sender<ExportJob>,
}

/// Drives a single export job for the presentation layer
pub struct ExportJobController {
    core: Arc<Core>,
}

impl ExportJobController {
    pub fn new(backend: Arc<dyn ExportBackend>, token: AuthToken, options: ControllerOptions) -> Self {
        Self::with_clock(backend, token, options, Arc::new(TokioClock))
    }

    pub fn with_clock(
        backend: Arc<dyn ExportBackend>,
        token: AuthToken,
        options: ControllerOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(ExportJob::default());
        let state = JobState {
            job: ExportJob::default(),
            generation: 0,
            cancel: CancellationToken::new(),
            animation: None,
            animator: ProgressAnimator::new(options.animation_duration),
        };

        Self {
            core: Arc::new(Core {
                backend,
                clock,
                token,
                options,
                metrics: ExportMetrics::new(),
                state: Mutex::new(state),
                snapshot_tx,
            }),
        }
    }

    /// Submit a new export, discarding whatever job was active before
    ///
    /// Returns the remote job id once the request is accepted; polling then
    /// continues in the background until a terminal status is reported.
    pub async fn start(&self, filter: ExportFilter) -> Result<JobId, ExportError> {
        let core = &self.core;
        let session = Uuid::now_v7();

        let generation = {
            let mut state = core.lock();
            core.invalidate(&mut state);
            state.job = ExportJob::submitting();
            core.publish(&state);
            state.generation
        };

        core.metrics.export_started();
        info!(%session, generation, filter_fields = filter.as_map().len(), "Submitting export");

        let result = core.backend.start_export(&filter).await;

        let mut state = core.lock();
        if state.generation != generation {
            debug!(%session, generation, "Submission result arrived for a superseded export");
            return Err(ExportError::Superseded);
        }

        match result {
            Ok(accepted) => {
                let status = accepted
                    .status
                    .map(ExportStatus::from)
                    .filter(|status| status.is_in_progress())
                    .unwrap_or(ExportStatus::Queued);

                state.job.job_id = Some(accepted.job_id.clone());
                state.job.status = status;
                state.job.message = accepted.message;
                core.publish(&state);

                let cancel = state.cancel.clone();
                drop(state);

                info!(%session, job_id = %accepted.job_id, %status, "Export accepted");

                let span = info_span!("export_poll", %session, job_id = %accepted.job_id);
                tokio::spawn(
                    poll_loop(Arc::clone(core), generation, accepted.job_id.clone(), cancel)
                        .instrument(span),
                );

                Ok(accepted.job_id)
            }
            Err(err) => {
                warn!(%session, error = %err, "Export submission failed");
                state.job.status = ExportStatus::Failed;
                state.job.error = Some(JobError::submission(&err));
                core.publish(&state);
                core.metrics.export_failed();
                Err(ExportError::Submission(err))
            }
        }
    }

    /// Fetch the file of a completed job
    ///
    /// Fails with [`ExportError::NoFileAvailable`] without touching the network
    /// unless the job is completed and carries a file URL. A failed download
    /// leaves the job completed so the caller can retry.
    pub async fn download(&self) -> Result<DownloadedFile, ExportError> {
        let core = &self.core;

        let (generation, file) = {
            let mut state = core.lock();
            let available = state
                .job
                .file
                .clone()
                .filter(|file| !file.url.trim().is_empty());

            let file = match (state.job.status, available) {
                (ExportStatus::Completed, Some(file)) => file,
                (ExportStatus::Completed, None) => {
                    state.job.error = Some(JobError::NoFileAvailable);
                    core.publish(&state);
                    return Err(ExportError::NoFileAvailable);
                }
                _ => return Err(ExportError::NoFileAvailable),
            };
            (state.generation, file)
        };

        let filename = file
            .filename
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(default_filename);

        info!(url = %file.url, %filename, "Downloading export file");

        let result = core.backend.download_file(&file.url, &core.token).await;

        let mut state = core.lock();
        let current = state.generation == generation;

        match result {
            Ok(bytes) => {
                if current {
                    state.job.error = None;
                    core.publish(&state);
                }
                core.metrics.download();
                info!(%filename, size = bytes.len(), "Export file downloaded");
                Ok(DownloadedFile {
                    filename,
                    bytes,
                    record_count: file.record_count,
                })
            }
            Err(err) => {
                warn!(url = %file.url, error = %err, "Export download failed");
                if current {
                    state.job.error = Some(JobError::download(&err));
                    core.publish(&state);
                }
                Err(ExportError::Download(err))
            }
        }
    }

    /// Stop polling and animation and return to an empty idle job
    pub fn reset(&self) {
        self.clear("reset");
    }

    /// Same as [`reset`](Self::reset); named for user-initiated aborts
    pub fn cancel(&self) {
        self.clear("cancelled");
    }

    fn clear(&self, reason: &'static str) {
        let core = &self.core;
        let mut state = core.lock();
        let was_active = !state.job.is_idle();

        core.invalidate(&mut state);
        state.job = ExportJob::default();
        core.publish(&state);

        if was_active {
            info!(reason, "Export job cleared");
        }
    }

    pub fn snapshot(&self) -> ExportJob {
        self.core.lock().job.clone()
    }

    /// Receiver that observes every change to the job
    pub fn subscribe(&self) -> watch::Receiver<ExportJob> {
        self.core.snapshot_tx.subscribe()
    }

    /// Wait until the job leaves the submitting/polling states
    pub async fn wait_until_settled(&self) -> ExportJob {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|job| !job.status.is_in_progress() && job.status != ExportStatus::Submitting)
            .await
            .map(|job| ExportJob::clone(&job));

        match settled {
            Ok(job) => job,
            Err(_) => self.snapshot(),
        }
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.core.options
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics.snapshot()
    }
}

impl Drop for ExportJobController {
    fn drop(&mut self) {
        self.core.lock().cancel.cancel();
    }
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &JobState) {
        self.snapshot_tx.send_if_modified(|current| {
            if *current == state.job {
                false
            } else {
                *current = state.job.clone();
                true
            }
        });
    }

    /// Cut off all background work of the current generation
    fn invalidate(&self, state: &mut JobState) {
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.generation = state.generation.wrapping_add(1);
        state.animation = None;
        state.animator.reset();
    }

    /// Apply a status report; returns whether polling should continue
    fn apply_report(self: &Arc<Self>, generation: u64, report: StatusReport) -> bool {
        let mut state = self.lock();

        if state.generation != generation || !state.job.status.is_in_progress() {
            debug!(generation, "Dropping status report for an inactive job");
            return false;
        }

        let percent = report.percent();
        let status = state.job.status.advance_to(report.status.into());

        debug!(%status, progress = percent, message = ?report.message, "Status report received");

        state.job.status = status;
        state.job.message = report.message;
        state.job.estimated_time = report.estimated_time;

        if percent != state.job.raw_progress {
            state.job.raw_progress = percent;
            self.animate(&mut state, generation);
        }

        match status {
            ExportStatus::Completed => {
                if report.file.is_none() {
                    warn!("Export completed without a file reference");
                }
                state.job.file = report.file;
                self.metrics.export_completed();
                info!(record_count = ?state.job.file.as_ref().and_then(|f| f.record_count), "Export completed");
            }
            ExportStatus::Failed => {
                state.job.error = Some(JobError::RemoteFailure {
                    message: state.job.message.clone(),
                });
                self.metrics.export_failed();
                warn!(message = ?state.job.message, "Export failed remotely");
            }
            _ => {}
        }

        self.publish(&state);
        !status.is_terminal()
    }

    /// Stop an in-progress job with the given error
    fn fail(&self, generation: u64, error: JobError) {
        let mut state = self.lock();
        if state.generation != generation || !state.job.status.is_in_progress() {
            return;
        }

        warn!(?error, "Giving up on export");
        state.job.status = ExportStatus::Failed;
        state.job.error = Some(error);
        self.publish(&state);
        self.metrics.export_failed();
    }

    fn fail_with_timeout(&self, generation: u64, reason: String) {
        self.fail(generation, JobError::Timeout { reason });
    }

    /// Restart the display animation toward the latest raw progress
    fn animate(self: &Arc<Self>, state: &mut JobState, generation: u64) {
        let now = self.clock.now();
        state.animator.retarget(state.job.raw_progress, now);

        if let Some(previous) = state.animation.take() {
            previous.cancel();
        }

        let token = state.cancel.child_token();
        state.animation = Some(token.clone());
        tokio::spawn(animation_loop(Arc::clone(self), generation, token));
    }
}

async fn poll_loop(core: Arc<Core>, generation: u64, job_id: JobId, cancel: CancellationToken) {
    let interval = core.options.poll_interval;
    let started = core.clock.now();
    let deadline = core.options.max_poll_duration.map(|max| started + max);
    let mut next_tick = started + interval;
    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep_until_deadline(core.clock.as_ref(), deadline) => {
                core.fail_with_timeout(generation, timeout_reason(&core.options));
                break;
            }
            _ = core.clock.sleep_until(next_tick) => {}
        }

        core.metrics.poll();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep_until_deadline(core.clock.as_ref(), deadline) => {
                core.fail_with_timeout(generation, timeout_reason(&core.options));
                break;
            }
            result = core.backend.check_status(&job_id) => result,
        };

        let keep_polling = match result {
            Ok(report) => {
                consecutive_failures = 0;
                core.apply_report(generation, report)
            }
            Err(err) if err.is_unauthorized() => {
                core.metrics.poll_failed();
                core.fail(generation, JobError::status_check(&err));
                false
            }
            Err(err) => {
                consecutive_failures += 1;
                core.metrics.poll_failed();
                warn!(error = %err, consecutive_failures, "Status check failed, retrying on next tick");

                match core.options.max_poll_failures {
                    Some(max) if consecutive_failures >= max => {
                        core.fail_with_timeout(
                            generation,
                            format!("{} consecutive status checks failed", consecutive_failures),
                        );
                        false
                    }
                    _ => true,
                }
            }
        };

        if !keep_polling {
            break;
        }

        let now = core.clock.now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            core.fail_with_timeout(generation, timeout_reason(&core.options));
            break;
        }

        // Ticks missed while a slow check was in flight are skipped, not replayed
        next_tick += interval;
        if next_tick <= now {
            next_tick = now + interval;
        }
    }

    debug!("Polling stopped");
}

/// Resolves at the polling deadline, or never when polling is unbounded
async fn sleep_until_deadline(clock: &dyn Clock, deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => clock.sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn timeout_reason(options: &ControllerOptions) -> String {
    match options.max_poll_duration {
        Some(max) => format!("no terminal status after {:?}", max),
        None => "no terminal status".to_string(),
    }
}

async fn animation_loop(core: Arc<Core>, generation: u64, token: CancellationToken) {
    let frame = core.options.frame_interval.max(Duration::from_millis(1));
    let mut next_frame = core.clock.now() + frame;

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = core.clock.sleep_until(next_frame) => {}
        }

        let settled = {
            let mut state = core.lock();
            if state.generation != generation || token.is_cancelled() {
                return;
            }

            let now = core.clock.now();
            state.job.display_progress = state.animator.display(now);
            core.publish(&state);
            state.animator.is_settled(now)
        };

        if settled {
            return;
        }

        next_frame += frame;
    }
}

fn default_filename() -> String {
    format!("rekap_{}.xlsx", chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ControllerOptions::default();
        assert_eq!(options.poll_interval, Duration::from_secs(2));
        assert_eq!(options.animation_duration, Duration::from_millis(500));
        assert!(options.max_poll_duration.is_none());
        assert!(options.max_poll_failures.is_none());
    }

    #[test]
    fn test_default_filename_shape() {
        let name = default_filename();
        assert!(name.starts_with("rekap_"));
        assert!(name.ends_with(".xlsx"));
    }
}
