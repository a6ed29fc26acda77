//! Tracking of a submitted dubbing job until it reaches a terminal state.
//!
//! [`TaskPoller::track`] spawns a timer-driven task that polls the backend on a
//! fixed interval and reports through a [`JobObserver`]. The returned
//! [`TrackingHandle`] owns the cancellation token: cancelling or dropping it
//! stops polling. Nothing is sent to the server in that case, the job simply
//! stops being observed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::DubbingApi;
use crate::config::TrackingConfig;
use crate::job::JobState;

/// Message handed to observers when a status check fails.
pub const STATUS_CHECK_FAILED: &str = "status check failed";

/// Receives the progress and the single terminal outcome of a tracked job.
///
/// Exactly one of `on_complete` or `on_failure` is called, at most once, and
/// only if tracking was not cancelled first.
pub trait JobObserver: Send + 'static {
    fn on_progress(&mut self, progress: u8);
    fn on_complete(&mut self, output_url: &str);
    fn on_failure(&mut self, message: &str);
}

/// [`JobObserver`] built from three closures
pub struct Callbacks<P, C, F> {
    on_progress: P,
    on_complete: C,
    on_failure: F,
}

impl<P, C, F> Callbacks<P, C, F>
where
    P: FnMut(u8) + Send + 'static,
    C: FnMut(&str) + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    pub fn new(on_progress: P, on_complete: C, on_failure: F) -> Self {
        Self { on_progress, on_complete, on_failure }
    }
}

impl<P, C, F> JobObserver for Callbacks<P, C, F>
where
    P: FnMut(u8) + Send + 'static,
    C: FnMut(&str) + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    fn on_progress(&mut self, progress: u8) {
        (self.on_progress)(progress)
    }

    fn on_complete(&mut self, output_url: &str) {
        (self.on_complete)(output_url)
    }

    fn on_failure(&mut self, message: &str) {
        (self.on_failure)(message)
    }
}

/// How tracking ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The job completed; carries the output URL
    Completed(String),
    /// The server reported the job as failed; carries its message
    Failed(String),
    /// A status check failed and tracking gave up. The job may still be
    /// running server-side. Carries the underlying error.
    Aborted(String),
    /// The caller stopped tracking before a terminal state was seen
    Cancelled,
}

impl TrackOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrackOutcome::Completed(_))
    }
}

/// Polls the dubbing backend for job status
#[derive(Clone)]
pub struct TaskPoller {
    api: Arc<dyn DubbingApi>,
    interval: Duration,
    max_poll_failures: u32,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn DubbingApi>, config: &TrackingConfig) -> Self {
        Self {
            api,
            // tokio intervals reject a zero period
            interval: config.poll_interval().max(Duration::from_millis(1)),
            max_poll_failures: config.max_poll_failures,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `job_id` in the background.
    ///
    /// The first status check happens one interval from now. Must be called
    /// from within a tokio runtime.
    pub fn track<O: JobObserver>(&self, job_id: impl Into<String>, observer: O) -> TrackingHandle {
        let job_id = job_id.into();
        let cancel = CancellationToken::new();

        let run = TrackingRun {
            api: Arc::clone(&self.api),
            job_id: job_id.clone(),
            interval: self.interval,
            max_poll_failures: self.max_poll_failures,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(run.run(observer));

        TrackingHandle {
            job_id,
            cancel,
            task: Some(task),
            outcome: None,
            detached: false,
        }
    }
}

struct TrackingRun {
    api: Arc<dyn DubbingApi>,
    job_id: String,
    interval: Duration,
    max_poll_failures: u32,
    cancel: CancellationToken,
}

impl TrackingRun {
    async fn run<O: JobObserver>(self, mut observer: O) -> TrackOutcome {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            job_id = %self.job_id,
            poll_interval_ms = self.interval.as_millis() as u64,
            "Tracking dubbing job",
        );

        let mut last_progress: Option<u8> = None;
        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                _ = ticker.tick() => {}
            }

            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                polled = self.api.poll(&self.job_id) => polled,
            };

            let job = match polled {
                Ok(job) => {
                    consecutive_failures = 0;
                    job
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures > self.max_poll_failures {
                        error!(
                            job_id = %self.job_id,
                            error = %e,
                            "Status check failed, tracking aborted",
                        );
                        observer.on_failure(STATUS_CHECK_FAILED);
                        return TrackOutcome::Aborted(e.to_string());
                    }
                    warn!(
                        job_id = %self.job_id,
                        error = %e,
                        attempt = consecutive_failures,
                        "Status check failed, will retry on next tick",
                    );
                    continue;
                }
            };

            match job.state {
                JobState::Completed { output_url } => {
                    info!(job_id = %self.job_id, output_url = %output_url, "Dubbing job completed");
                    observer.on_complete(&output_url);
                    return TrackOutcome::Completed(output_url);
                }
                JobState::Failed { error } => {
                    warn!(job_id = %self.job_id, error = %error, "Dubbing job failed");
                    observer.on_failure(&error);
                    return TrackOutcome::Failed(error);
                }
                JobState::Queued | JobState::Running => {
                    if let Some(previous) = last_progress {
                        if job.progress < previous {
                            warn!(
                                job_id = %self.job_id,
                                previous,
                                current = job.progress,
                                "Server reported lower progress than before",
                            );
                        }
                    }
                    debug!(job_id = %self.job_id, progress = job.progress, "Job in progress");
                    last_progress = Some(job.progress);
                    observer.on_progress(job.progress);
                }
            }
        }
    }

    fn cancelled(&self) -> TrackOutcome {
        info!(job_id = %self.job_id, "Tracking cancelled, job left running on the server");
        TrackOutcome::Cancelled
    }
}

/// Ownership of a running tracking task.
///
/// Dropping the handle cancels tracking unless [`TrackingHandle::detach`] was
/// called.
pub struct TrackingHandle {
    job_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<TrackOutcome>>,
    outcome: Option<TrackOutcome>,
    detached: bool,
}

impl TrackingHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stop polling. No status check is started after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for tracking to end and return how it ended.
    ///
    /// Safe to call again after it resolved; the outcome is kept.
    pub async fn outcome(&mut self) -> TrackOutcome {
        if let Some(task) = self.task.as_mut() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        job_id = %self.job_id,
                        error = %e,
                        "Tracking task terminated abnormally",
                    );
                    TrackOutcome::Aborted(format!("tracking task failed: {}", e))
                }
            };
            self.task = None;
            self.outcome = Some(outcome);
        }
        self.outcome.clone().unwrap_or(TrackOutcome::Cancelled)
    }

    /// Let tracking run to a terminal state without keeping the handle.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        if !self.detached && self.task.is_some() {
            self.cancel.cancel();
        }
    }
}
