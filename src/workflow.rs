use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::client::{DubbingApi, DubbingApiFactory};
use crate::config::Config;
use crate::error::Result;
use crate::job::{DubbingRequest, Job, JobState};
use crate::poller::{JobObserver, TaskPoller, TrackOutcome};
use crate::voice;

/// Command-line choices for a new dubbing job. Unset fields come from the config.
#[derive(Debug, Clone, Default)]
pub struct DubOptions {
    pub url: String,
    pub voice_id: Option<String>,
    pub language: Option<String>,
    pub keep_background_noise: bool,
    pub no_auto_sync: bool,
}

/// Result of [`Workflow::dub`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DubOutcome {
    /// Submitted without waiting for the result
    Submitted(Job),
    /// Tracked until tracking ended
    Finished { job_id: String, outcome: TrackOutcome },
}

pub struct Workflow {
    config: Config,
    api: Arc<dyn DubbingApi>,
    poller: TaskPoller,
    show_progress: bool,
}

impl Workflow {
    /// Build a workflow against the configured HTTP backend
    pub fn new(config: Config) -> Result<Self> {
        let api = DubbingApiFactory::create_client(&config.api)?;
        Ok(Self::with_api(config, api))
    }

    /// Build a workflow around an existing backend client
    pub fn with_api(config: Config, api: Arc<dyn DubbingApi>) -> Self {
        let poller = TaskPoller::new(Arc::clone(&api), &config.tracking);
        Self {
            config,
            api,
            poller,
            show_progress: true,
        }
    }

    pub fn with_progress_display(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Turn command-line options into a backend request
    pub fn build_request(&self, options: &DubOptions) -> DubbingRequest {
        let defaults = &self.config.dubbing;
        let voice_id = options
            .voice_id
            .clone()
            .unwrap_or_else(|| defaults.voice_id.clone());
        let target_language = voice::resolve_language(&voice_id, options.language.as_deref());

        DubbingRequest {
            url: options.url.trim().to_string(),
            target_language,
            voice_id,
            remove_background_noise: defaults.remove_background_noise
                && !options.keep_background_noise,
            auto_sync: defaults.auto_sync && !options.no_auto_sync,
        }
    }

    /// Submit a dubbing job and, unless `detach` is set, follow it to the end.
    ///
    /// A failed submission is returned as an error and no tracking starts.
    pub async fn dub(&self, request: &DubbingRequest, detach: bool) -> Result<DubOutcome> {
        request.validate()?;
        info!(
            "Submitting {} for dubbing into {} with voice {}",
            request.url, request.target_language, request.voice_id
        );

        let job = self.api.submit(request).await?;
        info!("Job {} submitted ({})", job.id, job.status());

        if detach {
            return Ok(DubOutcome::Submitted(job));
        }

        // The server may already know the answer at submission time
        let outcome = match &job.state {
            JobState::Completed { output_url } => TrackOutcome::Completed(output_url.clone()),
            JobState::Failed { error } => TrackOutcome::Failed(error.clone()),
            JobState::Queued | JobState::Running => self.follow(&job.id).await,
        };

        Ok(DubOutcome::Finished { job_id: job.id, outcome })
    }

    /// Single status check
    pub async fn status(&self, task_id: &str) -> Result<Job> {
        self.api.poll(task_id).await
    }

    /// Track an existing job until it ends, the user interrupts, or a status check fails.
    pub async fn follow(&self, task_id: &str) -> TrackOutcome {
        let observer = ProgressObserver::new(task_id, self.show_progress);
        let mut handle = self.poller.track(task_id, observer);

        tokio::select! {
            outcome = handle.outcome() => outcome,
            _ = interrupted() => {
                warn!(
                    "Interrupted, no longer tracking job {} (it keeps running on the server)",
                    task_id
                );
                handle.cancel();
                handle.outcome().await
            }
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Draws tracking progress on the terminal
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(task_id: &str, visible: bool) -> Self {
        let bar = if visible { ProgressBar::new(100) } else { ProgressBar::hidden() };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(format!("job {}", task_id));
        Self { bar }
    }
}

impl JobObserver for ProgressObserver {
    fn on_progress(&mut self, progress: u8) {
        self.bar.set_position(u64::from(progress));
    }

    fn on_complete(&mut self, _output_url: &str) {
        self.bar.set_position(100);
        self.bar.finish_with_message("done");
    }

    fn on_failure(&mut self, message: &str) {
        self.bar.abandon_with_message(format!("failed: {}", message));
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockDubbingApi;
    use crate::error::DubberError;
    use mockall::Sequence;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.tracking.poll_interval_ms = 10;
        config
    }

    fn workflow(api: MockDubbingApi) -> Workflow {
        Workflow::with_api(test_config(), Arc::new(api)).with_progress_display(false)
    }

    fn options(url: &str) -> DubOptions {
        DubOptions { url: url.to_string(), ..Default::default() }
    }

    fn job(progress: u8, state: JobState) -> Job {
        Job { id: "t1".to_string(), progress, state }
    }

    #[test]
    fn test_build_request_uses_config_defaults() {
        let wf = workflow(MockDubbingApi::new());
        let request = wf.build_request(&options(" https://youtube.com/watch?v=abc "));
        assert_eq!(
            request,
            DubbingRequest {
                url: "https://youtube.com/watch?v=abc".to_string(),
                target_language: "pt-BR".to_string(),
                voice_id: "default".to_string(),
                remove_background_noise: true,
                auto_sync: true,
            }
        );
    }

    #[test]
    fn test_build_request_overrides() {
        let wf = workflow(MockDubbingApi::new());
        let request = wf.build_request(&DubOptions {
            url: "https://vimeo.com/1".to_string(),
            voice_id: Some("male_es".to_string()),
            language: None,
            keep_background_noise: true,
            no_auto_sync: true,
        });
        assert_eq!(request.voice_id, "male_es");
        assert_eq!(request.target_language, "es-ES");
        assert!(!request.remove_background_noise);
        assert!(!request.auto_sync);
    }

    #[tokio::test]
    async fn test_unreachable_server_never_starts_tracking() {
        let mut api = MockDubbingApi::new();
        api.expect_submit()
            .times(1)
            .returning(|_| Err(DubberError::Connection("connection refused".to_string())));
        api.expect_poll().times(0);

        let wf = workflow(api);
        let request = wf.build_request(&options("https://youtube.com/watch?v=abc"));
        let err = wf.dub(&request, false).await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_submitted() {
        let mut api = MockDubbingApi::new();
        api.expect_submit().times(0);

        let wf = workflow(api);
        let request = wf.build_request(&options("https://example.com/about"));
        let err = wf.dub(&request, false).await.unwrap_err();
        assert!(matches!(err, DubberError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_detached_submission_returns_job() {
        let mut api = MockDubbingApi::new();
        api.expect_submit()
            .withf(|req| req.voice_id == "default" && req.auto_sync)
            .times(1)
            .returning(|_| Ok(job(0, JobState::Queued)));
        api.expect_poll().times(0);

        let wf = workflow(api);
        let request = wf.build_request(&options("https://youtube.com/watch?v=abc"));
        let outcome = wf.dub(&request, true).await.unwrap();
        assert_eq!(outcome, DubOutcome::Submitted(job(0, JobState::Queued)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dub_tracks_to_completion() {
        let mut seq = Sequence::new();
        let mut api = MockDubbingApi::new();
        api.expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(job(0, JobState::Queued)));
        api.expect_poll()
            .withf(|id| id == "t1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(job(25, JobState::Running)));
        api.expect_poll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(job(60, JobState::Running)));
        api.expect_poll()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let output_url = "https://cdn.example.com/out.mp4".to_string();
                Ok(job(100, JobState::Completed { output_url }))
            });

        let wf = workflow(api);
        let request = wf.build_request(&options("https://youtube.com/watch?v=abc"));
        let outcome = wf.dub(&request, false).await.unwrap();
        assert_eq!(
            outcome,
            DubOutcome::Finished {
                job_id: "t1".to_string(),
                outcome: TrackOutcome::Completed("https://cdn.example.com/out.mp4".to_string()),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_reports_server_failure() {
        let mut api = MockDubbingApi::new();
        api.expect_poll().times(1).returning(|_| {
            Ok(job(40, JobState::Failed { error: "unsupported source".to_string() }))
        });

        let wf = workflow(api);
        assert_eq!(wf.follow("t1").await, TrackOutcome::Failed("unsupported source".to_string()));
    }

    #[tokio::test]
    async fn test_status_is_a_single_poll() {
        let mut api = MockDubbingApi::new();
        api.expect_poll()
            .times(1)
            .returning(|_| Ok(job(25, JobState::Running)));

        let wf = workflow(api);
        let current = wf.status("t1").await.unwrap();
        assert_eq!(current.progress, 25);
    }
}
