//! Dubbing job model and its wire representation.
//!
//! The backend speaks a loose JSON shape where `output_url` and `error` are
//! both nullable. [`Job`] tightens that: a result exists only on a completed
//! job and an error only on a failed one.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DubberError, Result};
use crate::voice::is_supported_video_url;

/// Message used when the backend reports a failure without any detail.
pub const FALLBACK_FAILURE_MESSAGE: &str = "video processing failed";

/// Body of `POST /api/dub`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubbingRequest {
    pub url: String,
    pub target_language: String,
    pub voice_id: String,
    pub remove_background_noise: bool,
    pub auto_sync: bool,
}

impl DubbingRequest {
    /// Reject requests the backend could never process.
    pub fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(DubberError::InvalidRequest("video url is empty".to_string()));
        }
        if !is_supported_video_url(url) {
            return Err(DubberError::InvalidRequest(format!(
                "'{}' does not look like a video link",
                url
            )));
        }
        if self.target_language.trim().is_empty() {
            return Err(DubberError::InvalidRequest("target language is empty".to_string()));
        }
        if self.voice_id.trim().is_empty() {
            return Err(DubberError::InvalidRequest("voice id is empty".to_string()));
        }
        Ok(())
    }
}

/// Response body shared by the submission and status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DubbingResponse {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Map a backend status string. Anything unknown counts as in progress.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "queued" | "pending" => Self::Queued,
            _ => Self::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Completed { output_url: String },
    Failed { error: String },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Queued => JobStatus::Queued,
            Self::Running => JobStatus::Running,
            Self::Completed { .. } => JobStatus::Completed,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// One dubbing request as last observed on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub progress: u8,
    pub state: JobState,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn result(&self) -> Option<&str> {
        match &self.state {
            JobState::Completed { output_url } => Some(output_url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Fold a newer observation into this one.
    ///
    /// A terminal job is frozen: later observations never change its status,
    /// result or error.
    pub fn observe(self, next: Job) -> Job {
        if self.is_terminal() { self } else { next }
    }
}

impl DubbingResponse {
    /// Convert into a [`Job`], resolving a relative `output_url` against `base_url`.
    pub fn into_job(self, base_url: &Url) -> Result<Job> {
        let progress = if self.progress.is_finite() {
            self.progress.clamp(0.0, 100.0).round() as u8
        } else {
            0
        };

        let state = match JobStatus::from_wire(&self.status) {
            JobStatus::Queued => JobState::Queued,
            JobStatus::Running => JobState::Running,
            JobStatus::Completed => {
                let raw = self
                    .output_url
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| DubberError::Server {
                        status: 200,
                        message: format!("task {} completed without an output url", self.task_id),
                    })?;
                let output_url = resolve_output_url(base_url, &self.task_id, &raw)?;
                JobState::Completed { output_url }
            }
            JobStatus::Failed => JobState::Failed {
                error: self
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string()),
            },
        };

        Ok(Job {
            id: self.task_id,
            progress,
            state,
        })
    }
}

/// Absolute URLs are returned exactly as sent; relative ones are joined onto `base_url`.
fn resolve_output_url(base_url: &Url, task_id: &str, raw: &str) -> Result<String> {
    let raw = raw.trim();
    if Url::parse(raw).is_ok() {
        return Ok(raw.to_string());
    }
    base_url
        .join(raw)
        .map(String::from)
        .map_err(|e| DubberError::Server {
            status: 200,
            message: format!("task {} returned an invalid output url '{}': {}", task_id, raw, e),
        })
}
