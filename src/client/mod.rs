// Dubbing backend access
//
// The rest of the crate talks to the backend only through the DubbingApi
// trait, so the poller and workflow can be driven by a fake in tests:
// - Http: reqwest implementation against the real REST endpoints

pub mod http;

use async_trait::async_trait;
use std::sync::Arc;

pub use http::HttpDubbingClient;

use crate::config::ApiConfig;
use crate::error::Result;
use crate::job::{DubbingRequest, Job};

/// Operations offered by the dubbing backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DubbingApi: Send + Sync {
    /// Start a new dubbing job. Every call creates an independent job.
    async fn submit(&self, request: &DubbingRequest) -> Result<Job>;

    /// Fetch the current state of a job
    async fn poll(&self, job_id: &str) -> Result<Job>;
}

/// Factory for creating backend clients
pub struct DubbingApiFactory;

impl DubbingApiFactory {
    /// Create the HTTP client for the configured backend
    pub fn create_client(config: &ApiConfig) -> Result<Arc<dyn DubbingApi>> {
        Ok(Arc::new(HttpDubbingClient::new(config)?))
    }
}
