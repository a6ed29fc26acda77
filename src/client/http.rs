use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{DubberError, Result};
use crate::job::{DubbingRequest, DubbingResponse, Job};
use super::DubbingApi;

/// Error body shapes the backend is known to produce
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
    message: Option<serde_json::Value>,
}

/// reqwest implementation of [`DubbingApi`]
pub struct HttpDubbingClient {
    client: Client,
    base_url: Url,
    submit_timeout: Duration,
    status_timeout: Duration,
}

impl HttpDubbingClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        // Trailing slash so relative output paths resolve under any base path
        let base_url = Url::parse(&format!("{}/", trimmed)).map_err(|e| {
            DubberError::Config(format!("Invalid api.base_url '{}': {}", config.base_url, e))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(DubberError::Config(format!(
                "api.base_url must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("dubber/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DubberError::Http)?;

        Ok(Self {
            client,
            base_url,
            submit_timeout: config.submit_timeout(),
            status_timeout: config.status_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn jobs_url(&self) -> Result<Url> {
        self.base_url
            .join("api/dub")
            .map_err(|e| DubberError::Config(format!("Invalid api.base_url: {}", e)))
    }

    fn job_url(&self, job_id: &str) -> Result<Url> {
        let mut url = self.jobs_url()?;
        url.path_segments_mut()
            .map_err(|_| DubberError::Config("api.base_url cannot carry a path".to_string()))?
            .push(job_id);
        Ok(url)
    }

    async fn read_job(&self, response: Response) -> Result<Job> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        // The request timeout also covers reading the body
        let body: DubbingResponse = response.json().await.map_err(DubberError::from_transport)?;
        body.into_job(&self.base_url)
    }
}

#[async_trait]
impl DubbingApi for HttpDubbingClient {
    async fn submit(&self, request: &DubbingRequest) -> Result<Job> {
        let url = self.jobs_url()?;
        debug!("Submitting dubbing job to: {}", url);

        let response = self.client
            .post(url)
            .json(request)
            .timeout(self.submit_timeout)
            .send()
            .await
            .map_err(DubberError::from_transport)?;

        let job = self.read_job(response).await?;
        info!("Dubbing job {} accepted with status {}", job.id, job.status());
        Ok(job)
    }

    async fn poll(&self, job_id: &str) -> Result<Job> {
        let url = self.job_url(job_id)?;
        debug!("Checking job status at: {}", url);

        let response = self.client
            .get(url)
            .timeout(self.status_timeout)
            .send()
            .await
            .map_err(DubberError::from_transport)?;

        self.read_job(response).await
    }
}

/// Turn a non-success response into [`DubberError::Server`].
async fn error_from_response(response: Response) -> DubberError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = extract_error_message(&text)
        .unwrap_or_else(|| format!("request failed with HTTP {}", status));
    warn!("Dubbing server returned {}: {}", status, message);
    DubberError::Server { status, message }
}

/// Pull a human readable message out of an error body.
fn extract_error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => [parsed.detail, parsed.error, parsed.message]
            .into_iter()
            .flatten()
            .find_map(|v| match v {
                serde_json::Value::String(s) if !s.trim().is_empty() => {
                    Some(s.trim().to_string())
                }
                _ => None,
            }),
        // Plain text bodies are used verbatim
        Err(_) if !body.starts_with('{') && !body.starts_with('[') => Some(body.to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn api_config(base_url: &str) -> ApiConfig {
        let mut config = Config::default().api;
        config.base_url = base_url.to_string();
        config
    }

    #[test]
    fn test_extract_error_message() {
        let extracted = |body: &str| extract_error_message(body);
        assert_eq!(extracted(r#"{"detail":"Task not found"}"#).as_deref(), Some("Task not found"));
        assert_eq!(extracted(r#"{"error":"quota exceeded"}"#).as_deref(), Some("quota exceeded"));
        assert_eq!(extracted(r#"{"message":"bad voice"}"#).as_deref(), Some("bad voice"));
        assert_eq!(extracted("Internal Server Error").as_deref(), Some("Internal Server Error"));
        assert_eq!(extract_error_message(r#"{"detail":[{"loc":["body","url"]}]}"#), None);
        assert_eq!(extract_error_message("   "), None);
    }

    #[test]
    fn test_job_urls() {
        let client = HttpDubbingClient::new(&api_config("http://localhost:8000")).unwrap();
        assert_eq!(client.jobs_url().unwrap().as_str(), "http://localhost:8000/api/dub");
        assert_eq!(client.job_url("t1").unwrap().as_str(), "http://localhost:8000/api/dub/t1");
        assert_eq!(client.job_url("a/b").unwrap().as_str(), "http://localhost:8000/api/dub/a%2Fb");
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let client = HttpDubbingClient::new(&api_config("https://example.com/dubbing/")).unwrap();
        assert_eq!(client.jobs_url().unwrap().as_str(), "https://example.com/dubbing/api/dub");
        assert_eq!(client.base_url().as_str(), "https://example.com/dubbing/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpDubbingClient::new(&api_config("not a url")),
            Err(DubberError::Config(_))
        ));
        assert!(matches!(
            HttpDubbingClient::new(&api_config("ftp://example.com")),
            Err(DubberError::Config(_))
        ));
    }
}
