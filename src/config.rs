use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, DubberError};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "DUBBER_API_URL";

fn default_max_poll_failures() -> u32 {
    0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub tracking: TrackingConfig,
    pub dubbing: DubbingDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the dubbing backend
    pub base_url: String,
    /// Timeout for job submission requests (seconds)
    pub submit_timeout_secs: u64,
    /// Timeout for status check requests (seconds)
    pub status_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Delay between two status checks (milliseconds)
    pub poll_interval_ms: u64,
    /// Consecutive failed status checks tolerated before tracking is aborted.
    /// 0 aborts on the first failure.
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DubbingDefaults {
    /// Voice used when none is given on the command line
    pub voice_id: String,
    /// Remove background noise from the source audio
    pub remove_background_noise: bool,
    /// Align the dubbed audio with the original timing
    pub auto_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                submit_timeout_secs: 30,
                status_timeout_secs: 10,
            },
            tracking: TrackingConfig {
                poll_interval_ms: 2000,
                max_poll_failures: default_max_poll_failures(),
            },
            dubbing: DubbingDefaults {
                voice_id: "default".to_string(),
                remove_background_noise: true,
                auto_sync: true,
            },
        }
    }
}

impl ApiConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

impl TrackingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubberError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace the base URL with the value of [`API_URL_ENV`] when it is set.
    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(DubberError::Config("api.base_url must not be empty".to_string()));
        }
        if self.tracking.poll_interval_ms == 0 {
            return Err(DubberError::Config(
                "tracking.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.api.submit_timeout_secs == 0 || self.api.status_timeout_secs == 0 {
            return Err(DubberError::Config("request timeouts must be greater than 0".to_string()));
        }
        Ok(())
    }
}
