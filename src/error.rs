use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubberError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The dubbing backend did not answer (refused connection, DNS failure, timeout).
    #[error(
        "Could not reach the dubbing server ({0}). Check that the server is running and try again."
    )]
    Connection(String),

    /// The dubbing backend answered with a non-success status.
    #[error("Dubbing server error {status}: {message}")]
    Server { status: u16, message: String },

    /// A status check failed while a job was being tracked.
    #[error("Tracking aborted: {0}")]
    TrackingAborted(String),

    #[error("Invalid dubbing request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DubberError {
    /// Classify a transport-level reqwest failure.
    ///
    /// Connect errors and timeouts, including a timeout while the body is still
    /// arriving, mean the endpoint never produced a full response. Everything
    /// else (body decoding, redirects) is kept as a plain HTTP error.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            DubberError::Connection(err.to_string())
        } else {
            DubberError::Http(err)
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, DubberError::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, DubberError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = DubberError::Server {
            status: 404,
            message: "Task not found".to_string(),
        };
        assert_eq!(err.to_string(), "Dubbing server error 404: Task not found");
        assert!(!err.is_connection());
    }

    #[test]
    fn test_tracking_aborted_display() {
        let err = DubberError::TrackingAborted("connection refused".to_string());
        assert_eq!(err.to_string(), "Tracking aborted: connection refused");
        assert!(!err.is_connection());
    }

    #[test]
    fn test_io_error_converts() {
        let err: DubberError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, DubberError::Io(_)));
        assert!(!err.is_connection());
    }

    #[test]
    fn test_connection_error_mentions_server() {
        let err = DubberError::Connection("connection refused".to_string());
        assert!(err.is_connection());
        assert!(err.to_string().contains("Check that the server is running"));
    }
}
