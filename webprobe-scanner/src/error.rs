use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// Errors that only prune a single crawl branch or probe.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScanError::Network(_) | ScanError::Timeout(_) | ScanError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Timeout(err.to_string())
        } else if err.is_decode() {
            ScanError::Parse(err.to_string())
        } else if err.is_builder() {
            ScanError::Config(err.to_string())
        } else {
            ScanError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ScanError {
    fn from(err: url::ParseError) -> Self {
        ScanError::Config(format!("Invalid URL: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
