use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::{Origin, Url};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// User-supplied scan settings, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub target: String,
    pub threads: usize,
    pub timeout_secs: u64,
    pub max_depth: usize,
    pub cookies: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub user_agent: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            threads: 5,
            timeout_secs: 10,
            max_depth: 2,
            cookies: Vec::new(),
            headers: Vec::new(),
            user_agent: None,
        }
    }
}

impl ScanConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<(String, String)>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// The validated, immutable description of what is being scanned.
#[derive(Debug, Clone)]
pub struct Target {
    seed: Url,
    origin: Origin,
    cookies: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    user_agent: String,
    timeout: Duration,
    concurrency: usize,
    max_depth: usize,
}

impl Target {
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let mut seed = Url::parse(config.target.trim())?;

        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(ScanError::Config(format!(
                "Unsupported scheme '{}' in {}",
                seed.scheme(),
                config.target
            )));
        }
        if seed.host_str().is_none() {
            return Err(ScanError::Config(format!("No host in {}", config.target)));
        }
        if config.threads == 0 {
            return Err(ScanError::Config(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }
        if config.timeout_secs == 0 {
            return Err(ScanError::Config("Timeout must be at least 1 second".to_string()));
        }

        seed.set_fragment(None);
        let origin = seed.origin();

        Ok(Self {
            seed,
            origin,
            cookies: config.cookies.clone(),
            headers: config.headers.clone(),
            user_agent: config
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
            concurrency: config.threads,
            max_depth: config.max_depth,
        })
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Cookie header value, `None` when no cookies were supplied.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
