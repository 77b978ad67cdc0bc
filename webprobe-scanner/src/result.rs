use crate::finding::Finding;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the crawler learned about a single fetched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: String,
    pub depth: usize,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub response_time: Duration,
    pub links_found: Vec<String>,
    pub directory_listing: bool,
    pub error: Option<String>,
}

impl CrawlResult {
    pub fn new(url: String, depth: usize) -> Self {
        Self {
            url,
            depth,
            status_code: 0,
            content_type: None,
            content_length: 0,
            response_time: Duration::from_secs(0),
            links_found: Vec::new(),
            directory_listing: false,
            error: None,
        }
    }

    pub fn with_error(url: String, depth: usize, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url, depth)
        }
    }
}

/// Everything a finished crawl hands to the next phase.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Distinct visited URLs, in the order they were claimed.
    pub urls: Vec<String>,
    /// Findings produced as a crawl by-product (directory listings).
    pub findings: Vec<Finding>,
    pub pages: Vec<CrawlResult>,
    pub cancelled: bool,
}
