//! Error-based SQL injection detection

use super::{Detector, build_test_url, query_parameters};
use crate::error::ScanError;
use crate::finding::{Category, Finding};
use crate::http::HttpClient;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

pub const SQLI_PAYLOADS: &[&str] = &[
    "'",
    "' OR '1'='1",
    "1' OR '1'='1' --",
    "' UNION SELECT 1,2,3,4 --",
];

/// Database error fragments that leak into responses when a quote breaks
/// the query.
pub const SQL_ERROR_SIGNATURES: &[&str] = &[
    "SQL syntax",
    "mysql_fetch_array",
    "ORA-01756",
    "SQLSTATE[42000]",
    "Microsoft SQL Native Client error",
    "PostgreSQL query failed",
];

pub struct SqliDetector;

impl SqliDetector {
    /// First known error signature present in `body`.
    pub fn matching_signature(body: &str) -> Option<&'static str> {
        SQL_ERROR_SIGNATURES
            .iter()
            .copied()
            .find(|signature| body.contains(signature))
    }
}

#[async_trait]
impl Detector for SqliDetector {
    fn name(&self) -> &'static str {
        "sqli"
    }

    fn category(&self) -> Category {
        Category::Sqli
    }

    async fn probe(&self, client: &HttpClient, url: &Url) -> Vec<Finding> {
        let mut findings = Vec::new();

        for param in query_parameters(url) {
            for payload in SQLI_PAYLOADS {
                let test_url = build_test_url(url, &param, payload);
                match client.get(&test_url, true).await {
                    Ok(response) => {
                        if let Some(signature) = Self::matching_signature(&response.body) {
                            info!(
                                "SQL injection indicator '{}' at {} in parameter {}",
                                signature, url, param
                            );
                            findings.push(Finding::sqli(url.as_str(), &param, payload, signature));
                        }
                    }
                    Err(ScanError::Cancelled) => return findings,
                    Err(e) => debug!("SQLi probe of {} failed: {}", test_url, e),
                }
            }
        }

        findings
    }
}
