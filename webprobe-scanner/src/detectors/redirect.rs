//! Open redirect detection

use super::{Detector, build_test_url, query_parameters};
use crate::error::ScanError;
use crate::finding::{Category, Finding};
use crate::http::HttpClient;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

/// Host every payload points at. A `Location` containing it means the
/// application redirected to attacker-supplied input.
pub const REDIRECT_CANARY_HOST: &str = "example.com";

pub const REDIRECT_PAYLOADS: &[&str] = &[
    "//example.com",
    "https://example.com",
    "http://example.com",
];

pub const REDIRECT_PARAM_NAMES: &[&str] = &[
    "redirect",
    "url",
    "next",
    "goto",
    "target",
    "destination",
    "redirect_uri",
    "redirect_url",
    "returnurl",
];

/// Whether a parameter name looks like it carries a redirect target.
pub fn is_redirect_candidate(name: &str) -> bool {
    let name = name.to_lowercase();
    REDIRECT_PARAM_NAMES.iter().any(|known| *known == name)
        || name.contains("redir")
        || name.contains("url")
}

/// Only probes parameters that pass [`is_redirect_candidate`]. Requests are
/// sent without following redirects so the raw `Location` can be inspected.
pub struct OpenRedirectDetector;

#[async_trait]
impl Detector for OpenRedirectDetector {
    fn name(&self) -> &'static str {
        "open_redirect"
    }

    fn category(&self) -> Category {
        Category::OpenRedirect
    }

    async fn probe(&self, client: &HttpClient, url: &Url) -> Vec<Finding> {
        let mut findings = Vec::new();

        for param in query_parameters(url) {
            if !is_redirect_candidate(&param) {
                continue;
            }

            for payload in REDIRECT_PAYLOADS {
                let test_url = build_test_url(url, &param, payload);
                match client.get(&test_url, false).await {
                    Ok(response) => {
                        if !response.is_redirect() {
                            continue;
                        }
                        if let Some(location) = response.location()
                            && location.contains(REDIRECT_CANARY_HOST)
                        {
                            info!(
                                "Open redirect at {} in parameter {} -> {}",
                                url, param, location
                            );
                            findings.push(Finding::open_redirect(
                                url.as_str(),
                                &param,
                                payload,
                                location,
                            ));
                            break;
                        }
                    }
                    Err(ScanError::Cancelled) => return findings,
                    Err(e) => debug!("Redirect probe of {} failed: {}", test_url, e),
                }
            }
        }

        findings
    }
}
