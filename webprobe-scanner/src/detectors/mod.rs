//! Query-parameter vulnerability detectors.
//!
//! Every detector is stateless: it takes a discovered URL, substitutes its
//! payloads into one query parameter at a time and inspects the responses.
//! A URL without query parameters yields no findings and issues no requests.

pub mod redirect;
pub mod sqli;
pub mod xss;

use crate::finding::{Category, Finding};
use crate::http::HttpClient;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

pub use redirect::OpenRedirectDetector;
pub use sqli::SqliDetector;
pub use xss::XssDetector;

#[async_trait]
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> Category;

    /// Probe `url`. Network failures are absorbed: they are counted by the
    /// client and simply produce no finding for that request.
    async fn probe(&self, client: &HttpClient, url: &Url) -> Vec<Finding>;
}

/// XSS, SQL injection and open redirect, in that order.
pub fn default_detectors() -> Vec<Arc<dyn Detector>> {
    let detectors: [Arc<dyn Detector>; 3] = [
        Arc::new(XssDetector),
        Arc::new(SqliDetector),
        Arc::new(OpenRedirectDetector),
    ];
    detectors.into()
}

/// Distinct query parameter names of `url`, in first-seen order.
pub fn query_parameters(url: &Url) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (name, _) in url.query_pairs() {
        if !names.iter().any(|n| *n == name) {
            names.push(name.into_owned());
        }
    }
    names
}

/// `url` with every value of `param` replaced by a single `payload`; the
/// other parameters keep their values and order.
pub fn build_test_url(url: &Url, param: &str, payload: &str) -> Url {
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let mut test_url = url.clone();
    test_url.set_fragment(None);

    {
        let mut query = test_url.query_pairs_mut();
        query.clear();
        let mut replaced = false;
        for (name, value) in &pairs {
            if name == param {
                if !replaced {
                    query.append_pair(name, payload);
                    replaced = true;
                }
            } else {
                query.append_pair(name, value);
            }
        }
    }

    test_url
}
