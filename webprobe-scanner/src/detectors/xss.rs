//! Reflected XSS detection

use super::{Detector, build_test_url, query_parameters};
use crate::error::ScanError;
use crate::finding::{Category, Finding};
use crate::http::HttpClient;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

/// Script tag, event handler and attribute/string breakout, tried in order.
pub const XSS_PAYLOADS: &[&str] = &[
    "<script>alert('XSS')</script>",
    "<img src=x onerror=alert('XSS')>",
    "';alert('XSS');//",
];

/// Flags a parameter when a payload comes back verbatim in the body.
pub struct XssDetector;

#[async_trait]
impl Detector for XssDetector {
    fn name(&self) -> &'static str {
        "xss"
    }

    fn category(&self) -> Category {
        Category::Xss
    }

    async fn probe(&self, client: &HttpClient, url: &Url) -> Vec<Finding> {
        let mut findings = Vec::new();

        for param in query_parameters(url) {
            for payload in XSS_PAYLOADS {
                let test_url = build_test_url(url, &param, payload);
                match client.get(&test_url, true).await {
                    Ok(response) => {
                        if response.body.contains(payload) {
                            info!("XSS vulnerability found at {} in parameter {}", url, param);
                            findings.push(Finding::xss(url.as_str(), &param, payload));
                            break;
                        }
                    }
                    Err(ScanError::Cancelled) => return findings,
                    Err(e) => debug!("XSS probe of {} failed: {}", test_url, e),
                }
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{ScanConfig, Target};
    use wiremock::{
        Mock, MockServer, Request, ResponseTemplate,
        matchers::{method, path},
    };

    fn client_for(server: &MockServer) -> HttpClient {
        let target = Target::from_config(&ScanConfig::new(server.uri())).unwrap();
        HttpClient::new(&target).unwrap()
    }

    #[tokio::test]
    async fn test_echoed_parameter_yields_one_finding() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(|req: &Request| {
                let echoed: Vec<String> = req
                    .url
                    .query_pairs()
                    .filter(|(name, _)| name == "q")
                    .map(|(_, value)| value.into_owned())
                    .collect();
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(format!("<p>Results for {}</p>", echoed.join(" ")))
            })
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/search?q=shoes&page=2", mock_server.uri())).unwrap();
        let findings = XssDetector.probe(&client_for(&mock_server), &url).await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category(), Category::Xss);
        assert_eq!(findings[0].parameter(), Some("q"));
        assert_eq!(findings[0].payload(), Some(XSS_PAYLOADS[0]));
        assert_eq!(findings[0].url(), url.as_str());
    }

    #[tokio::test]
    async fn test_escaped_output_is_not_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>Results for &lt;script&gt;alert('XSS')&lt;/script&gt;</p>"),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/search?q=shoes", mock_server.uri())).unwrap();
        let findings = XssDetector.probe(&client_for(&mock_server), &url).await;

        assert!(findings.is_empty());
        let received = mock_server.received_requests().await.unwrap();
        assert_eq!(received.len(), XSS_PAYLOADS.len());
    }

    #[tokio::test]
    async fn test_url_without_query_is_skipped() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/about", mock_server.uri())).unwrap();
        assert!(XssDetector.probe(&client_for(&mock_server), &url).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_no_finding() {
        let target = Target::from_config(&ScanConfig::new("http://127.0.0.1:1/")).unwrap();
        let client = HttpClient::new(&target).unwrap();
        let url = Url::parse("http://127.0.0.1:1/search?q=x").unwrap();

        assert!(XssDetector.probe(&client, &url).await.is_empty());
        assert_eq!(
            client.stats().snapshot().network_errors,
            XSS_PAYLOADS.len() as u64
        );
    }
}
