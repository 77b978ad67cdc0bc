use crate::error::{Result, ScanError};
use crate::stats::{Cancellation, ScanStats};
use crate::target::Target;
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    /// URL after any redirects were followed.
    pub final_url: Url,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    /// HTML by content type, or a markup-shaped body served as plain text
    /// or with no content type at all.
    pub fn is_html(&self) -> bool {
        let looks_like_markup = || self.body.trim_start().starts_with('<');
        match self.header("content-type").map(str::to_ascii_lowercase) {
            Some(ct) if ct.contains("html") => true,
            Some(ct) if ct.starts_with("text/plain") => looks_like_markup(),
            Some(_) => false,
            None => looks_like_markup(),
        }
    }
}

/// GET-only client bound to a [`Target`]'s cookies, headers and timeout.
///
/// Holds two reqwest clients so callers can choose per request whether
/// redirects are followed. Cheap to clone; all clones share counters and the
/// cancellation flag.
#[derive(Clone)]
pub struct HttpClient {
    follow: Client,
    no_follow: Client,
    stats: Arc<ScanStats>,
    cancel: Cancellation,
}

impl HttpClient {
    pub fn new(target: &Target) -> Result<Self> {
        let headers = Self::default_headers(target)?;
        let follow = Self::build_client(
            target.timeout(),
            headers.clone(),
            reqwest::redirect::Policy::limited(5),
        )?;
        let no_follow =
            Self::build_client(target.timeout(), headers, reqwest::redirect::Policy::none())?;

        Ok(Self {
            follow,
            no_follow,
            stats: Arc::new(ScanStats::new()),
            cancel: Cancellation::new(),
        })
    }

    pub fn with_stats(mut self, stats: Arc<ScanStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stats(&self) -> &Arc<ScanStats> {
        &self.stats
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    fn build_client(
        timeout: Duration,
        headers: HeaderMap,
        redirect: reqwest::redirect::Policy,
    ) -> Result<Client> {
        Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .gzip(true)
            .redirect(redirect)
            .build()
            .map_err(|e| ScanError::Config(format!("Failed to create HTTP client: {}", e)))
    }

    fn default_headers(target: &Target) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let agent = HeaderValue::from_str(target.user_agent())
            .map_err(|e| ScanError::Config(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        if let Some(cookie) = target.cookie_header() {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| ScanError::Config(format!("Invalid cookie value: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        for (name, value) in target.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScanError::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ScanError::Config(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Issue a GET. Every failure is counted before it is returned.
    pub async fn get(&self, url: &Url, follow_redirects: bool) -> Result<HttpResponse> {
        if self.cancel.is_cancelled() {
            self.stats.record_error(&ScanError::Cancelled);
            return Err(ScanError::Cancelled);
        }

        self.stats.record_request();
        let result = self.send(url, follow_redirects).await;
        if let Err(ref e) = result {
            debug!("GET {} failed: {}", url, e);
            self.stats.record_error(e);
        }
        result
    }

    async fn send(&self, url: &Url, follow_redirects: bool) -> Result<HttpResponse> {
        let client = if follow_redirects {
            &self.follow
        } else {
            &self.no_follow
        };

        let response = client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::ScanConfig;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[tokio::test]
    async fn test_get_sends_cookies_and_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("cookie", "session=abc"))
            .and(header("x-probe", "1"))
            .and(header("user-agent", "probe-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ScanConfig::new(mock_server.uri())
            .with_cookies(vec![("session".to_string(), "abc".to_string())])
            .with_headers(vec![("X-Probe".to_string(), "1".to_string())])
            .with_user_agent("probe-agent");
        let target = Target::from_config(&config).unwrap();
        let client = HttpClient::new(&target).unwrap();

        let response = client.get(target.seed(), true).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
        assert_eq!(client.stats().snapshot().requests, 1);
    }

    #[tokio::test]
    async fn test_redirect_policy_is_per_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/new"),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("landed"))
            .mount(&mock_server)
            .await;

        let target = Target::from_config(&ScanConfig::new(mock_server.uri())).unwrap();
        let client = HttpClient::new(&target).unwrap();
        let url = Url::parse(&format!("{}/old", mock_server.uri())).unwrap();

        let raw = client.get(&url, false).await.unwrap();
        assert!(raw.is_redirect());
        assert_eq!(raw.location(), Some("/new"));

        let followed = client.get(&url, true).await.unwrap();
        assert_eq!(followed.status, 200);
        assert_eq!(followed.final_url.path(), "/new");
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let target = Target::from_config(&ScanConfig::new("http://127.0.0.1:1/")).unwrap();
        let client = HttpClient::new(&target).unwrap();

        let err = client.get(target.seed(), true).await.unwrap_err();
        assert!(matches!(err, ScanError::Network(_)));
        assert_eq!(client.stats().snapshot().network_errors, 1);
    }

    #[tokio::test]
    async fn test_cancelled_client_issues_no_requests() {
        let target = Target::from_config(&ScanConfig::new("http://127.0.0.1:1/")).unwrap();
        let cancel = Cancellation::new();
        let client = HttpClient::new(&target)
            .unwrap()
            .with_cancellation(cancel.clone());
        cancel.cancel();

        let err = client.get(target.seed(), true).await.unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
        let snap = client.stats().snapshot();
        assert_eq!(snap.requests, 0);
        assert_eq!(snap.cancelled_requests, 1);
    }

    #[test]
    fn test_is_html_sniffs_body_without_content_type() {
        let response = HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: "  <html><body></body></html>".to_string(),
            final_url: Url::parse("http://example.com/").unwrap(),
        };
        assert!(response.is_html());
    }

    fn response_with(content_type: &str, body: &str) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).unwrap(),
        );
        HttpResponse {
            status: 200,
            headers,
            body: body.to_string(),
            final_url: Url::parse("http://example.com/").unwrap(),
        }
    }

    #[test]
    fn test_is_html_by_content_type_and_markup() {
        assert!(response_with("text/html; charset=utf-8", "anything").is_html());
        assert!(response_with("text/plain", "\n <p>markup</p>").is_html());
        assert!(!response_with("text/plain", "just words").is_html());
        assert!(!response_with("application/json", "<not really json>").is_html());
    }

    #[tokio::test]
    async fn test_markup_served_as_plain_text_is_html() {
        let mock_server = MockServer::start().await;

        // set_body_string overrides the content type with text/plain
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<a href=\"/next\">next</a>"),
            )
            .mount(&mock_server)
            .await;

        let target = Target::from_config(&ScanConfig::new(mock_server.uri())).unwrap();
        let client = HttpClient::new(&target).unwrap();

        let response = client.get(target.seed(), true).await.unwrap();
        assert!(response.is_html());
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let config = ScanConfig::new(mock_server.uri()).with_timeout_secs(1);
        let target = Target::from_config(&config).unwrap();
        let client = HttpClient::new(&target).unwrap();

        let err = client.get(target.seed(), true).await.unwrap_err();
        assert!(matches!(err, ScanError::Timeout(_)), "got {:?}", err);
        let snap = client.stats().snapshot();
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.network_errors, 0);
    }
}
