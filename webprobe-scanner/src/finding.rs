use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of things a scan can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Xss,
    Sqli,
    OpenRedirect,
    InsecureHeaders,
    DirectoryListing,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Xss,
        Category::Sqli,
        Category::OpenRedirect,
        Category::InsecureHeaders,
        Category::DirectoryListing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Xss => "xss",
            Category::Sqli => "sqli",
            Category::OpenRedirect => "open_redirect",
            Category::InsecureHeaders => "insecure_headers",
            Category::DirectoryListing => "directory_listing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Xss => "XSS vulnerabilities",
            Category::Sqli => "SQL injection vulnerabilities",
            Category::OpenRedirect => "Open redirect vulnerabilities",
            Category::InsecureHeaders => "Security header issues",
            Category::DirectoryListing => "Directory listing issues",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported instance of a potential vulnerability or misconfiguration.
///
/// Fields are private: a finding is built once through one of the
/// per-category constructors and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    category: Category,
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    missing_headers: Vec<String>,
    detail: String,
}

impl Finding {
    fn base(category: Category, url: &str, detail: impl Into<String>) -> Self {
        Self {
            category,
            url: url.to_string(),
            parameter: None,
            payload: None,
            evidence: None,
            redirect_location: None,
            missing_headers: Vec::new(),
            detail: detail.into(),
        }
    }

    pub fn xss(url: &str, parameter: &str, payload: &str) -> Self {
        Self {
            parameter: Some(parameter.to_string()),
            payload: Some(payload.to_string()),
            ..Self::base(Category::Xss, url, "Reflected XSS vulnerability detected")
        }
    }

    pub fn sqli(url: &str, parameter: &str, payload: &str, signature: &str) -> Self {
        Self {
            parameter: Some(parameter.to_string()),
            payload: Some(payload.to_string()),
            evidence: Some(signature.to_string()),
            ..Self::base(Category::Sqli, url, "Possible SQL injection detected")
        }
    }

    pub fn open_redirect(url: &str, parameter: &str, payload: &str, location: &str) -> Self {
        Self {
            parameter: Some(parameter.to_string()),
            payload: Some(payload.to_string()),
            redirect_location: Some(location.to_string()),
            ..Self::base(Category::OpenRedirect, url, "Open redirect vulnerability detected")
        }
    }

    pub fn insecure_headers(url: &str, missing: Vec<String>) -> Self {
        let detail = format!("Missing {} security headers", missing.len());
        Self {
            missing_headers: missing,
            ..Self::base(Category::InsecureHeaders, url, detail)
        }
    }

    pub fn directory_listing(url: &str) -> Self {
        Self::base(Category::DirectoryListing, url, "Directory listing detected")
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn evidence(&self) -> Option<&str> {
        self.evidence.as_deref()
    }

    pub fn redirect_location(&self) -> Option<&str> {
        self.redirect_location.as_deref()
    }

    pub fn missing_headers(&self) -> &[String] {
        &self.missing_headers
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_category() {
        assert_eq!(Finding::xss("u", "q", "p").category(), Category::Xss);
        assert_eq!(Finding::sqli("u", "q", "p", "e").category(), Category::Sqli);
        assert_eq!(
            Finding::open_redirect("u", "q", "p", "l").category(),
            Category::OpenRedirect
        );
        assert_eq!(
            Finding::insecure_headers("u", vec!["X-Frame-Options".to_string()]).category(),
            Category::InsecureHeaders
        );
        assert_eq!(
            Finding::directory_listing("u").category(),
            Category::DirectoryListing
        );
    }

    #[test]
    fn test_insecure_headers_detail_counts_missing() {
        let finding = Finding::insecure_headers(
            "http://example.com/",
            vec![
                "Content-Security-Policy".to_string(),
                "X-Frame-Options".to_string(),
            ],
        );
        assert_eq!(finding.detail(), "Missing 2 security headers");
        assert_eq!(finding.parameter(), None);
        assert_eq!(finding.missing_headers().len(), 2);
    }

    #[test]
    fn test_category_names_are_snake_case() {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["xss", "sqli", "open_redirect", "insecure_headers", "directory_listing"]
        );
    }
}
