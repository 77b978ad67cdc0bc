// Scan report model and rendering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::Mutex;
use url::Url;
use webprobe_scanner::{Category, Finding, StatsSnapshot};

/// Findings grouped by category, each list in merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSet {
    pub xss: Vec<Finding>,
    pub sqli: Vec<Finding>,
    pub open_redirect: Vec<Finding>,
    pub insecure_headers: Vec<Finding>,
    pub directory_listing: Vec<Finding>,
}

impl FindingSet {
    pub fn push(&mut self, finding: Finding) {
        match finding.category() {
            Category::Xss => self.xss.push(finding),
            Category::Sqli => self.sqli.push(finding),
            Category::OpenRedirect => self.open_redirect.push(finding),
            Category::InsecureHeaders => self.insecure_headers.push(finding),
            Category::DirectoryListing => self.directory_listing.push(finding),
        }
    }

    pub fn get(&self, category: Category) -> &[Finding] {
        match category {
            Category::Xss => &self.xss,
            Category::Sqli => &self.sqli,
            Category::OpenRedirect => &self.open_redirect,
            Category::InsecureHeaders => &self.insecure_headers,
            Category::DirectoryListing => &self.directory_listing,
        }
    }

    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// All findings, category by category.
    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        Category::ALL.into_iter().flat_map(move |c| self.get(c).iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub target: String,
    pub scan_started: DateTime<Utc>,
    pub scan_ended: DateTime<Utc>,
    pub urls_visited: usize,
    /// Visited URLs in crawl order.
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub stats: StatsSnapshot,
    pub findings: FindingSet,
}

impl Report {
    pub fn duration(&self) -> chrono::Duration {
        self.scan_ended - self.scan_started
    }

    pub fn total_findings(&self) -> usize {
        self.findings.total()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.to_json()?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[derive(Debug, Default)]
struct BuilderState {
    urls: Vec<String>,
    findings: FindingSet,
}

/// Shared, append-only accumulator that probing workers merge into.
///
/// Appends to one category keep their arrival order. The lock is never held
/// across an await point.
#[derive(Debug)]
pub struct ReportBuilder {
    target: String,
    scan_started: DateTime<Utc>,
    state: Mutex<BuilderState>,
}

impl ReportBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            scan_started: Utc::now(),
            state: Mutex::new(BuilderState::default()),
        }
    }

    pub fn scan_started(&self) -> DateTime<Utc> {
        self.scan_started
    }

    pub fn merge(&self, findings: impl IntoIterator<Item = Finding>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for finding in findings {
            state.findings.push(finding);
        }
    }

    pub fn set_urls_visited(&self, urls: Vec<String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.urls = urls;
    }

    pub fn finding_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .findings
            .total()
    }

    /// Take everything merged so far. The builder is left empty.
    pub fn finalize(&self, stats: StatsSnapshot, cancelled: bool) -> Report {
        let state = std::mem::take(&mut *self.state.lock().unwrap_or_else(|e| e.into_inner()));
        Report {
            target: self.target.clone(),
            scan_started: self.scan_started,
            scan_ended: Utc::now(),
            urls_visited: state.urls.len(),
            urls: state.urls,
            cancelled,
            stats,
            findings: state.findings,
        }
    }
}

/// Path component of a URL, `/` for the root.
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

pub fn generate_text_summary(report: &Report) -> String {
    let mut summary = String::new();
    let rule = "━".repeat(80);

    summary.push_str(&format!("{}\n", rule));
    summary.push_str("                            WEBPROBE SCAN SUMMARY\n");
    summary.push_str(&format!("{}\n\n", rule));

    summary.push_str(&format!("Target:       {}\n", report.target));
    summary.push_str(&format!(
        "Started:      {}\n",
        report.scan_started.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    summary.push_str(&format!(
        "Duration:     {:.2} seconds\n",
        report.duration().num_milliseconds() as f64 / 1000.0
    ));
    summary.push_str(&format!("URLs Visited: {}\n", report.urls_visited));
    summary.push_str(&format!("Requests:     {}\n", report.stats.requests));
    if report.cancelled {
        summary.push_str("Status:       Cancelled (partial results)\n");
    }
    summary.push('\n');

    summary.push_str(&format!("Total Findings: {}\n\n", report.total_findings()));
    for category in Category::ALL {
        summary.push_str(&format!(
            "  {:<32} {}\n",
            category.label(),
            report.findings.get(category).len()
        ));
    }
    summary.push('\n');

    if !report.findings.is_empty() {
        summary.push_str(&format!("{}\n", rule));
        summary.push_str("FINDINGS\n");
        summary.push_str(&format!("{}\n\n", rule));

        for (idx, finding) in report.findings.iter().enumerate() {
            summary.push_str(&format!("[{}] {}\n", idx + 1, format_finding_line(finding)));
        }
        summary.push('\n');
    }

    summary
}

fn format_finding_line(finding: &Finding) -> String {
    let location = extract_url_path(finding.url());
    match finding.category() {
        Category::Xss | Category::Sqli => {
            let mut line = format!(
                "{} at {} (parameter: {})",
                finding.detail(),
                location,
                finding.parameter().unwrap_or("?")
            );
            if let Some(evidence) = finding.evidence() {
                line.push_str(&format!(" [{}]", evidence));
            }
            line
        }
        Category::OpenRedirect => format!(
            "{} at {} (parameter: {}) -> {}",
            finding.detail(),
            location,
            finding.parameter().unwrap_or("?"),
            finding.redirect_location().unwrap_or("?")
        ),
        Category::InsecureHeaders => format!(
            "{} at {}: {}",
            finding.detail(),
            location,
            finding.missing_headers().join(", ")
        ),
        Category::DirectoryListing => format!("{} at {}", finding.detail(), location),
    }
}
