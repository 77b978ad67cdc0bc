use crate::report::{Report, ReportBuilder};
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;
use webprobe_scanner::error::Result;
use webprobe_scanner::{
    Cancellation, Crawler, Detector, HttpClient, ProgressCallback, ScanError, ScanStats, Target,
    audit_security_headers, default_detectors,
};

/// Where a scan currently is. Phases only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanPhase {
    Idle,
    Crawling,
    Probing,
    Auditing,
    Done,
}

impl ScanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Crawling => "crawling",
            ScanPhase::Probing => "probing",
            ScanPhase::Auditing => "auditing",
            ScanPhase::Done => "done",
        }
    }
}

/// Called on every phase transition.
pub type PhaseCallback = Arc<dyn Fn(ScanPhase) + Send + Sync>;

/// Called with each URL as the probing pool picks it up.
pub type ProbeProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Drives one scan: crawl, probe every visited URL, audit the root, report.
pub struct ScanOrchestrator {
    target: Arc<Target>,
    client: HttpClient,
    stats: Arc<ScanStats>,
    cancel: Cancellation,
    detectors: Vec<Arc<dyn Detector>>,
    phase: Mutex<ScanPhase>,
    crawl_progress: Option<ProgressCallback>,
    probe_progress: Option<ProbeProgressCallback>,
    phase_callback: Option<PhaseCallback>,
}

impl ScanOrchestrator {
    pub fn new(target: Target) -> Result<Self> {
        let stats = Arc::new(ScanStats::new());
        let cancel = Cancellation::new();
        let client = HttpClient::new(&target)?
            .with_stats(stats.clone())
            .with_cancellation(cancel.clone());

        Ok(Self {
            target: Arc::new(target),
            client,
            stats,
            cancel,
            detectors: default_detectors(),
            phase: Mutex::new(ScanPhase::Idle),
            crawl_progress: None,
            probe_progress: None,
            phase_callback: None,
        })
    }

    pub fn with_detectors(mut self, detectors: Vec<Arc<dyn Detector>>) -> Self {
        self.detectors = detectors;
        self
    }

    /// Share an externally owned cancellation flag, e.g. one tripped by Ctrl-C.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.client = self.client.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.crawl_progress = Some(callback);
        self
    }

    pub fn with_probe_progress_callback(mut self, callback: ProbeProgressCallback) -> Self {
        self.probe_progress = Some(callback);
        self
    }

    pub fn with_phase_callback(mut self, callback: PhaseCallback) -> Self {
        self.phase_callback = Some(callback);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    pub fn stats(&self) -> &Arc<ScanStats> {
        &self.stats
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, next: ScanPhase) {
        {
            let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
            debug!("Scan phase {} -> {}", phase.as_str(), next.as_str());
            *phase = next;
        }
        if let Some(callback) = &self.phase_callback {
            callback(next);
        }
    }

    /// Run the whole scan. Only configuration problems (including an
    /// unreachable target) are returned as errors; a cancelled scan still
    /// yields a report marked `cancelled`.
    pub async fn run(&self) -> Result<Report> {
        let builder = Arc::new(ReportBuilder::new(self.target.seed().as_str()));
        info!("Scanning {}", self.target.seed());

        self.preflight().await?;

        self.set_phase(ScanPhase::Crawling);
        let mut crawler = Crawler::new(self.client.clone(), self.target.clone());
        if let Some(callback) = &self.crawl_progress {
            crawler = crawler.with_progress_callback(callback.clone());
        }
        let outcome = crawler.crawl().await?;
        info!(
            "Crawl finished: {} URLs, {} pages fetched",
            outcome.urls.len(),
            outcome.pages.len()
        );
        builder.set_urls_visited(outcome.urls.clone());
        builder.merge(outcome.findings);

        self.set_phase(ScanPhase::Probing);
        self.probe_all(&outcome.urls, &builder).await?;

        self.set_phase(ScanPhase::Auditing);
        if !self.cancel.is_cancelled() {
            builder.merge(audit_security_headers(&self.client, &self.target).await);
        }

        self.set_phase(ScanPhase::Done);
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!("Scan cancelled, reporting partial results");
        }

        let report = builder.finalize(self.stats.snapshot(), cancelled);
        info!(
            "Scan complete: {} findings across {} URLs",
            report.total_findings(),
            report.urls_visited
        );
        Ok(report)
    }

    /// The seed must answer before anything else happens. Any HTTP status
    /// counts as an answer.
    async fn preflight(&self) -> Result<()> {
        match self.client.get(self.target.seed(), true).await {
            Ok(response) => {
                debug!("Preflight {} -> {}", self.target.seed(), response.status);
                Ok(())
            }
            Err(ScanError::Cancelled) => Ok(()),
            Err(e @ (ScanError::Network(_) | ScanError::Timeout(_))) => Err(ScanError::Config(
                format!("Target {} is unreachable: {}", self.target.seed(), e),
            )),
            Err(ScanError::Parse(e)) => {
                warn!("Preflight response from {} unreadable: {}", self.target.seed(), e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Hand every visited URL to every detector, at most `concurrency` URLs
    /// in flight.
    async fn probe_all(&self, urls: &[String], builder: &Arc<ReportBuilder>) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.target.concurrency()));
        let mut handles = Vec::with_capacity(urls.len());

        for raw in urls {
            if self.cancel.is_cancelled() {
                break;
            }

            let url = match Url::parse(raw) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping unparsable URL {}: {}", raw, e);
                    continue;
                }
            };

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };

            let client = self.client.clone();
            let detectors = self.detectors.clone();
            let builder = builder.clone();
            let progress = self.probe_progress.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;

                if let Some(callback) = &progress {
                    callback(url.to_string());
                }

                for detector in &detectors {
                    if client.cancellation().is_cancelled() {
                        break;
                    }
                    let findings = detector.probe(&client, &url).await;
                    if !findings.is_empty() {
                        debug!("{} found {} issues at {}", detector.name(), findings.len(), url);
                    }
                    builder.merge(findings);
                }
            }));
        }

        for joined in join_all(handles).await {
            joined?;
        }

        Ok(())
    }
}
