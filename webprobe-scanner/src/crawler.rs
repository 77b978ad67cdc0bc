use crate::error::{Result, ScanError};
use crate::finding::Finding;
use crate::frontier::{CrawlTask, Frontier, VisitedSet};
use crate::http::HttpClient;
use crate::result::{CrawlOutcome, CrawlResult};
use crate::target::Target;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Marker string of auto-generated directory index pages.
pub const DIRECTORY_LISTING_MARKER: &str = "Index of /";

pub struct Crawler {
    client: HttpClient,
    target: Arc<Target>,
    visited: Arc<VisitedSet>,
    results: Arc<Mutex<Vec<CrawlResult>>>,
    findings: Arc<Mutex<Vec<Finding>>>,
    workers: usize,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(client: HttpClient, target: Arc<Target>) -> Self {
        let workers = target.concurrency();
        Self {
            client,
            target,
            visited: Arc::new(VisitedSet::new()),
            results: Arc::new(Mutex::new(Vec::new())),
            findings: Arc::new(Mutex::new(Vec::new())),
            workers,
            progress_callback: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn visited(&self) -> &Arc<VisitedSet> {
        &self.visited
    }

    /// Crawl from the target's seed to the target's depth limit.
    pub async fn crawl(&self) -> Result<CrawlOutcome> {
        let seed = self.target.seed().clone();
        let max_depth = self.target.max_depth();
        self.crawl_from(&seed, max_depth).await
    }

    /// Level-by-level traversal from `seed`. A task with depth `d` is
    /// fetched only if `d > 0`; its links are queued with `d - 1`.
    pub async fn crawl_from(&self, seed: &Url, max_depth: usize) -> Result<CrawlOutcome> {
        info!(
            "Starting crawl of {} (depth {}, {} workers)",
            seed, max_depth, self.workers
        );

        let mut seed = seed.clone();
        seed.set_fragment(None);
        if !self.target.is_same_origin(&seed) {
            return Err(ScanError::Config(format!(
                "Seed {} is outside the target origin",
                seed
            )));
        }

        let frontier = Arc::new(Frontier::new());
        if max_depth > 0 {
            frontier
                .push(CrawlTask {
                    url: seed,
                    depth: max_depth,
                })
                .await;
        }

        let mut worker_handles = Vec::new();

        for worker_id in 0..self.workers {
            let client = self.client.clone();
            let target = self.target.clone();
            let visited = self.visited.clone();
            let results = self.results.clone();
            let findings = self.findings.clone();
            let frontier = frontier.clone();
            let progress_cb = self.progress_callback.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                loop {
                    if client.cancellation().is_cancelled() {
                        debug!("Worker {} stopping: scan cancelled", worker_id);
                        break;
                    }

                    let Some(task) = frontier.pop().await else {
                        if frontier.is_drained() {
                            break;
                        }
                        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                        continue;
                    };

                    let depth = task.depth;
                    Self::process_task(
                        worker_id,
                        task,
                        &client,
                        &target,
                        &visited,
                        &frontier,
                        &results,
                        &findings,
                        &progress_cb,
                    )
                    .await;
                    frontier.complete(depth).await;
                }

                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        for handle in worker_handles {
            handle.await?;
        }

        let outcome = CrawlOutcome {
            urls: self.visited.to_vec().await,
            findings: self.findings.lock().await.clone(),
            pages: self.results.lock().await.clone(),
            cancelled: self.client.cancellation().is_cancelled(),
        };
        info!("Crawl complete. Visited {} URLs", outcome.urls.len());
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_task(
        worker_id: usize,
        task: CrawlTask,
        client: &HttpClient,
        target: &Target,
        visited: &VisitedSet,
        frontier: &Frontier,
        results: &Mutex<Vec<CrawlResult>>,
        findings: &Mutex<Vec<Finding>>,
        progress_cb: &Option<ProgressCallback>,
    ) {
        if task.depth == 0 || !visited.insert_if_absent(task.url.as_str()).await {
            return;
        }

        if let Some(callback) = progress_cb {
            callback(worker_id, task.url.to_string());
        }

        match Self::fetch_and_parse_static(client, target, &task).await {
            Ok((crawl_result, new_urls)) => {
                if crawl_result.directory_listing {
                    info!("Directory listing at {}", task.url);
                    findings
                        .lock()
                        .await
                        .push(Finding::directory_listing(task.url.as_str()));
                }

                let child_depth = task.depth - 1;
                if child_depth > 0 {
                    for url in new_urls {
                        if !visited.contains(url.as_str()).await {
                            frontier.push(CrawlTask {
                                url,
                                depth: child_depth,
                            })
                            .await;
                        }
                    }
                }

                results.lock().await.push(crawl_result);
            }
            Err(e) => {
                if e.is_recoverable() {
                    debug!("Crawl branch pruned at {}: {}", task.url, e);
                } else {
                    warn!("Crawl error for {}: {}", task.url, e);
                }
                results.lock().await.push(CrawlResult::with_error(
                    task.url.to_string(),
                    task.depth,
                    e.to_string(),
                ));
            }
        }
    }

    async fn fetch_and_parse_static(
        client: &HttpClient,
        target: &Target,
        task: &CrawlTask,
    ) -> Result<(CrawlResult, Vec<Url>)> {
        debug!("Fetching {}", task.url);

        let start = Instant::now();
        let response = client.get(&task.url, true).await?;

        let mut result = CrawlResult::new(task.url.to_string(), task.depth);
        result.status_code = response.status;
        result.content_type = response.header("content-type").map(String::from);
        result.content_length = response.body.len();
        result.response_time = start.elapsed();
        result.directory_listing =
            response.status == 200 && response.body.contains(DIRECTORY_LISTING_MARKER);

        if response.status != 200 {
            return Ok((result, Vec::new()));
        }
        if !response.is_html() {
            client.stats().record_non_html();
            return Ok((result, Vec::new()));
        }
        if !target.is_same_origin(&response.final_url) {
            debug!(
                "{} redirected off-origin to {}, not following its links",
                task.url, response.final_url
            );
            return Ok((result, Vec::new()));
        }

        let links = match Self::extract_links_static(&response.body, &response.final_url, target)
        {
            Ok(links) => links,
            Err(e) => {
                client.stats().record_error(&e);
                return Err(e);
            }
        };
        result.links_found = links.iter().map(|u| u.to_string()).collect();

        Ok((result, links))
    }

    /// Same-origin, fragment-free links of a page, resolved against the
    /// page's own URL. Duplicates within the page are dropped.
    pub fn extract_links_static(html: &str, page_url: &Url, target: &Target) -> Result<Vec<Url>> {
        let document = Html::parse_document(html);
        let link_selector = Selector::parse("a[href]")
            .map_err(|e| ScanError::Parse(format!("Invalid selector: {:?}", e)))?;

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&link_selector) {
            if let Some(href) = element.value().attr("href")
                && let Some(absolute_url) = Self::resolve_url_static(page_url, href)
            {
                if !target.is_same_origin(&absolute_url) {
                    debug!("  -> Cross-origin, skipping {}", absolute_url);
                    continue;
                }
                if seen.insert(absolute_url.to_string()) {
                    links.push(absolute_url);
                }
            }
        }

        Ok(links)
    }

    pub fn resolve_url_static(base: &Url, href: &str) -> Option<Url> {
        let href = href.trim();
        // Skip empty, javascript:, mailto:, tel:, etc.
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            return None;
        }

        let mut resolved = base.join(href).ok()?;
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return None;
        }
        resolved.set_fragment(None);
        Some(resolved)
    }

    pub async fn get_results(&self) -> Vec<CrawlResult> {
        self.results.lock().await.clone()
    }

    pub async fn get_visited_count(&self) -> usize {
        self.visited.len().await
    }
}
