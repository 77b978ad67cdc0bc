use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use url::Url;

/// A pending unit of crawl work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: usize,
}

/// Canonical URLs the crawler has claimed. Membership is the only dedup
/// authority: a URL is visited if and only if it is in here.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<VisitedInner>,
}

#[derive(Debug, Default)]
struct VisitedInner {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `url`. Returns false if it was already present.
    pub async fn insert_if_absent(&self, url: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.seen.contains(url) {
            return false;
        }
        inner.seen.insert(url.to_string());
        inner.order.push(url.to_string());
        true
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.inner.lock().await.seen.contains(url)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Members in the order they were claimed.
    pub async fn to_vec(&self) -> Vec<String> {
        self.inner.lock().await.order.clone()
    }
}

/// Shared work queue for the crawl workers.
///
/// Tasks are handed out one depth level at a time: a task is only popped
/// once nothing deeper in the remaining-depth order is queued or in flight.
/// Children always carry a smaller depth than their parent, so the first
/// claim of a URL is always made along its shortest path from the seed and
/// the crawled set does not depend on worker count.
///
/// `pending` counts tasks that are queued or still being processed, so an
/// empty pop with `pending > 0` means another worker may still enqueue.
#[derive(Debug, Default)]
pub struct Frontier {
    levels: Mutex<Levels>,
    pending: AtomicUsize,
}

#[derive(Debug, Default)]
struct Levels {
    queued: BTreeMap<usize, VecDeque<CrawlTask>>,
    in_flight: BTreeMap<usize, usize>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, task: CrawlTask) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.levels
            .lock()
            .await
            .queued
            .entry(task.depth)
            .or_default()
            .push_back(task);
    }

    /// Next task of the highest queued depth, or `None` while a higher level
    /// is still in flight.
    pub async fn pop(&self) -> Option<CrawlTask> {
        let mut levels = self.levels.lock().await;
        let depth = *levels.queued.keys().next_back()?;
        if levels.in_flight.range(depth + 1..).next().is_some() {
            return None;
        }

        let queue = levels.queued.get_mut(&depth)?;
        let task = queue.pop_front()?;
        if queue.is_empty() {
            levels.queued.remove(&depth);
        }
        *levels.in_flight.entry(depth).or_default() += 1;
        Some(task)
    }

    /// Mark a popped task of `depth` as fully processed, after its children
    /// were pushed.
    pub async fn complete(&self, depth: usize) {
        let mut levels = self.levels.lock().await;
        if let Some(count) = levels.in_flight.get_mut(&depth) {
            *count -= 1;
            if *count == 0 {
                levels.in_flight.remove(&depth);
            }
        }
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn is_drained(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_if_absent_claims_once() {
        let visited = VisitedSet::new();
        assert!(visited.insert_if_absent("http://example.com/").await);
        assert!(!visited.insert_if_absent("http://example.com/").await);
        assert!(visited.insert_if_absent("http://example.com/a").await);
        assert_eq!(
            visited.to_vec().await,
            vec!["http://example.com/", "http://example.com/a"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let visited = Arc::new(VisitedSet::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let visited = visited.clone();
            handles.push(tokio::spawn(async move {
                visited.insert_if_absent("http://example.com/race").await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(visited.len().await, 1);
    }

    #[tokio::test]
    async fn test_frontier_drains_only_after_complete() {
        let frontier = Frontier::new();
        let task = CrawlTask {
            url: Url::parse("http://example.com/").unwrap(),
            depth: 2,
        };
        frontier.push(task.clone()).await;
        assert!(!frontier.is_drained());

        assert_eq!(frontier.pop().await, Some(task));
        assert!(frontier.pop().await.is_none());
        assert!(!frontier.is_drained());

        frontier.complete(2).await;
        assert!(frontier.is_drained());
    }

    fn task(path: &str, depth: usize) -> CrawlTask {
        CrawlTask {
            url: Url::parse(&format!("http://example.com{}", path)).unwrap(),
            depth,
        }
    }

    #[tokio::test]
    async fn test_frontier_finishes_a_level_before_the_next() {
        let frontier = Frontier::new();
        frontier.push(task("/", 3)).await;
        frontier.push(task("/a", 3)).await;

        let first = frontier.pop().await.unwrap();
        // A shallower child queued while its level is busy waits.
        frontier.push(task("/a/child", 2)).await;
        assert_eq!(frontier.pop().await, Some(task("/a", 3)));
        assert!(frontier.pop().await.is_none());

        frontier.complete(first.depth).await;
        assert!(frontier.pop().await.is_none());

        frontier.complete(3).await;
        assert_eq!(frontier.pop().await, Some(task("/a/child", 2)));
        frontier.complete(2).await;
        assert!(frontier.is_drained());
    }

    #[tokio::test]
    async fn test_frontier_prefers_deeper_tasks() {
        let frontier = Frontier::new();
        frontier.push(task("/late", 1)).await;
        frontier.push(task("/early", 2)).await;

        assert_eq!(frontier.pop().await, Some(task("/early", 2)));
        frontier.complete(2).await;
        assert_eq!(frontier.pop().await, Some(task("/late", 1)));
    }
}
