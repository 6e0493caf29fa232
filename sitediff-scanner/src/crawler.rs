use crate::capture::{CaptureRequest, PageCapture};
use crate::error::Result;
use crate::links::LinkFetcher;
use crate::normalize::{clean_url, domain_of, has_ignored_extension, normalize_path, screenshot_slug};
use crate::profile::{CaptureConfig, SiteProfile};
use crate::result::{CrawlResult, PageRecord};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Discovered-but-unvisited URLs plus everything ever queued.
///
/// URLs are handed out in FIFO order. A URL enters `seen` when it is first
/// queued and never leaves, so each URL is handed out at most once.
#[derive(Debug)]
pub(crate) struct Frontier {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    in_flight: usize,
}

#[derive(Debug, PartialEq)]
pub(crate) enum FrontierPoll {
    Visit(String),
    /// Queue is empty but another worker may still discover links.
    Wait,
    Done,
}

impl Frontier {
    pub(crate) fn new(start_url: String) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            in_flight: 0,
        };
        frontier.push(start_url);
        frontier
    }

    /// Queue `url` unless it was queued before. Returns whether it was added.
    pub(crate) fn push(&mut self, url: String) -> bool {
        if self.seen.insert(url.clone()) {
            self.queue.push_back(url);
            true
        } else {
            false
        }
    }

    pub(crate) fn poll(&mut self) -> FrontierPoll {
        match self.queue.pop_front() {
            Some(url) => {
                self.in_flight += 1;
                FrontierPoll::Visit(url)
            }
            None if self.in_flight == 0 => FrontierPoll::Done,
            None => FrontierPoll::Wait,
        }
    }

    /// Mark a URL handed out by `poll` as fully processed.
    pub(crate) fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

struct CrawlState {
    frontier: Mutex<Frontier>,
    pages: Mutex<CrawlResult>,
    captures_attempted: AtomicUsize,
}

/// Everything a worker task needs, cloned once per worker.
#[derive(Clone)]
struct Worker {
    capture: Arc<dyn PageCapture>,
    fetcher: LinkFetcher,
    output_dir: Arc<PathBuf>,
    profile: Arc<SiteProfile>,
    capture_config: Arc<CaptureConfig>,
    domain: Arc<String>,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
    state: Arc<CrawlState>,
}

/// Domain-scoped crawler that screenshots every page it reaches.
pub struct Crawler {
    capture: Arc<dyn PageCapture>,
    fetcher: LinkFetcher,
    output_dir: PathBuf,
    profile: SiteProfile,
    capture_config: CaptureConfig,
    workers: usize,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(capture: Arc<dyn PageCapture>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_timeout(capture, output_dir, 10)
    }

    pub fn with_timeout(
        capture: Arc<dyn PageCapture>,
        output_dir: impl Into<PathBuf>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            capture,
            fetcher: LinkFetcher::new(timeout_secs)?,
            output_dir: output_dir.into(),
            profile: SiteProfile::default(),
            capture_config: CaptureConfig::default(),
            workers: 1,
            cancel: CancellationToken::new(),
            progress_callback: None,
        })
    }

    pub fn with_profile(mut self, profile: SiteProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_capture_config(mut self, config: CaptureConfig) -> Self {
        self.capture_config = config;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Crawl every in-domain page reachable from `start_url`.
    ///
    /// Per-page capture and fetch failures are logged and skipped. An
    /// unparseable start URL yields an empty result.
    pub async fn crawl(&self, start_url: &str) -> Result<CrawlResult> {
        info!("Starting crawl of {} with {} workers", start_url, self.workers);

        let (Some(domain), Some(start)) = (domain_of(start_url), clean_url(start_url)) else {
            warn!("Cannot crawl {}: no domain", start_url);
            return Ok(CrawlResult::new());
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let state = Arc::new(CrawlState {
            frontier: Mutex::new(Frontier::new(start)),
            pages: Mutex::new(CrawlResult::new()),
            captures_attempted: AtomicUsize::new(0),
        });

        let worker = Worker {
            capture: self.capture.clone(),
            fetcher: self.fetcher.clone(),
            output_dir: Arc::new(self.output_dir.clone()),
            profile: Arc::new(self.profile.clone()),
            capture_config: Arc::new(self.capture_config.clone()),
            domain: Arc::new(domain),
            cancel: self.cancel.clone(),
            progress_callback: self.progress_callback.clone(),
            state: state.clone(),
        };

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let worker = worker.clone();
            handles.push(tokio::spawn(async move { worker.run(worker_id).await }));
        }
        for joined in futures::future::join_all(handles).await {
            joined?;
        }

        let seen = state.frontier.lock().await.seen_count();
        let pages = std::mem::take(&mut *state.pages.lock().await);
        if self.cancel.is_cancelled() {
            warn!("Crawl of {} cancelled after {} pages", start_url, pages.len());
        }
        info!(
            "Crawl of {} complete. {} URLs discovered, {} pages captured",
            start_url,
            seen,
            pages.len()
        );
        Ok(pages)
    }
}

impl Worker {
    async fn run(self, worker_id: usize) {
        debug!("Worker {} started", worker_id);
        loop {
            if self.cancel.is_cancelled() {
                debug!("Worker {} cancelled", worker_id);
                break;
            }

            let next = self.state.frontier.lock().await.poll();
            let url = match next {
                FrontierPoll::Visit(url) => url,
                FrontierPoll::Wait => {
                    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                    continue;
                }
                FrontierPoll::Done => break,
            };

            self.visit(worker_id, &url).await;
            self.state.frontier.lock().await.finish();
        }
        debug!("Worker {} finished", worker_id);
    }

    async fn visit(&self, worker_id: usize, url: &str) {
        if has_ignored_extension(url, &self.profile.ignored_extensions) {
            debug!("Skipping {} (ignored extension)", url);
            return;
        }

        info!("Visiting: {}", url);
        if let Some(ref callback) = self.progress_callback {
            callback(worker_id, url.to_string());
        }

        let index = self.state.captures_attempted.fetch_add(1, Ordering::Relaxed);
        if let Some(record) = self.capture_page(url, index).await {
            let mut pages = self.state.pages.lock().await;
            if let Some(previous) = pages.insert(record) {
                warn!(
                    "{} and {} normalize to the same path '{}'; keeping the latter",
                    previous.source_url, url, previous.normalized_path
                );
            }
        }

        if self.profile.is_stop_url(url) {
            info!("Not following links from stop URL {}", url);
            return;
        }

        match self.fetcher.fetch_links(url).await {
            Ok(links) => self.enqueue(links).await,
            Err(e) => warn!("Could not fetch content for link extraction from {}: {}", url, e),
        }
    }

    async fn capture_page(&self, url: &str, index: usize) -> Option<PageRecord> {
        let request = CaptureRequest {
            url: url.to_string(),
            viewport_width: self.capture_config.viewport_width,
            min_height: self.capture_config.min_height,
            hide_selectors: self.profile.hide_selectors.clone(),
        };
        let capture = self.capture.clone();

        let screenshot = match tokio::task::spawn_blocking(move || capture.capture(&request)).await
        {
            Ok(Ok(screenshot)) => screenshot,
            Ok(Err(e)) => {
                warn!("{}", e);
                return None;
            }
            Err(e) => {
                warn!("Capture task for {} failed: {}", url, e);
                return None;
            }
        };

        let path = self
            .output_dir
            .join(format!("page_{}_{}.png", index, screenshot_slug(url)));
        if let Err(e) = tokio::fs::write(&path, &screenshot.png).await {
            warn!("Could not save screenshot {}: {}", path.display(), e);
            return None;
        }
        debug!("Screenshot saved: {}", path.display());

        Some(PageRecord {
            normalized_path: normalize_path(url),
            title: screenshot.title,
            source_url: url.to_string(),
            image_path: path,
        })
    }

    async fn enqueue(&self, links: Vec<String>) {
        let mut frontier = self.state.frontier.lock().await;
        for link in links {
            let Some(clean) = clean_url(&link) else {
                continue;
            };
            if has_ignored_extension(&clean, &self.profile.ignored_extensions) {
                continue;
            }
            if domain_of(&clean).as_deref() != Some(self.domain.as_str()) {
                continue;
            }
            if frontier.push(clean.clone()) {
                debug!("Queued {}", clean);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontier_is_fifo() {
        let mut frontier = Frontier::new("a".to_string());
        frontier.push("b".to_string());
        frontier.push("c".to_string());
        assert_eq!(frontier.poll(), FrontierPoll::Visit("a".to_string()));
        assert_eq!(frontier.poll(), FrontierPoll::Visit("b".to_string()));
        assert_eq!(frontier.poll(), FrontierPoll::Visit("c".to_string()));
    }

    #[test]
    fn test_frontier_rejects_seen_urls() {
        let mut frontier = Frontier::new("a".to_string());
        assert!(!frontier.push("a".to_string()));
        assert_eq!(frontier.poll(), FrontierPoll::Visit("a".to_string()));
        frontier.finish();
        // Already visited: never handed out again.
        assert!(!frontier.push("a".to_string()));
        assert_eq!(frontier.poll(), FrontierPoll::Done);
        assert_eq!(frontier.seen_count(), 1);
    }

    #[test]
    fn test_frontier_waits_while_work_in_flight() {
        let mut frontier = Frontier::new("a".to_string());
        assert_eq!(frontier.poll(), FrontierPoll::Visit("a".to_string()));
        assert_eq!(frontier.poll(), FrontierPoll::Wait);
        frontier.push("b".to_string());
        frontier.finish();
        assert_eq!(frontier.poll(), FrontierPoll::Visit("b".to_string()));
        frontier.finish();
        assert_eq!(frontier.poll(), FrontierPoll::Done);
    }
}
