//! The comparison job: crawl or load both sites, compare, rank.
//!
//! A [`JobRunner`] owns the single job slot. Starting a job while another
//! is running is rejected with [`JobError::AlreadyRunning`]. Progress is
//! published on a `watch` channel as a [`JobState`]; the report comes back
//! through the [`JobHandle`].

use crate::compare::compare_pages;
use crate::config::CompareConfig;
use crate::error::JobError;
use crate::report::ComparisonReport;
use crate::workspace::{Side, paired_site_dir_names, run_dir, run_timestamp, site_dir_name};
use serde::Serialize;
use sitediff_scanner::crawler::ProgressCallback;
use sitediff_scanner::{CaptureFactory, CrawlResult, Crawler};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Completed,
    /// Carries the description of the error that ended the job.
    Failed(String),
}

impl JobState {
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }

    pub fn status(&self) -> JobStatus {
        let message = match self {
            JobState::Idle => String::new(),
            JobState::Running => "Processing... preparing to crawl or load data.".to_string(),
            JobState::Completed => "Comparison finished successfully!".to_string(),
            JobState::Failed(reason) => format!("Workflow Error: {}", reason),
        };
        JobStatus {
            running: self.is_running(),
            message,
        }
    }
}

/// What a status surface shows for the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub running: bool,
    pub message: String,
}

/// Where a side's pages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSource {
    /// Crawl the site now into a new run directory.
    Crawl,
    /// Reuse a previous run, given as `{site_name}/{timestamp}` under the output root.
    Load(String),
}

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub url_a: String,
    pub url_b: String,
    pub source_a: SiteSource,
    pub source_b: SiteSource,
}

impl CompareRequest {
    pub fn crawl(url_a: impl Into<String>, url_b: impl Into<String>) -> Self {
        Self {
            url_a: url_a.into(),
            url_b: url_b.into(),
            source_a: SiteSource::Crawl,
            source_b: SiteSource::Crawl,
        }
    }

    pub fn with_load_a(mut self, run: impl Into<String>) -> Self {
        self.source_a = SiteSource::Load(run.into());
        self
    }

    pub fn with_load_b(mut self, run: impl Into<String>) -> Self {
        self.source_b = SiteSource::Load(run.into());
        self
    }
}

/// A started job.
pub struct JobHandle {
    id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<Result<ComparisonReport, JobError>>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the job and take its report.
    pub async fn wait(self) -> Result<ComparisonReport, JobError> {
        self.handle.await?
    }
}

/// Releases the job slot and publishes the final state, even when the job
/// task panics or is aborted.
struct SlotGuard {
    running: Arc<AtomicBool>,
    state: Arc<watch::Sender<JobState>>,
    finished: bool,
}

impl SlotGuard {
    fn release(&self, final_state: JobState) {
        // The slot is freed under the channel lock so a new job's Running
        // state can never be overwritten by this job's final state.
        self.state.send_modify(|state| {
            *state = final_state;
            self.running.store(false, Ordering::Release);
        });
    }

    fn finish(mut self, final_state: JobState) {
        self.release(final_state);
        self.finished = true;
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.release(JobState::Failed("Job aborted unexpectedly.".to_string()));
        }
    }
}

#[derive(Clone)]
struct JobContext {
    config: Arc<CompareConfig>,
    capture_factory: CaptureFactory,
    progress_callback: Option<ProgressCallback>,
}

/// Runs at most one comparison job at a time.
#[derive(Clone)]
pub struct JobRunner {
    context: JobContext,
    running: Arc<AtomicBool>,
    state: Arc<watch::Sender<JobState>>,
}

impl JobRunner {
    pub fn new(config: CompareConfig, capture_factory: CaptureFactory) -> Self {
        let (state, _) = watch::channel(JobState::Idle);
        Self {
            context: JobContext {
                config: Arc::new(config),
                capture_factory,
                progress_callback: None,
            },
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(state),
        }
    }

    /// Called with `(worker_id, url)` for every page visited by either crawl.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.context.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CompareConfig {
        &self.context.config
    }

    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.state.borrow().status()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start a job unless one is already running.
    pub fn try_start(&self, request: CompareRequest) -> Result<JobHandle, JobError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected comparison request: a job is already running");
            return Err(JobError::AlreadyRunning);
        }

        let id = Uuid::new_v4();
        self.state.send_replace(JobState::Running);
        info!(
            "Job {} started: {} vs {}",
            id, request.url_a, request.url_b
        );

        let guard = SlotGuard {
            running: self.running.clone(),
            state: self.state.clone(),
            finished: false,
        };
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let context = self.context.clone();

        let handle = tokio::spawn(async move {
            let result = run_workflow(&context, &request, &task_cancel, id).await;
            let final_state = match &result {
                Ok(report) => {
                    info!("Job {} finished with {} entries", id, report.entries.len());
                    JobState::Completed
                }
                Err(e) => {
                    error!("Job {} failed: {}", id, e);
                    JobState::Failed(e.to_string())
                }
            };
            guard.finish(final_state);
            result
        });

        Ok(JobHandle { id, cancel, handle })
    }
}

async fn run_workflow(
    context: &JobContext,
    request: &CompareRequest,
    cancel: &CancellationToken,
    id: Uuid,
) -> Result<ComparisonReport, JobError> {
    let timestamp = run_timestamp();
    let (dir_a, dir_b) = match (&request.source_a, &request.source_b) {
        (SiteSource::Crawl, SiteSource::Crawl) => {
            paired_site_dir_names(&request.url_a, &request.url_b)
        }
        _ => (
            site_dir_name(&request.url_a, Side::A),
            site_dir_name(&request.url_b, Side::B),
        ),
    };

    // Either side failing stops the other one.
    let sides = cancel.child_token();
    let (result_a, result_b) = tokio::join!(
        cancel_on_error(
            acquire_site(
                context,
                Side::A,
                &request.url_a,
                &request.source_a,
                &dir_a,
                &timestamp,
                &sides,
            ),
            &sides,
        ),
        cancel_on_error(
            acquire_site(
                context,
                Side::B,
                &request.url_b,
                &request.source_b,
                &dir_b,
                &timestamp,
                &sides,
            ),
            &sides,
        ),
    );
    let (result_a, result_b) = match (result_a, result_b) {
        (Ok(a), Ok(b)) => (a, b),
        // Site A was only stopped because site B failed.
        (Err(JobError::Cancelled), Err(e)) if !cancel.is_cancelled() => return Err(e),
        (Err(e), _) | (_, Err(e)) => return Err(e),
    };

    if cancel.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    info!("Comparing pages...");
    let config = &context.config;
    let entries = compare_pages(
        &result_a,
        &result_b,
        &config.analysis,
        config.analysis_workers,
        cancel,
    )
    .await?;

    Ok(ComparisonReport::new(
        id.to_string(),
        request.url_a.clone(),
        request.url_b.clone(),
        entries,
    ))
}

async fn cancel_on_error<T>(
    acquire: impl Future<Output = Result<T, JobError>>,
    cancel: &CancellationToken,
) -> Result<T, JobError> {
    let result = acquire.await;
    if let Err(e) = &result {
        warn!("Stopping the other site: {}", e);
        cancel.cancel();
    }
    result
}

/// Crawl or load one side. An empty result fails the job.
async fn acquire_site(
    context: &JobContext,
    side: Side,
    url: &str,
    source: &SiteSource,
    site_name: &str,
    timestamp: &str,
    cancel: &CancellationToken,
) -> Result<CrawlResult, JobError> {
    let config = &context.config;
    let no_pages = || JobError::NoPages {
        site: side.to_string(),
        url: url.to_string(),
    };

    let result = match source {
        SiteSource::Crawl => {
            let dir = run_dir(&config.output_root, site_name, timestamp);
            info!("Starting fresh crawl for {}: {} -> {}", side, url, dir.display());

            let factory = context.capture_factory.clone();
            let capture_config = config.capture.clone();
            let capture = match tokio::task::spawn_blocking(move || factory(&capture_config)).await? {
                Ok(capture) => capture,
                Err(e) => {
                    error!("Browser setup failed for {}: {}", side, e);
                    return Err(no_pages());
                }
            };

            let profile = match side {
                Side::A => config.site_a.clone(),
                Side::B => config.site_b.clone(),
            };
            let mut crawler = Crawler::with_timeout(capture, &dir, config.request_timeout_secs)?
                .with_profile(profile)
                .with_capture_config(config.capture.clone())
                .with_workers(config.workers)
                .with_cancel_token(cancel.clone());
            if let Some(callback) = &context.progress_callback {
                crawler = crawler.with_progress_callback(callback.clone());
            }

            let result = crawler.crawl(url).await?;
            if cancel.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            if let Err(e) = result.save(&dir) {
                warn!("Could not save crawled data to {}: {}", dir.display(), e);
            }
            result
        }
        SiteSource::Load(run) => {
            let dir = config.output_root.join(run);
            info!("Loading existing data for {} from {}", side, dir.display());
            CrawlResult::load(&dir)?
        }
    };

    if result.is_empty() {
        return Err(no_pages());
    }
    info!("Data acquired for {}: {} pages found", side, result.len());
    Ok(result)
}
