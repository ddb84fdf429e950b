//! Bounded-concurrency download loop.

pub mod content;
mod transfer;

use std::{path::PathBuf, sync::Arc, time::Duration};

use app_config::DownloadConfig;
use app_helpers::{futures::retry_fixed, temp_dir::TempDir};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
pub use transfer::CHUNK_SIZE;
use transfer::{stream_to_temp, Fetched, TransferError};

use self::content::{detect_extension, looks_like_markup};
use crate::{
    archive::{ArchiveRule, Archiver},
    error::{error_chain, EngineError, FetchError, NOT_STARTED, STOPPED},
    event::{EventSink, RunEvent},
    report::{FetchResult, FetchStatus, Reporter, RunSummary},
    request::Client,
    task::DownloadTask,
};

/// Runs download tasks with a fixed number of workers.
///
/// Cheap to clone, clones share the client, the archiver and the
/// cancellation token.
#[derive(Debug, Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: DownloadConfig,
    client: reqwest::Client,
    archiver: Archiver,
    token: CancellationToken,
    events: EventSink,
}

impl Engine {
    pub fn new<T>(
        config: &DownloadConfig,
        root: T,
        ffprobe_path: Option<PathBuf>,
    ) -> Result<Self, EngineError>
    where
        T: Into<PathBuf>,
    {
        Self::with_parts(
            config,
            root,
            ffprobe_path,
            CancellationToken::new(),
            EventSink::none(),
        )
    }

    /// Like [`Engine::new`] but observing `token` and reporting to `events`.
    pub fn with_parts<T>(
        config: &DownloadConfig,
        root: T,
        ffprobe_path: Option<PathBuf>,
        token: CancellationToken,
        events: EventSink,
    ) -> Result<Self, EngineError>
    where
        T: Into<PathBuf>,
    {
        let client = Client::from_config(config)?;
        let archiver = Archiver::new(
            root,
            ArchiveRule::from_config(config),
            config.collision,
            ffprobe_path,
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config: config.clone(),
                client,
                archiver,
                token,
                events,
            }),
        })
    }

    /// Stop the run. Tasks not yet started end up cancelled, running
    /// transfers are abandoned and their partial files removed.
    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    /// Run every task and return once each one has a result.
    #[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
    pub async fn run(&self, tasks: Vec<DownloadTask>) -> Result<RunSummary, EngineError> {
        let total = tasks.len();
        let workers = self.inner.config.effective_workers();

        let work_dir_path = self.inner.archiver.work_dir();
        let work_dir = TempDir::absolute(&work_dir_path).map_err(|e| EngineError::WorkDir {
            path: work_dir_path.clone(),
            source: e,
        })?;

        info!(total, workers, root = ?self.inner.archiver.root(), "Starting downloads");
        self.inner.events.emit(RunEvent::Started { total });

        let mut reporter = Reporter::new(total);
        let mut results = futures::stream::iter(tasks)
            .map(|task| self.clone().spawn_one(task))
            .buffer_unordered(workers);

        while let Some(result) = results.next().await {
            log_result(&result);
            self.inner.events.emit(RunEvent::Finished(result.clone()));

            if reporter.record(result) {
                self.inner.events.emit(RunEvent::Progress(reporter.snapshot()));
            }
        }

        drop(work_dir);

        let summary = reporter.finish(self.inner.token.is_cancelled());
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed(),
            cancelled = summary.cancelled,
            "Downloads finished"
        );
        self.inner.events.emit(RunEvent::Completed(summary.clone()));

        Ok(summary)
    }

    async fn spawn_one(self, task: DownloadTask) -> FetchResult {
        let fallback = task.clone();

        match tokio::spawn(async move { self.fetch_one(task).await }).await {
            Ok(result) => result,
            Err(e) => FetchResult::from_error(fallback, &FetchError::Internal(e.to_string()), 0),
        }
    }

    #[tracing::instrument(skip_all, fields(id = task.id(), url = task.url()))]
    async fn fetch_one(&self, task: DownloadTask) -> FetchResult {
        let inner = &*self.inner;

        if inner.token.is_cancelled() {
            return FetchResult::from_error(task, &FetchError::Cancelled(NOT_STARTED), 0);
        }

        if !task.has_valid_url() {
            return FetchResult::from_error(task, &FetchError::InvalidLink, 0);
        }

        if inner.config.resume_enabled() {
            if let Some(existing) = inner.archiver.find_existing(&task).await {
                return FetchResult::skipped(task, &existing);
            }
        }

        let fetched = tokio::select! {
            biased;
            () = inner.token.cancelled() => Err(FetchError::Cancelled(STOPPED)),
            res = inner.download(&task) => res,
        };

        let fetched = match fetched {
            Ok(x) => x,
            Err(e) => return FetchResult::from_error(task, &e, 0),
        };
        let bytes = fetched.bytes;

        if let Err(e) = check_payload(&fetched, inner.config.sniff_threshold) {
            return FetchResult::from_error(task, &e, bytes);
        }

        let extension = detect_extension(fetched.content_type.as_deref(), task.url());

        match inner.archiver.place(&task, fetched.file, &extension).await {
            Ok(path) => FetchResult::success(task, bytes, path),
            Err(e) => FetchResult::from_error(task, &FetchError::Archive(e), bytes),
        }
    }
}

impl Inner {
    async fn download(&self, task: &DownloadTask) -> Result<Fetched, FetchError> {
        let attempts = self.config.attempts.max(1);
        let work_dir = self.archiver.work_dir();
        let work_dir = work_dir.as_path();

        retry_fixed(attempts, self.config.retry_delay.as_duration(), move || {
            stream_to_temp(&self.client, task, work_dir, &self.events)
        })
        .on_retry(|attempt: u32, next_delay: Option<Duration>, e: &TransferError| {
            let error = error_chain(e);
            async move {
                debug!(attempt, ?next_delay, %error, "Attempt failed, retrying");
            }
        })
        .await
        .map_err(|e| FetchError::Transport {
            attempts,
            message: error_chain(&e),
        })
    }
}

/// Reject payloads that are empty or that are small error pages.
fn check_payload(fetched: &Fetched, sniff_threshold: u64) -> Result<(), FetchError> {
    if fetched.bytes == 0 {
        return Err(FetchError::EmptyFile);
    }

    if fetched.bytes < sniff_threshold && looks_like_markup(&fetched.head) {
        return Err(FetchError::LinkExpired);
    }

    Ok(())
}

fn log_result(result: &FetchResult) {
    let task = result.task();
    let row = task.origin().map(|x| x.row);

    match result.status() {
        FetchStatus::Success => {
            info!(id = task.id(), name = task.display_name(), path = ?result.final_path(), "Downloaded");
        }
        FetchStatus::Skipped => {
            info!(id = task.id(), name = task.display_name(), reason = result.reason(), "Skipped");
        }
        FetchStatus::Failed => {
            warn!(id = task.id(), ?row, name = task.display_name(), reason = result.reason(), "Failed");
        }
        FetchStatus::Cancelled => {
            debug!(id = task.id(), name = task.display_name(), "Cancelled");
        }
    }
}
