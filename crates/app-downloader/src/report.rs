use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    error::{FailureKind, FetchError},
    task::DownloadTask,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStatus {
    Success,
    Skipped,
    Failed,
    Cancelled,
}

/// Outcome of one task. Only successful results carry a final path.
#[derive(Debug, Clone)]
pub struct FetchResult {
    task: DownloadTask,
    status: FetchStatus,
    reason: Option<String>,
    failure_kind: Option<FailureKind>,
    bytes_transferred: u64,
    final_path: Option<PathBuf>,
}

impl FetchResult {
    #[must_use]
    pub fn success(task: DownloadTask, bytes_transferred: u64, final_path: PathBuf) -> Self {
        Self {
            task,
            status: FetchStatus::Success,
            reason: None,
            failure_kind: None,
            bytes_transferred,
            final_path: Some(final_path),
        }
    }

    /// The task was archived by an earlier run.
    #[must_use]
    pub fn skipped(task: DownloadTask, existing: &Path) -> Self {
        Self {
            task,
            status: FetchStatus::Skipped,
            reason: Some(format!("already archived at {}", existing.display())),
            failure_kind: None,
            bytes_transferred: 0,
            final_path: None,
        }
    }

    #[must_use]
    pub fn from_error(task: DownloadTask, error: &FetchError, bytes_transferred: u64) -> Self {
        let status = match error {
            FetchError::Cancelled(_) => FetchStatus::Cancelled,
            _ => FetchStatus::Failed,
        };

        Self {
            task,
            status,
            reason: Some(error.to_string()),
            failure_kind: error.kind(),
            bytes_transferred,
            final_path: None,
        }
    }

    #[must_use]
    pub const fn task(&self) -> &DownloadTask {
        &self.task
    }

    #[must_use]
    pub const fn status(&self) -> FetchStatus {
        self.status
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }

    #[must_use]
    pub const fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    #[must_use]
    pub fn final_path(&self) -> Option<&Path> {
        self.final_path.as_deref()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == FetchStatus::Failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub cancelled: usize,
    /// Ordered by task id.
    pub failed_tasks: Vec<FetchResult>,
    pub was_cancelled: bool,
}

impl RunSummary {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed_tasks.len()
    }

    /// Nothing failed and nothing was left undone.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_tasks.is_empty() && self.cancelled == 0 && !self.was_cancelled
    }
}

/// Collects task outcomes into counters. Owned by a single consumer.
#[derive(Debug)]
pub struct Reporter {
    total: usize,
    seen: HashSet<usize>,
    succeeded: usize,
    skipped: usize,
    cancelled: usize,
    failed: Vec<FetchResult>,
}

impl Reporter {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            seen: HashSet::with_capacity(total),
            succeeded: 0,
            skipped: 0,
            cancelled: 0,
            failed: vec![],
        }
    }

    /// Count a result. A second result for the same task is ignored and
    /// `false` is returned.
    pub fn record(&mut self, result: FetchResult) -> bool {
        if !self.seen.insert(result.task().id()) {
            return false;
        }

        match result.status() {
            FetchStatus::Success => self.succeeded += 1,
            FetchStatus::Skipped => self.skipped += 1,
            FetchStatus::Cancelled => self.cancelled += 1,
            FetchStatus::Failed => self.failed.push(result),
        }

        true
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let completed = self.completed();
        let percent = if self.total == 0 {
            100
        } else {
            u8::try_from((completed.min(self.total) * 100) / self.total).unwrap_or(100)
        };

        ProgressSnapshot {
            completed,
            total: self.total,
            percent,
        }
    }

    #[must_use]
    pub fn finish(self, was_cancelled: bool) -> RunSummary {
        let mut failed_tasks = self.failed;
        failed_tasks.sort_by_key(|x| x.task().id());

        RunSummary {
            total: self.total,
            succeeded: self.succeeded,
            skipped: self.skipped,
            cancelled: self.cancelled,
            failed_tasks,
            was_cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NOT_STARTED;

    fn task(id: usize) -> DownloadTask {
        DownloadTask::new(id, format!("https://example.com/{id}"), "x")
    }

    #[test]
    fn counts_each_task_once() {
        let mut reporter = Reporter::new(4);

        assert!(reporter.record(FetchResult::success(task(0), 10, "a".into())));
        assert!(!reporter.record(FetchResult::from_error(
            task(0),
            &FetchError::EmptyFile,
            0
        )));
        assert!(reporter.record(FetchResult::from_error(task(3), &FetchError::InvalidLink, 0)));
        assert!(reporter.record(FetchResult::from_error(task(1), &FetchError::EmptyFile, 0)));
        assert!(reporter.record(FetchResult::from_error(
            task(2),
            &FetchError::Cancelled(NOT_STARTED),
            0
        )));

        let summary = reporter.finish(true);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.skipped, 0);
        assert!(summary.was_cancelled);
        assert!(!summary.is_clean());
        assert_eq!(
            summary
                .failed_tasks
                .iter()
                .map(|x| x.task().id())
                .collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(summary.failed_tasks[0].reason(), Some("empty file"));
    }

    #[test]
    fn progress_is_monotonic() {
        let mut reporter = Reporter::new(3);
        let mut last = reporter.snapshot();
        assert_eq!(last.percent, 0);

        for id in [2, 0, 0, 1] {
            reporter.record(FetchResult::success(task(id), 1, "a".into()));
            let now = reporter.snapshot();
            assert!(now.completed >= last.completed);
            assert!(now.percent >= last.percent);
            last = now;
        }

        assert_eq!(
            last,
            ProgressSnapshot {
                completed: 3,
                total: 3,
                percent: 100
            }
        );
    }

    #[test]
    fn empty_run_is_complete() {
        let reporter = Reporter::new(0);

        assert_eq!(reporter.snapshot().percent, 100);
        assert!(reporter.finish(false).is_clean());
    }

    #[test]
    fn only_success_has_a_path() {
        let ok = FetchResult::success(task(0), 5, "out/a.png".into());
        assert_eq!(ok.final_path(), Some(Path::new("out/a.png")));
        assert_eq!(ok.failure_kind(), None);

        let skipped = FetchResult::skipped(task(1), Path::new("out/b.png"));
        assert_eq!(skipped.final_path(), None);
        assert_eq!(skipped.status(), FetchStatus::Skipped);

        let failed = FetchResult::from_error(task(2), &FetchError::LinkExpired, 120);
        assert_eq!(failed.final_path(), None);
        assert!(failed.is_failed());
        assert_eq!(failed.bytes_transferred(), 120);
        assert_eq!(failed.failure_kind(), Some(FailureKind::ContentIntegrity));
    }
}
