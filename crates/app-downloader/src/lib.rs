//! Bulk download engine: turns tasks into archived files.

pub mod archive;
pub mod error;
pub mod event;
pub mod fetch;
pub mod manifest;
pub mod report;
pub mod request;
pub mod source;
pub mod task;

use std::path::PathBuf;

use app_config::DownloadConfig;
pub use archive::{ArchiveRule, Archiver};
pub use error::{EngineError, FailureKind, FetchError};
pub use event::{EventSink, RunEvent};
pub use fetch::Engine;
pub use report::{FetchResult, FetchStatus, ProgressSnapshot, Reporter, RunSummary};
pub use source::{CsvTable, SourceError, Table, TableSelection, TaskSource};
pub use task::{DownloadTask, Origin};

/// Download `tasks` into `root` without observing progress or cancellation.
pub async fn download_all<T>(
    config: &DownloadConfig,
    root: T,
    ffprobe_path: Option<PathBuf>,
    tasks: Vec<DownloadTask>,
) -> Result<RunSummary, EngineError>
where
    T: Into<PathBuf>,
{
    Engine::new(config, root, ffprobe_path)?.run(tasks).await
}
