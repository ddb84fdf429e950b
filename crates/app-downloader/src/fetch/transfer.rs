use std::{io, path::Path};

use app_helpers::temp_file::TempFile;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, trace};

use super::content::SNIFF_LEN;
use crate::{
    event::{EventSink, RunEvent},
    task::DownloadTask,
};

/// Write buffer size for downloads.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Why a single attempt failed. All of these are retried.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Request(reqwest::Error),

    #[error(transparent)]
    Status(reqwest::Error),

    #[error("Failed to write download: {0}")]
    Io(#[from] io::Error),
}

/// A payload fully written to a temp file.
#[derive(Debug)]
pub struct Fetched {
    pub file: TempFile,
    pub bytes: u64,
    pub content_type: Option<String>,
    /// Up to [`SNIFF_LEN`] leading bytes.
    pub head: Vec<u8>,
}

/// One GET request streamed into a new temp file in `work_dir`.
///
/// Dropping the returned future removes whatever was written so far.
pub async fn stream_to_temp(
    client: &reqwest::Client,
    task: &DownloadTask,
    work_dir: &Path,
    events: &EventSink,
) -> Result<Fetched, TransferError> {
    let mut res = client
        .get(task.url())
        .send()
        .await
        .map_err(TransferError::Request)?
        .error_for_status()
        .map_err(TransferError::Status)?;

    let total = res.content_length();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|x| x.to_str().ok())
        .map(ToString::to_string);
    debug!(?content_type, ?total, "Got response");

    let mut file = TempFile::create_in(work_dir, format!("{}_", task.url_id())).await?;
    let mut received = 0_u64;
    let mut head = Vec::with_capacity(SNIFF_LEN);

    {
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file.file_mut()?);

        while let Some(chunk) = res.chunk().await.map_err(TransferError::Request)? {
            if head.len() < SNIFF_LEN {
                let take = (SNIFF_LEN - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }

            writer.write_all(&chunk).await?;
            received += chunk.len() as u64;

            trace!(received, ?total, "Got chunk");
            events.emit(RunEvent::Transfer {
                task_id: task.id(),
                name: task.display_name().to_string(),
                received,
                total,
            });
        }

        writer.flush().await?;
    }

    file.close().await?;

    Ok(Fetched {
        file,
        bytes: received,
        content_type,
        head,
    })
}
