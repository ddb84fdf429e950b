use std::{io, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Reason stored for tasks that never started because the run was stopped.
pub const NOT_STARTED: &str = "stopped before start";
/// Reason stored for tasks that were interrupted mid-transfer.
pub const STOPPED: &str = "stopped by user";

/// Broad category of a failed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    InvalidInput,
    Transport,
    ContentIntegrity,
    Archival,
    Internal,
}

/// Everything that can end a single task without a downloaded file.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid link")]
    InvalidLink,

    #[error("download failed after {attempts} attempts: {message}")]
    Transport { attempts: u32, message: String },

    #[error("empty file")]
    EmptyFile,

    #[error("link expired")]
    LinkExpired,

    #[error("archive error: {0}")]
    Archive(#[source] io::Error),

    #[error("{0}")]
    Cancelled(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FetchError {
    /// `None` for cancellation, which is not counted as a failure.
    #[must_use]
    pub const fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::InvalidLink => Some(FailureKind::InvalidInput),
            Self::Transport { .. } => Some(FailureKind::Transport),
            Self::EmptyFile | Self::LinkExpired => Some(FailureKind::ContentIntegrity),
            Self::Archive(_) => Some(FailureKind::Archival),
            Self::Internal(_) => Some(FailureKind::Internal),
            Self::Cancelled(_) => None,
        }
    }
}

/// Errors that stop a whole run before any task is attempted.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to prepare working directory {path:?}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Render an error together with its sources, `outer: inner: innermost`.
pub(crate) fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();

    while let Some(inner) = source {
        let msg = inner.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = inner.source();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_read_well() {
        assert_eq!(FetchError::InvalidLink.to_string(), "invalid link");
        assert_eq!(FetchError::EmptyFile.to_string(), "empty file");
        assert_eq!(FetchError::LinkExpired.to_string(), "link expired");
        assert_eq!(
            FetchError::Transport {
                attempts: 3,
                message: "HTTP status client error (404 Not Found)".to_string(),
            }
            .to_string(),
            "download failed after 3 attempts: HTTP status client error (404 Not Found)"
        );
        assert_eq!(
            FetchError::Archive(io::Error::new(io::ErrorKind::Other, "disk full")).to_string(),
            "archive error: disk full"
        );
    }

    #[test]
    fn cancellation_is_not_a_failure() {
        assert_eq!(FetchError::Cancelled(STOPPED).kind(), None);
        assert_eq!(
            FetchError::LinkExpired.kind(),
            Some(FailureKind::ContentIntegrity)
        );
    }

    #[test]
    fn chain_includes_sources() {
        let inner = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let outer = FetchError::Archive(inner);

        assert_eq!(
            error_chain(&outer),
            "archive error: connection refused"
        );
    }
}
