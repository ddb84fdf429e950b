use std::{io, path::Path};

/// Create `path` and its parents if missing.
///
/// Several workers may race to create the same directory, so finding it
/// already there is success.
pub async fn ensure_dir(path: &Path) -> io::Result<()> {
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
