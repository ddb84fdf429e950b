use std::path::{Path, PathBuf};

use tracing::debug;

/// A working directory that is removed when dropped if it ended up empty.
///
/// Leftovers from an interrupted run are kept so they can be inspected.
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}
impl TempDir {
    pub fn absolute<T>(absolute_dir_path: T) -> Result<Self, std::io::Error>
    where
        T: Into<PathBuf>,
    {
        let tmp_dir = absolute_dir_path.into();

        if !tmp_dir.exists() {
            std::fs::create_dir_all(&tmp_dir)?;
        }

        if !tmp_dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "Path exists and is not a directory",
            ));
        }

        Ok(Self { path: tmp_dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        // Only succeeds for empty directories.
        if let Err(e) = std::fs::remove_dir(&self.path) {
            debug!(path = ?self.path, ?e, "Temp directory was not removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dir_is_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".work");

        let tmp = TempDir::absolute(&path).expect("create");
        assert!(tmp.path().is_dir());

        drop(tmp);
        assert!(!path.exists());
    }

    #[test]
    fn non_empty_dir_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".work");

        let tmp = TempDir::absolute(&path).expect("create");
        std::fs::write(path.join("leftover"), b"x").expect("write");

        drop(tmp);
        assert!(path.join("leftover").exists());
    }
}
