use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use tokio::fs::{File, OpenOptions};

use super::{dirs::ensure_dir, id::time_thread_id};

/// A file that is removed when dropped, unless [`TempFile::keep`] was called.
///
/// Dropping a half-written download is therefore enough to clean it up.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    file: Option<File>,
    delete_on_drop: bool,
}
impl TempFile {
    /// Create a new, empty file named `{prefix}{unique id}` inside `dir`.
    pub async fn create_in<T>(dir: &Path, file_name_prefix: T) -> Result<Self, io::Error>
    where
        T: Into<OsString> + Send,
    {
        ensure_dir(dir).await?;

        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Temp directory is not a directory",
            ));
        }

        let mut file_name: OsString = file_name_prefix.into();
        file_name.push(time_thread_id());

        let path = dir.join(file_name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Some(file),
            delete_on_drop: true,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_mut(&mut self) -> Result<&mut File, io::Error> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Temp file is already closed"))
    }

    /// Flush and close the handle. The file itself stays on disk.
    pub async fn close(&mut self) -> Result<(), io::Error> {
        if let Some(file) = self.file.take() {
            file.sync_all().await?;
        }

        Ok(())
    }

    /// The file has been moved elsewhere or should outlive this handle.
    pub fn keep(&mut self) -> &mut Self {
        self.delete_on_drop = false;
        self
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        drop(self.file.take());

        if self.delete_on_drop {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn removed_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");

        let mut tmp = TempFile::create_in(dir.path(), "part_")
            .await
            .expect("create temp file");
        tmp.file_mut()
            .expect("open handle")
            .write_all(b"partial")
            .await
            .expect("write");
        let path = tmp.path().to_path_buf();

        assert!(path.exists());
        assert!(path
            .file_name()
            .is_some_and(|x| x.to_string_lossy().starts_with("part_")));

        drop(tmp);

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn kept_files_survive() {
        let dir = tempfile::tempdir().expect("tempdir");

        let mut tmp = TempFile::create_in(&dir.path().join("nested"), "part_")
            .await
            .expect("create temp file");
        tmp.close().await.expect("close");
        tmp.keep();
        let path = tmp.path().to_path_buf();

        drop(tmp);

        assert!(path.exists());
    }
}
