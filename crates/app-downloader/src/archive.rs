//! Moves finished downloads into their final place under the output root.

use std::{
    io,
    path::{Path, PathBuf},
};

use app_config::{ArchiveRuleKind, CollisionPolicy, DownloadConfig};
use app_helpers::{
    dirs::ensure_dir,
    file_name::{file_name_with_suffix, sanitize_path_component},
    id::short_id,
    media::{probe_dimensions, MediaKind},
    temp_file::TempFile,
};
use tokio::fs::OpenOptions;
use tracing::{debug, trace, warn};

use crate::task::DownloadTask;

pub const UNCLASSIFIED: &str = "unclassified";
pub const UNKNOWN_SIZE: &str = "unknown-size";
/// Working directory for in-flight downloads, inside the output root.
pub const WORK_DIR_NAME: &str = ".downloading";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveRule {
    /// Everything in the output root.
    Flat,
    /// One directory per `{width}x{height}` of the downloaded media.
    ByDetectedDimensions,
    /// One directory per classification key, optionally cut at `delimiter`.
    ByKeyColumn { delimiter: Option<String> },
    /// `{group}/{key}/{media kind}/{width}x{height}`.
    ///
    /// The key is cut at `delimiter` like in [`ArchiveRule::ByKeyColumn`].
    /// Tasks without a group or key use [`UNCLASSIFIED`] for that level.
    Nested { delimiter: Option<String> },
}

impl ArchiveRule {
    #[must_use]
    pub fn from_config(conf: &DownloadConfig) -> Self {
        match conf.archive_rule {
            ArchiveRuleKind::Flat => Self::Flat,
            ArchiveRuleKind::Dimensions => Self::ByDetectedDimensions,
            ArchiveRuleKind::KeyColumn => Self::ByKeyColumn {
                delimiter: conf.key_delimiter.clone().filter(|x| !x.is_empty()),
            },
            ArchiveRuleKind::Nested => Self::Nested {
                delimiter: conf.key_delimiter.clone().filter(|x| !x.is_empty()),
            },
        }
    }
}

/// Directory name for a classification key.
///
/// Only the part before `delimiter` is used. Blank keys land in
/// [`UNCLASSIFIED`].
#[must_use]
pub fn bucket_for_key(key: Option<&str>, delimiter: Option<&str>) -> String {
    key.map(|x| match delimiter {
        Some(d) if !d.is_empty() => x.split(d).next().unwrap_or(x),
        _ => x,
    })
    .and_then(sanitize_path_component)
    .unwrap_or_else(|| UNCLASSIFIED.to_string())
}

/// `{group}/{key}` part of the nested layout.
fn group_key_dir(task: &DownloadTask, delimiter: Option<&str>) -> PathBuf {
    let group = task
        .origin()
        .and_then(|x| sanitize_path_component(&x.group))
        .unwrap_or_else(|| UNCLASSIFIED.to_string());

    PathBuf::from(group).join(bucket_for_key(task.classification_key(), delimiter))
}

/// `{stem}` itself or `{stem}.{anything}`, nothing else.
fn is_archived_as(file_name: &str, stem: &str) -> bool {
    file_name
        .strip_prefix(stem)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[derive(Debug, Clone)]
pub struct Archiver {
    root: PathBuf,
    rule: ArchiveRule,
    collision: CollisionPolicy,
    ffprobe_path: Option<PathBuf>,
}

impl Archiver {
    pub fn new<T>(
        root: T,
        rule: ArchiveRule,
        collision: CollisionPolicy,
        ffprobe_path: Option<PathBuf>,
    ) -> Self
    where
        T: Into<PathBuf>,
    {
        Self {
            root: root.into(),
            rule,
            collision,
            ffprobe_path,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR_NAME)
    }

    /// `{url id}_{display name}`, shared by every file archived for a task.
    #[must_use]
    pub fn file_stem(task: &DownloadTask) -> String {
        format!("{}_{}", task.url_id(), task.display_name())
    }

    #[must_use]
    pub fn file_name(task: &DownloadTask, extension: &str) -> String {
        format!("{}{}", Self::file_stem(task), extension)
    }

    /// Sub-directory for a downloaded payload, relative to the root.
    /// `None` means the root itself.
    pub async fn bucket_for(&self, task: &DownloadTask, payload: &Path) -> Option<PathBuf> {
        match &self.rule {
            ArchiveRule::Flat => None,
            ArchiveRule::ByKeyColumn { delimiter } => Some(
                bucket_for_key(task.classification_key(), delimiter.as_deref()).into(),
            ),
            ArchiveRule::ByDetectedDimensions => {
                let (_, size) = self.probe_media(payload).await;
                Some(size.into())
            }
            ArchiveRule::Nested { delimiter } => {
                let (kind, size) = self.probe_media(payload).await;
                Some(
                    group_key_dir(task, delimiter.as_deref())
                        .join(kind.as_str())
                        .join(size),
                )
            }
        }
    }

    /// Media kind and `{width}x{height}` of a payload, or [`UNKNOWN_SIZE`].
    async fn probe_media(&self, payload: &Path) -> (MediaKind, String) {
        let path = payload.to_path_buf();
        let ffprobe_path = self.ffprobe_path.clone();

        let probed = tokio::task::spawn_blocking(move || {
            let kind = MediaKind::detect(&path).unwrap_or(MediaKind::Other);
            (kind, probe_dimensions(&path, ffprobe_path.as_deref()))
        })
        .await;

        match probed {
            Ok((kind, Ok(dims))) => (kind, dims.to_string()),
            Ok((kind, Err(e))) => {
                debug!(?payload, error = %e, "Could not read media dimensions");
                (kind, UNKNOWN_SIZE.to_string())
            }
            Err(e) => {
                warn!(?payload, error = %e, "Dimension probe panicked");
                (MediaKind::Other, UNKNOWN_SIZE.to_string())
            }
        }
    }

    fn bucket_dir(&self, bucket: Option<&Path>) -> PathBuf {
        bucket.map_or_else(|| self.root.clone(), |x| self.root.join(x))
    }

    /// Find a file archived for this task by an earlier run.
    ///
    /// Dimension buckets are only known after downloading, so every
    /// bucket directory is searched for that rule. The nested layout is
    /// searched below the task's `{group}/{key}` directory.
    pub async fn find_existing(&self, task: &DownloadTask) -> Option<PathBuf> {
        let stem = Self::file_stem(task);

        let dirs = match &self.rule {
            ArchiveRule::Flat => vec![self.root.clone()],
            ArchiveRule::ByKeyColumn { delimiter } => vec![self.root.join(bucket_for_key(
                task.classification_key(),
                delimiter.as_deref(),
            ))],
            ArchiveRule::ByDetectedDimensions => sub_dirs(&self.root).await,
            ArchiveRule::Nested { delimiter } => {
                let base = self.root.join(group_key_dir(task, delimiter.as_deref()));
                let mut dirs = vec![];
                for kind in sub_dirs(&base).await {
                    dirs.extend(sub_dirs(&kind).await);
                }
                dirs
            }
        };

        for dir in dirs {
            if let Some(found) = find_in_dir(&dir, &stem).await {
                return Some(found);
            }
        }

        None
    }

    /// Move a finished download to its final path and return that path.
    pub async fn place(
        &self,
        task: &DownloadTask,
        mut payload: TempFile,
        extension: &str,
    ) -> Result<PathBuf, io::Error> {
        let bucket = self.bucket_for(task, payload.path()).await;
        let dir = self.bucket_dir(bucket.as_deref());
        ensure_dir(&dir).await?;
        payload.close().await?;

        let target = dir.join(Self::file_name(task, extension));
        let target = match self.collision {
            CollisionPolicy::Overwrite => target,
            CollisionPolicy::Rename => claim_free_path(target).await?,
        };

        trace!(from = ?payload.path(), to = ?target, "Moving download into archive");
        if let Err(e) = move_replacing(payload.path(), &target).await {
            if self.collision == CollisionPolicy::Rename {
                let _ = tokio::fs::remove_file(&target).await;
            }
            return Err(e);
        }
        payload.keep();

        Ok(target)
    }
}

/// Directories directly inside `dir`, sorted, without the work directory.
async fn sub_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![];

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return dirs;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name() == WORK_DIR_NAME {
            continue;
        }

        if entry.file_type().await.is_ok_and(|x| x.is_dir()) {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    dirs
}

async fn find_in_dir(dir: &Path, stem: &str) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if is_archived_as(name, stem) && entry.file_type().await.is_ok_and(|x| x.is_file()) {
            return Some(entry.path());
        }
    }

    None
}

/// Reserve `target`, or `target` with a short suffix when it is taken,
/// by creating an empty file there.
///
/// Creation fails if the file exists, so two workers never get the same path.
async fn claim_free_path(target: PathBuf) -> Result<PathBuf, io::Error> {
    let mut candidate = target.clone();

    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate).await {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = file_name_with_suffix(&target, &short_id());
            }
            Err(e) => return Err(e),
        }
    }

    if candidate != target {
        debug!(?target, ?candidate, "Target exists, renaming new file");
    }

    Ok(candidate)
}

/// Rename `from` onto `to`, replacing whatever is there.
///
/// The old file is only removed when the platform refuses to rename over it.
async fn move_replacing(from: &Path, to: &Path) -> Result<(), io::Error> {
    match tokio::fs::rename(from, to).await {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(?to, "Replacing existing file");
            tokio::fs::remove_file(to).await?;
            tokio::fs::rename(from, to).await
        }
        res => res,
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::task::Origin;

    fn task(key: Option<&str>) -> DownloadTask {
        DownloadTask::new(0, "https://cdn.example.com/spot.mp4", "spot")
            .with_classification_key(key.map(ToString::to_string))
    }

    async fn payload(dir: &Path, data: &[u8]) -> TempFile {
        let mut tmp = TempFile::create_in(dir, "part_").await.expect("temp file");
        tmp.file_mut()
            .expect("handle")
            .write_all(data)
            .await
            .expect("write");
        tmp.close().await.expect("close");
        tmp
    }

    #[test]
    fn key_buckets() {
        assert_eq!(bucket_for_key(Some("summer-sale"), None), "summer-sale");
        assert_eq!(bucket_for_key(Some("summer/2024"), Some("/")), "summer");
        assert_eq!(bucket_for_key(Some("a: b"), None), "a_ b");
        assert_eq!(bucket_for_key(None, Some("/")), UNCLASSIFIED);
        assert_eq!(bucket_for_key(Some("  "), None), UNCLASSIFIED);
        assert_eq!(bucket_for_key(Some("/rest"), Some("/")), UNCLASSIFIED);
    }

    #[test]
    fn rule_from_config() {
        let conf = DownloadConfig {
            archive_rule: ArchiveRuleKind::KeyColumn,
            key_delimiter: Some("|".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ArchiveRule::from_config(&conf),
            ArchiveRule::ByKeyColumn {
                delimiter: Some("|".to_string())
            }
        );

        let conf = DownloadConfig {
            archive_rule: ArchiveRuleKind::Dimensions,
            ..Default::default()
        };
        assert_eq!(ArchiveRule::from_config(&conf), ArchiveRule::ByDetectedDimensions);

        let conf = DownloadConfig {
            archive_rule: ArchiveRuleKind::Nested,
            key_delimiter: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(ArchiveRule::from_config(&conf), ArchiveRule::Nested { delimiter: None });
    }

    #[test]
    fn archived_names_match_whole_stem() {
        assert!(is_archived_as("abc_spot.mp4", "abc_spot"));
        assert!(is_archived_as("abc_spot.k3j2x1.mp4", "abc_spot"));
        assert!(is_archived_as("abc_spot", "abc_spot"));
        assert!(!is_archived_as("abc_spotlight.mp4", "abc_spot"));
        assert!(!is_archived_as("xabc_spot.mp4", "abc_spot"));
    }

    #[tokio::test]
    async fn places_into_key_bucket() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archiver = Archiver::new(
            dir.path(),
            ArchiveRule::ByKeyColumn { delimiter: None },
            CollisionPolicy::Rename,
            None,
        );
        let task = task(Some("promo"));

        let tmp = payload(&archiver.work_dir(), b"video").await;
        let tmp_path = tmp.path().to_path_buf();

        let placed = archiver.place(&task, tmp, ".mp4").await.expect("placed");

        assert_eq!(
            placed,
            dir.path()
                .join("promo")
                .join(format!("{}_spot.mp4", task.url_id()))
        );
        assert_eq!(std::fs::read(&placed).expect("read"), b"video");
        assert!(!tmp_path.exists());
        assert_eq!(archiver.find_existing(&task).await, Some(placed));
    }

    #[tokio::test]
    async fn collisions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let task = task(None);

        let rename = Archiver::new(dir.path(), ArchiveRule::Flat, CollisionPolicy::Rename, None);
        let first = rename
            .place(&task, payload(&rename.work_dir(), b"one").await, ".png")
            .await
            .expect("first");
        let second = rename
            .place(&task, payload(&rename.work_dir(), b"two").await, ".png")
            .await
            .expect("second");

        assert_ne!(first, second);
        assert_eq!(first.parent(), second.parent());
        let second_name = second.file_name().expect("name").to_string_lossy().to_string();
        assert!(second_name.starts_with(&Archiver::file_stem(&task)));
        assert!(second_name.ends_with(".png"));
        assert_eq!(std::fs::read(&first).expect("read"), b"one");

        let overwrite = Archiver::new(dir.path(), ArchiveRule::Flat, CollisionPolicy::Overwrite, None);
        let third = overwrite
            .place(&task, payload(&overwrite.work_dir(), b"three").await, ".png")
            .await
            .expect("third");

        assert_eq!(third, first);
        assert_eq!(std::fs::read(&first).expect("read"), b"three");
    }

    #[tokio::test]
    async fn concurrent_renames_never_share_a_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archiver = Archiver::new(dir.path(), ArchiveRule::Flat, CollisionPolicy::Rename, None);
        let task = task(None);

        let mut payloads = vec![];
        for i in 0..8_u8 {
            payloads.push(payload(&archiver.work_dir(), &[i]).await);
        }

        let placed = futures::future::join_all(
            payloads
                .into_iter()
                .map(|tmp| archiver.place(&task, tmp, ".png")),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("placed");

        let mut contents = placed
            .iter()
            .map(|x| std::fs::read(x).expect("read"))
            .collect::<Vec<_>>();
        contents.sort();

        assert_eq!(contents, (0..8_u8).map(|i| vec![i]).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_old_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archiver = Archiver::new(dir.path(), ArchiveRule::Flat, CollisionPolicy::Overwrite, None);
        let task = task(None);

        let existing = archiver
            .place(&task, payload(&archiver.work_dir(), b"old").await, ".png")
            .await
            .expect("first");

        let tmp = payload(&archiver.work_dir(), b"new").await;
        std::fs::remove_file(tmp.path()).expect("remove payload");

        assert!(archiver.place(&task, tmp, ".png").await.is_err());
        assert_eq!(std::fs::read(&existing).expect("read"), b"old");
    }

    #[tokio::test]
    async fn nested_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archiver = Archiver::new(
            dir.path(),
            ArchiveRule::Nested {
                delimiter: Some("/".to_string()),
            },
            CollisionPolicy::Rename,
            None,
        );
        let in_week = |key: &str, week: &str| {
            task(Some(key)).with_origin(Origin {
                row: 2,
                group: week.to_string(),
            })
        };

        let mut png = vec![];
        image::RgbImage::new(8, 6)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode png");

        let promo = in_week("promo/a", "Week 1");
        let placed = archiver
            .place(&promo, payload(&archiver.work_dir(), &png).await, ".png")
            .await
            .expect("placed");

        assert_eq!(
            placed,
            dir.path()
                .join("Week 1")
                .join("promo")
                .join("image")
                .join("8x6")
                .join(Archiver::file_name(&promo, ".png"))
        );
        assert_eq!(archiver.find_existing(&promo).await, Some(placed));
        assert_eq!(archiver.find_existing(&in_week("promo/a", "Week 2")).await, None);
        assert_eq!(archiver.find_existing(&in_week("teaser", "Week 1")).await, None);

        let no_origin = task(None);
        let placed = archiver
            .place(&no_origin, payload(&archiver.work_dir(), b"words").await, ".bin")
            .await
            .expect("placed");

        assert_eq!(
            placed.parent(),
            Some(
                dir.path()
                    .join(UNCLASSIFIED)
                    .join(UNCLASSIFIED)
                    .join("other")
                    .join(UNKNOWN_SIZE)
                    .as_path()
            )
        );
    }

    #[tokio::test]
    async fn dimensions_fall_back_to_unknown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archiver = Archiver::new(
            dir.path(),
            ArchiveRule::ByDetectedDimensions,
            CollisionPolicy::Rename,
            None,
        );
        let task = task(None);

        let placed = archiver
            .place(&task, payload(&archiver.work_dir(), b"not media").await, ".bin")
            .await
            .expect("placed");

        assert_eq!(placed.parent(), Some(dir.path().join(UNKNOWN_SIZE).as_path()));
        assert_eq!(archiver.find_existing(&task).await, Some(placed));
    }

    #[tokio::test]
    async fn nothing_found_in_empty_root() {
        let dir = tempfile::tempdir().expect("tempdir");

        for rule in [
            ArchiveRule::Flat,
            ArchiveRule::ByDetectedDimensions,
            ArchiveRule::ByKeyColumn { delimiter: None },
            ArchiveRule::Nested { delimiter: None },
        ] {
            let archiver = Archiver::new(dir.path().join("missing"), rule, CollisionPolicy::Rename, None);
            assert_eq!(archiver.find_existing(&task(Some("x"))).await, None);
        }
    }
}
