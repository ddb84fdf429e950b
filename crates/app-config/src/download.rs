use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::duration::HumanDuration;

pub const DEFAULT_WORKERS: usize = 4;
pub const MAX_WORKERS: usize = 16;
pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_SNIFF_THRESHOLD: u64 = 10 * 1024;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// What to do when the archived file name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Keep the existing file and add a short random suffix to the new one
    #[default]
    Rename,
    /// Replace the existing file
    Overwrite,
}

/// How downloaded files are sorted into sub-directories of the output directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveRuleKind {
    /// Put everything straight into the output directory
    Flat,
    /// One directory per media resolution, e.g. `1920x1080`
    Dimensions,
    /// One directory per value of the key column
    #[default]
    KeyColumn,
    /// `{sheet}/{key}/{image|video|other}/{resolution}`
    Nested,
}

#[derive(Debug, Clone, Serialize, Deserialize, Args, Validate)]
#[clap(next_help_heading = Some("Download options"))]
pub struct DownloadConfig {
    /// How many files to download at the same time
    #[arg(short = 'j', long, default_value_t = DEFAULT_WORKERS, env = "ARCHIVE_DOWNLOADER_WORKERS")]
    #[validate(range(min = 1, max = 16))]
    pub workers: usize,

    /// How many times a download is attempted before giving up
    #[arg(long, default_value_t = DEFAULT_ATTEMPTS, env = "ARCHIVE_DOWNLOADER_ATTEMPTS")]
    #[validate(range(min = 1, max = 10))]
    pub attempts: u32,

    /// How long to wait between attempts, e.g. `1500ms` or `2s`
    #[arg(long, default_value_t = HumanDuration::from_millis(1500), env = "ARCHIVE_DOWNLOADER_RETRY_DELAY")]
    pub retry_delay: HumanDuration,

    /// How long to wait for a connection to be established
    #[arg(long, default_value_t = HumanDuration::from_secs(15), env = "ARCHIVE_DOWNLOADER_CONNECT_TIMEOUT")]
    pub connect_timeout: HumanDuration,

    /// How long a download may stall without receiving any data
    #[arg(long, default_value_t = HumanDuration::from_secs(40), env = "ARCHIVE_DOWNLOADER_READ_TIMEOUT")]
    pub read_timeout: HumanDuration,

    /// Skip files that were already archived by a previous run
    #[arg(long, env = "ARCHIVE_DOWNLOADER_RESUME", overrides_with = "no_resume")]
    pub resume: bool,

    /// Download everything again, even if resuming was saved as a default
    #[arg(long, overrides_with = "resume")]
    #[serde(skip)]
    pub no_resume: bool,

    /// What to do when the target file already exists
    #[arg(long, value_enum, default_value_t = CollisionPolicy::default(), env = "ARCHIVE_DOWNLOADER_COLLISION")]
    pub collision: CollisionPolicy,

    /// How to sort downloaded files into directories
    #[arg(long, value_enum, default_value_t = ArchiveRuleKind::default(), env = "ARCHIVE_DOWNLOADER_ARCHIVE_RULE")]
    pub archive_rule: ArchiveRuleKind,

    /// Only use the part of the key before this delimiter as the directory name
    #[arg(long, env = "ARCHIVE_DOWNLOADER_KEY_DELIMITER")]
    #[validate(length(min = 1))]
    pub key_delimiter: Option<String>,

    /// Payloads smaller than this many bytes are checked for error pages
    #[arg(long, default_value_t = DEFAULT_SNIFF_THRESHOLD, env = "ARCHIVE_DOWNLOADER_SNIFF_THRESHOLD")]
    pub sniff_threshold: u64,

    /// User agent sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT, env = "ARCHIVE_DOWNLOADER_USER_AGENT")]
    #[validate(length(min = 1))]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: HumanDuration::from_millis(1500),
            connect_timeout: HumanDuration::from_secs(15),
            read_timeout: HumanDuration::from_secs(40),
            resume: false,
            no_resume: false,
            collision: CollisionPolicy::default(),
            archive_rule: ArchiveRuleKind::default(),
            key_delimiter: None,
            sniff_threshold: DEFAULT_SNIFF_THRESHOLD,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DownloadConfig {
    /// Worker count clamped to the supported range.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }

    /// `--no-resume` wins over a resume flag from any other source.
    #[must_use]
    pub const fn resume_enabled(&self) -> bool {
        self.resume && !self.no_resume
    }
}
