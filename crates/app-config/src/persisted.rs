use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    download::{CollisionPolicy, DownloadConfig},
    Config,
};

pub const DEFAULTS_FILE_NAME: &str = "defaults.toml";

/// Settings remembered between runs.
///
/// Only applied to options the user did not set explicitly for this run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision: Option<CollisionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<bool>,
}

impl PersistedDefaults {
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Config::config_dir().map(|x| x.join(DEFAULTS_FILE_NAME))
    }

    /// Reads the defaults file. A missing file is the same as an empty one.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read defaults from {path:?}"))?;

        toml::from_str(&raw).with_context(|| format!("Failed to parse defaults in {path:?}"))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {parent:?}"))?;
        }

        let raw = toml::to_string_pretty(self).context("Failed to serialize defaults")?;

        fs::write(path, raw).with_context(|| format!("Failed to write defaults to {path:?}"))
    }

    #[must_use]
    pub const fn from_download_config(conf: &DownloadConfig) -> Self {
        Self {
            workers: Some(conf.workers),
            collision: Some(conf.collision),
            resume: Some(conf.resume),
        }
    }

    /// Fill in the remembered values for every option `is_default` reports
    /// as untouched. `is_default` receives the clap argument id.
    pub fn apply_to<F>(&self, conf: &mut DownloadConfig, is_default: F)
    where
        F: Fn(&str) -> bool,
    {
        if let Some(workers) = self.workers {
            if is_default("workers") {
                conf.workers = workers;
            }
        }

        if let Some(collision) = self.collision {
            if is_default("collision") {
                conf.collision = collision;
            }
        }

        if let Some(resume) = self.resume {
            if is_default("resume") && is_default("no_resume") {
                conf.resume = resume;
            }
        }
    }
}
