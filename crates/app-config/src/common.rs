use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, ValueEnum, ValueHint};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{cli::CliArgs, APPLICATION_NAME};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Args, Validate)]
#[clap(next_help_heading = Some("Program paths"))]
pub struct ProgramPathConfig {
    /// Path to the ffprobe executable.
    ///
    /// Used to read video dimensions when archiving by detected size.
    /// If not provided, ffprobe will be searched for in $PATH.
    /// Videos land in the unknown-size bucket when it can't be found.
    #[arg(long, default_value = None, env = "ARCHIVE_DOWNLOADER_FFPROBE", value_hint = ValueHint::FilePath, value_parser = validate_valid_path())]
    #[validate(custom(function = "valid_path"))]
    ffprobe_path: Option<PathBuf>,
}
impl ProgramPathConfig {
    #[must_use]
    pub fn ffprobe_path(&self) -> Option<&Path> {
        self.ffprobe_path.as_deref()
    }

    #[must_use]
    pub fn resolve_paths(mut self) -> Self {
        self.with_resolved_paths();
        self
    }

    pub fn with_resolved_paths(&mut self) -> &Self {
        self.ffprobe_path = self
            .ffprobe_path
            .clone()
            .or_else(|| which::which("ffprobe").ok());

        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ValueEnum)]
pub enum DumpConfigType {
    Json,
    Toml,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Args, Validate)]
#[allow(clippy::option_option)]
#[clap(next_help_heading = Some("Run options"))]
pub struct RunConfig {
    /// Dump the config to stdout
    #[arg(long, value_enum, default_value = None)]
    pub dump_config: Option<Option<DumpConfigType>>,

    /// Dump shell completions to stdout
    #[arg(long, default_value = None, value_name = "SHELL", value_parser = hacky_dump_completions())]
    #[serde(skip)]
    pub dump_completions: Option<Shell>,

    /// Remember the worker count, collision policy and resume mode
    /// as the defaults for future runs
    #[arg(long)]
    #[serde(skip)]
    pub save_defaults: bool,
}

#[must_use]
pub fn validate_valid_path() -> impl clap::builder::TypedValueParser {
    move |s: &str| {
        let path = Path::new(s);
        if !path.exists() {
            return Err("File does not exist");
        }

        Ok(path.to_path_buf())
    }
}

pub fn valid_path(path: &Path) -> Result<(), ValidationError> {
    if !path.exists() {
        return Err(ValidationError::new("File does not exist"));
    }

    if !path.is_file() {
        return Err(ValidationError::new("Path is not a valid file"));
    }

    Ok(())
}

#[must_use]
pub fn hacky_dump_completions() -> impl clap::builder::TypedValueParser {
    move |s: &str| {
        let parsed = Shell::from_str(s, true);

        if let Ok(shell) = &parsed {
            clap_complete::generate(
                *shell,
                &mut CliArgs::command(),
                APPLICATION_NAME,
                &mut std::io::stdout(),
            );
            std::process::exit(0);
        }

        parsed
            .map(|_| ())
            .map_err(|_| ValidationError::new("Invalid shell"))
    }
}
