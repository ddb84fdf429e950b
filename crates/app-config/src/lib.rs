pub mod cli;
pub mod common;
pub mod download;
pub mod duration;
pub mod input;
pub mod persisted;
pub mod validators;

use std::path::PathBuf;

use clap::{parser::ValueSource, CommandFactory, FromArgMatches};
use cli::CliArgs;
use common::DumpConfigType;
use directories::ProjectDirs;
pub use download::{ArchiveRuleKind, CollisionPolicy, DownloadConfig};
use persisted::PersistedDefaults;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub static APPLICATION_NAME: &str = "archive-downloader";
pub static ORGANIZATION_NAME: &str = "allypost";
pub static ORGANIZATION_QUALIFIER: &str = "net";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(skip)]
    #[validate(nested)]
    pub run: common::RunConfig,

    /// Path to various programs used by the application at runtime
    #[validate(nested)]
    pub dependency_paths: common::ProgramPathConfig,

    /// How downloads are fetched and archived
    #[validate(nested)]
    pub download: DownloadConfig,

    /// Where the download tasks come from and where they go
    #[validate(nested)]
    pub input: input::InputConfig,
}
impl Config {
    /// Build the configuration for this process from the command line,
    /// the environment and the persisted defaults.
    ///
    /// Exits the process on invalid configuration, after dumping the config
    /// or after printing shell completions.
    pub fn load() -> anyhow::Result<Self> {
        let matches = CliArgs::command().get_matches();
        let args = CliArgs::from_arg_matches(&matches)?;

        let mut config = Self::default().merge_with_cli(args);

        match PersistedDefaults::default_path() {
            Some(path) => {
                let defaults = PersistedDefaults::load_from(&path)?;
                defaults.apply_to(&mut config.download, |id| {
                    matches!(matches.value_source(id), None | Some(ValueSource::DefaultValue))
                });
            }
            None => (),
        }

        let config = config.resolve_paths().validate_self();

        if config.run.save_defaults {
            config.save_defaults()?;
        }

        Ok(config.dump_if_needed())
    }

    #[must_use]
    #[inline]
    pub fn config_dir() -> Option<PathBuf> {
        Self::get_project_dir().map(|x| x.config_dir().into())
    }

    /// Persist the current download defaults for future runs.
    pub fn save_defaults(&self) -> anyhow::Result<()> {
        let Some(path) = PersistedDefaults::default_path() else {
            anyhow::bail!("Could not determine the configuration directory");
        };

        PersistedDefaults::from_download_config(&self.download).save_to(&path)
    }

    pub fn dump_config_if_needed<T>(data: &T, dump_type: &Option<Option<DumpConfigType>>)
    where
        T: Serialize + ?Sized,
    {
        let Some(dump_type) = dump_type else {
            return;
        };

        let out = match dump_type {
            None | Some(DumpConfigType::Json) => {
                serde_json::to_string_pretty(data).map_err(|e| e.to_string())
            }
            Some(DumpConfigType::Toml) => toml::to_string_pretty(data).map_err(|e| e.to_string()),
        };

        match out {
            Ok(out) => {
                println!("{}", out.trim());
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Failed to serialize config: {e}");
                std::process::exit(1);
            }
        }
    }

    #[inline]
    pub fn validate_config_and_exit<T: Validate>(conf: T) -> T {
        if let Err(e) = conf.validate() {
            eprintln!("Errors validating configuration:");
            print_validation_errors(&e, "  ", 1);
            std::process::exit(1);
        }

        conf
    }

    fn merge_with_cli(mut self, args: CliArgs) -> Self {
        self.run = args.run;
        self.dependency_paths = args.dependency_path;
        self.download = args.download;
        self.input = args.input;

        self
    }

    fn resolve_paths(mut self) -> Self {
        self.dependency_paths = self.dependency_paths.resolve_paths();

        self
    }

    fn dump_if_needed(self) -> Self {
        Self::dump_config_if_needed(&self, &self.run.dump_config);
        self
    }

    #[inline]
    fn validate_self(self) -> Self {
        Self::validate_config_and_exit(self)
    }

    #[inline]
    fn get_project_dir() -> Option<ProjectDirs> {
        ProjectDirs::from(ORGANIZATION_QUALIFIER, ORGANIZATION_NAME, APPLICATION_NAME)
    }
}

pub fn print_validation_errors(e: &validator::ValidationErrors, prefix: &str, level: usize) {
    let level = level.max(1);
    for (e_name, e) in e.errors() {
        match e {
            validator::ValidationErrorsKind::Field(e) => {
                let prefix_rep = prefix.repeat(level);
                eprintln!(
                    "{prefix_rep}{e_name}:\n{}",
                    e.iter()
                        .map(|x| format!("{} {:?}", x.code, x.params))
                        .fold(String::new(), |acc, a| format!(
                            "{acc}{prefix_rep}{prefix}- {a}\n"
                        ))
                        .trim_end()
                );
            }

            validator::ValidationErrorsKind::Struct(e) => {
                eprintln!("{}{}:", prefix, e_name);
                print_validation_errors(e, prefix, level + 1);
            }

            validator::ValidationErrorsKind::List(e) => {
                eprintln!("{}{}:", prefix, e_name);
                for e in e.values() {
                    print_validation_errors(e, prefix, level + 1);
                }
            }
        }
    }
}
