use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};

use crate::{common, download, input};

/// Download media in bulk from a link or a table of links,
/// and archive every file into a directory chosen by its classification.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[clap(name = crate::APPLICATION_NAME, disable_help_flag = true)]
pub struct CliArgs {
    /// Print help
    #[clap(action = ArgAction::Help, long)]
    help: Option<bool>,

    #[command(flatten)]
    pub input: input::InputConfig,

    #[command(flatten)]
    pub download: download::DownloadConfig,

    #[command(flatten)]
    pub dependency_path: common::ProgramPathConfig,

    #[command(flatten)]
    pub run: common::RunConfig,
}
