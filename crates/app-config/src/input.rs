use std::path::PathBuf;

use clap::{Args, ValueHint};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validators::{
    directory::{validate_is_writable_directory, value_parser_ensure_directory},
    file::{validate_is_file, validate_manifest_path, value_parser_parse_valid_file},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Args, Validate)]
#[clap(next_help_heading = "Input options")]
pub struct InputConfig {
    #[clap(flatten)]
    #[validate(nested)]
    pub source: SourceGroup,

    /// File name to use for the single `--url` download
    #[clap(long, requires = "url")]
    pub name: Option<String>,

    /// Column holding the download links.
    ///
    /// Guessed from the header row when not given.
    #[clap(long, requires = "table")]
    pub url_column: Option<String>,

    /// Column holding the file names.
    ///
    /// Guessed from the header row when not given.
    #[clap(long, requires = "table")]
    pub name_column: Option<String>,

    /// Column holding the classification key used for sub-directories.
    ///
    /// Guessed from the header row when not given.
    #[clap(long, requires = "table")]
    pub key_column: Option<String>,

    /// Only read these sheets. Can be repeated.
    #[clap(long = "sheet", requires = "table")]
    pub sheets: Vec<String>,

    /// Only download rows whose key is one of these. Can be repeated.
    #[clap(long = "key", requires = "table")]
    pub keys: Vec<String>,

    /// Print the distinct keys found in the table and exit
    #[clap(long, requires = "table")]
    #[serde(skip)]
    pub list_keys: bool,

    /// Directory to archive files into
    ///
    /// Will be created if it doesn't exist.
    #[clap(short = 'd', long, default_value = ".", value_hint = ValueHint::DirPath, value_parser = value_parser_ensure_directory())]
    #[validate(custom(function = "validate_is_writable_directory"))]
    pub output_directory: PathBuf,

    /// Write the list of failed downloads to this file (.csv or .json)
    #[clap(long, value_hint = ValueHint::FilePath)]
    #[validate(custom(function = "validate_manifest_path"))]
    pub failure_manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args, Serialize, Deserialize, Validate)]
#[group(required = true, multiple = false)]
pub struct SourceGroup {
    /// A single URL to download
    #[clap(short = 'u', long)]
    pub url: Option<String>,

    /// A CSV table with one download per row
    #[clap(short = 't', long, value_hint = ValueHint::FilePath, value_parser = value_parser_parse_valid_file())]
    #[validate(custom(function = "validate_is_file"))]
    pub table: Option<PathBuf>,
}
