use std::env;

use tracing::Level;
pub use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "ARCHIVE_DOWNLOADER_LOG_LEVEL";

pub const COMPONENT_LEVELS: &[(&str, Level)] = &[
    ("archive_downloader", Level::INFO),
    ("app_config", Level::INFO),
    ("app_downloader", Level::INFO),
    ("app_helpers", Level::INFO),
    ("app_logger", Level::INFO),
];

/// Initialize the logger with the default component levels.
///
/// Extra directives can be supplied through `ARCHIVE_DOWNLOADER_LOG_LEVEL`,
/// e.g. `app_downloader=trace,reqwest=debug`.
pub fn init() {
    init_with(COMPONENT_LEVELS.to_vec());
}

pub fn init_with<T>(levels: T)
where
    T: IntoIterator<Item = (&'static str, Level)>,
{
    let mut filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .parse_lossy(default_directives(levels));

    for d in env_directives(&env::var(LOG_LEVEL_ENV).unwrap_or_default()) {
        filter = filter.add_directive(d);
    }

    // A subscriber may already be installed (tests, embedding apps).
    if let Err(e) = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
    {
        eprintln!("Logger was not initialized: {e}");
    }
}

fn default_directives<T>(levels: T) -> String
where
    T: IntoIterator<Item = (&'static str, Level)>,
{
    levels
        .into_iter()
        .map(|(k, v)| {
            if k.is_empty() {
                v.to_string()
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn env_directives(raw: &str) -> Vec<Directive> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(d) => Some(d),
            Err(e) => {
                eprintln!("Failed to parse log level directive {s:?}: {e:?}");
                None
            }
        })
        .collect()
}
