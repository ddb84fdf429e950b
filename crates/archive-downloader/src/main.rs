use std::path::Path;

use app_config::{input::InputConfig, Config};
use app_downloader::{
    manifest::{failure_records, write_failure_manifest, FailureRecord},
    CsvTable, DownloadTask, Engine, EventSink, RunEvent, RunSummary, SourceError, Table,
    TableSelection, TaskSource,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

const EXIT_OK: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    app_logger::init();

    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            app_logger::error!("{e:#}");
            EXIT_FAILED
        }
    };

    std::process::exit(code);
}

async fn run() -> anyhow::Result<i32> {
    let config = Config::load()?;

    app_logger::debug!(config = ?config, "Running with config");

    let Some(tasks) = read_tasks(&config.input)? else {
        return Ok(EXIT_OK);
    };

    if tasks.is_empty() {
        app_logger::warn!("Nothing to download");
        return Ok(EXIT_OK);
    }

    app_logger::info!("Archiving into {:?}", config.input.output_directory);

    let (events, rx) = EventSink::channel();
    let token = CancellationToken::new();
    let engine = Engine::with_parts(
        &config.download,
        &config.input.output_directory,
        config.dependency_paths.ffprobe_path().map(Path::to_path_buf),
        token.clone(),
        events,
    )?;

    let watcher = tokio::spawn(watch_events(rx));
    let interrupt = tokio::spawn(stop_on_ctrl_c(token));

    let summary = engine.run(tasks).await?;

    interrupt.abort();
    drop(engine);
    let _ = watcher.await;

    print_summary(&summary);

    if let Some(path) = &config.input.failure_manifest {
        let written = write_failure_manifest(path, &summary)?;
        app_logger::info!("Wrote {written} failed downloads to {path:?}");
    }

    Ok(exit_code(&summary))
}

/// `None` when there is nothing to download because only keys were listed.
fn read_tasks(input: &InputConfig) -> anyhow::Result<Option<Vec<DownloadTask>>> {
    if let Some(url) = &input.source.url {
        return Ok(Some(TaskSource::single(url, input.name.as_deref())));
    }

    let Some(table_path) = &input.source.table else {
        anyhow::bail!("Either a URL or a table is required");
    };

    let table = CsvTable::from_path(table_path)?;
    let selection = selection_for(&table, input)?;
    app_logger::debug!(?selection, "Using columns");

    if input.list_keys {
        for key in TaskSource::distinct_keys(&table, &selection)? {
            println!("{key}");
        }

        return Ok(None);
    }

    let tasks = TaskSource::from_table(&table, &selection)?;
    app_logger::info!("Found {} links in {:?}", tasks.len(), table_path);

    Ok(Some(tasks))
}

/// Explicit column names win over the ones guessed from the header.
fn selection_for(table: &CsvTable, input: &InputConfig) -> Result<TableSelection, SourceError> {
    let guessed = table
        .columns(table.name())
        .and_then(TableSelection::guess)
        .unwrap_or_default();

    let url_column = input
        .url_column
        .clone()
        .or_else(|| Some(guessed.url_column.clone()).filter(|x| !x.is_empty()))
        .ok_or(SourceError::NoUrlColumn)?;

    Ok(TableSelection {
        url_column,
        name_column: input.name_column.clone().or(guessed.name_column),
        key_column: input.key_column.clone().or(guessed.key_column),
        ..Default::default()
    }
    .with_groups(input.sheets.clone())
    .with_keys(input.keys.clone()))
}

async fn watch_events(mut rx: UnboundedReceiver<RunEvent>) {
    let mut last_logged = 0;

    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Started { total } => {
                app_logger::info!("Downloading {total} files");
            }
            RunEvent::Transfer {
                task_id,
                name,
                received,
                total,
            } => {
                app_logger::trace!(task_id, name = %name, received, ?total, "Transfer progress");
            }
            RunEvent::Progress(p) => {
                if p.percent / 10 > last_logged / 10 || p.completed == p.total {
                    app_logger::info!("Progress: {}/{} ({}%)", p.completed, p.total, p.percent);
                    last_logged = p.percent;
                }
            }
            RunEvent::Finished(_) | RunEvent::Completed(_) => (),
        }
    }
}

async fn stop_on_ctrl_c(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }

    app_logger::warn!("Stopping after the current chunks, press Ctrl-C again to quit immediately");
    token.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(EXIT_INTERRUPTED);
    }
}

fn print_summary(summary: &RunSummary) {
    app_logger::info!(
        "Download completed: {} downloaded, {} skipped, {} failed, {} cancelled of {} total",
        summary.succeeded,
        summary.skipped,
        summary.failed(),
        summary.cancelled,
        summary.total,
    );

    let records = failure_records(summary);
    if records.is_empty() {
        return;
    }

    app_logger::error!("Failed to download {} files:", records.len());
    for line in failure_table(&records) {
        eprintln!("{line}");
    }
}

fn failure_table(records: &[FailureRecord]) -> Vec<String> {
    let rows = records
        .iter()
        .map(|x| {
            [
                x.row.map(|r| r.to_string()).unwrap_or_default(),
                x.group.clone().unwrap_or_default(),
                x.identifier.clone().unwrap_or_default(),
                x.display_name.clone(),
                x.reason.clone(),
            ]
        })
        .collect::<Vec<_>>();

    let header = ["Row", "Sheet", "Key", "File name", "Reason"].map(ToString::to_string);
    let widths = std::iter::once(&header)
        .chain(&rows)
        .fold([0_usize; 5], |mut acc, row| {
            for (w, cell) in acc.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
            acc
        });

    std::iter::once(&header)
        .chain(&rows)
        .map(|row| {
            row.iter()
                .zip(widths)
                .map(|(cell, w)| format!("{cell:<w$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}

fn exit_code(summary: &RunSummary) -> i32 {
    if summary.was_cancelled {
        EXIT_INTERRUPTED
    } else if summary.failed() > 0 {
        EXIT_FAILED
    } else {
        EXIT_OK
    }
}
