//! Turns a single URL or a table into an ordered list of [`DownloadTask`]s.

mod csv_table;
mod table;

use std::{
    collections::{BTreeSet, HashSet},
    path::PathBuf,
};

pub use csv_table::CsvTable;
pub use table::{Cell, Table};
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use crate::task::{has_http_prefix, DownloadTask, Origin};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read table {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Sheet {0:?} not found in table")]
    UnknownGroup(String),

    #[error("Column {column:?} not found in sheet {group:?}")]
    UnknownColumn { group: String, column: String },

    #[error("Could not guess which column holds the links, pass it explicitly")]
    NoUrlColumn,
}

/// Which parts of a table become tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSelection {
    pub url_column: String,
    pub name_column: Option<String>,
    pub key_column: Option<String>,
    /// Groups to read. Empty means all of them.
    pub groups: Vec<String>,
    /// Keys to keep. Empty means all rows.
    pub keys: HashSet<String>,
}

impl TableSelection {
    /// Guess the columns from header names.
    ///
    /// Returns `None` when no header mentions a url or link.
    #[must_use]
    pub fn guess(columns: &[String]) -> Option<Self> {
        let find = |needles: &[&str]| {
            columns
                .iter()
                .find(|x| {
                    let lower = x.to_lowercase();
                    needles.iter().any(|n| lower.contains(n))
                })
                .cloned()
        };

        let url_column = find(&["url", "link"])?;
        let name_column = find(&["name"]).filter(|x| *x != url_column);
        let key_column = find(&["hook"])
            .or_else(|| find(&["key"]))
            .filter(|x| *x != url_column && Some(x) != name_column.as_ref());

        Some(Self {
            url_column,
            name_column,
            key_column,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub fn with_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.keys = keys
            .into_iter()
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .collect();
        self
    }
}

pub struct TaskSource;

impl TaskSource {
    /// A one-element list for a single URL.
    ///
    /// Without a name, the last path segment of the URL is used.
    #[must_use]
    pub fn single(url: &str, name: Option<&str>) -> Vec<DownloadTask> {
        let name = name.map_or_else(|| name_from_url(url), ToString::to_string);

        vec![DownloadTask::new(0, url, &name)]
    }

    /// Read tasks from the selected groups of `table`, in table order.
    ///
    /// Rows whose url cell does not look like a web link are skipped, as are
    /// rows filtered out by [`TableSelection::keys`].
    pub fn from_table(
        table: &dyn Table,
        selection: &TableSelection,
    ) -> Result<Vec<DownloadTask>, SourceError> {
        let mut tasks = vec![];

        for group in selected_groups(table, selection)? {
            let columns = SelectedColumns::find(table, &group, selection)?;
            let rows = table.rows(&group).unwrap_or_default();
            let mut skipped = 0_usize;

            for (index, row) in rows.iter().enumerate() {
                let row_number = table.row_number(&group, index);
                let url = match row.get(columns.url).and_then(Cell::as_text) {
                    Some(x) if has_http_prefix(x) => x,
                    _ => {
                        skipped += 1;
                        continue;
                    }
                };

                let key = columns.key.and_then(|i| row.get(i)).and_then(Cell::to_display);
                if !selection.keys.is_empty()
                    && !key.as_ref().is_some_and(|x| selection.keys.contains(x))
                {
                    trace!(row = row_number, ?key, "Row filtered out by key");
                    continue;
                }

                let name = columns
                    .name
                    .and_then(|i| row.get(i))
                    .and_then(Cell::to_display)
                    .unwrap_or_default();

                let task = DownloadTask::new(tasks.len(), url, &name)
                    .with_classification_key(key)
                    .with_origin(Origin {
                        row: row_number,
                        group: group.clone(),
                    });

                tasks.push(task);
            }

            debug!(?group, rows = rows.len(), skipped, "Read sheet");
        }

        Ok(tasks)
    }

    /// Sorted distinct non-empty values of the key column.
    pub fn distinct_keys(
        table: &dyn Table,
        selection: &TableSelection,
    ) -> Result<Vec<String>, SourceError> {
        let mut keys = BTreeSet::new();

        for group in selected_groups(table, selection)? {
            let Some(key_idx) = SelectedColumns::find(table, &group, selection)?.key else {
                continue;
            };

            keys.extend(
                table
                    .rows(&group)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|row| row.get(key_idx))
                    .filter_map(Cell::to_display),
            );
        }

        Ok(keys.into_iter().collect())
    }
}

struct SelectedColumns {
    url: usize,
    name: Option<usize>,
    key: Option<usize>,
}

impl SelectedColumns {
    fn find(table: &dyn Table, group: &str, selection: &TableSelection) -> Result<Self, SourceError> {
        let columns = table
            .columns(group)
            .ok_or_else(|| SourceError::UnknownGroup(group.to_string()))?;

        let index_of = |column: &str| {
            columns
                .iter()
                .position(|x| x == column)
                .ok_or_else(|| SourceError::UnknownColumn {
                    group: group.to_string(),
                    column: column.to_string(),
                })
        };

        Ok(Self {
            url: index_of(&selection.url_column)?,
            name: selection.name_column.as_deref().map(index_of).transpose()?,
            key: selection.key_column.as_deref().map(index_of).transpose()?,
        })
    }
}

fn selected_groups(table: &dyn Table, selection: &TableSelection) -> Result<Vec<String>, SourceError> {
    let available = table.group_names();

    if selection.groups.is_empty() {
        return Ok(available);
    }

    if let Some(missing) = selection.groups.iter().find(|x| !available.contains(x)) {
        return Err(SourceError::UnknownGroup(missing.clone()));
    }

    Ok(available
        .into_iter()
        .filter(|x| selection.groups.contains(x))
        .collect())
}

fn name_from_url(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|x| {
            let last = x.path_segments()?.filter(|s| !s.is_empty()).last()?.to_string();
            Some(match last.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem.to_string(),
                _ => last,
            })
        })
        .unwrap_or_default()
}
