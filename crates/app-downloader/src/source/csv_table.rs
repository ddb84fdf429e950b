use std::{io, path::Path};

use super::{
    table::{Cell, Table},
    SourceError,
};

/// A CSV file read as a table with a single group named after the file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    /// Line in the file each row starts on.
    lines: Vec<usize>,
}

impl CsvTable {
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let name = path
            .file_stem()
            .map_or_else(|| "table".to_string(), |x| x.to_string_lossy().to_string());

        let file = std::fs::File::open(path).map_err(|e| SourceError::Read {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        Self::from_reader(name, file).map_err(|e| SourceError::Read {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn from_reader<T, R>(name: T, mut reader: R) -> Result<Self, csv::Error>
    where
        T: Into<String>,
        R: io::Read,
    {
        let mut raw = vec![];
        reader.read_to_end(&mut raw)?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(raw.as_slice());

        let columns = reader
            .headers()?
            .iter()
            .map(|x| x.trim_start_matches('\u{feff}').to_string())
            .collect::<Vec<_>>();

        let mut rows = vec![];
        let mut lines = vec![];
        let mut record = csv::StringRecord::new();
        while reader.read_record(&mut record)? {
            lines.push(start_line(&raw, reader.position(), &record));
            rows.push(record.iter().map(Cell::text).collect::<Vec<_>>());
        }

        Ok(Self {
            name: name.into(),
            columns,
            rows,
            lines,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Table for CsvTable {
    fn group_names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn columns(&self, group: &str) -> Option<&[String]> {
        (group == self.name).then_some(self.columns.as_slice())
    }

    fn rows(&self, group: &str) -> Option<&[Vec<Cell>]> {
        (group == self.name).then_some(self.rows.as_slice())
    }

    fn row_number(&self, _group: &str, index: usize) -> usize {
        self.lines.get(index).copied().unwrap_or(index + 2)
    }
}

/// Line `record` starts on, counted back from where the reader stopped.
///
/// The reader's own record position is taken before skipping blank lines,
/// so it can point above the record.
fn start_line(raw: &[u8], end: &csv::Position, record: &csv::StringRecord) -> usize {
    let end_byte = usize::try_from(end.byte()).unwrap_or(raw.len());
    let ended_with_newline = end_byte
        .checked_sub(1)
        .and_then(|i| raw.get(i))
        .is_some_and(|x| *x == b'\n');
    let inner_newlines = record.iter().map(|x| x.matches('\n').count()).sum::<usize>();

    usize::try_from(end.line())
        .unwrap_or(usize::MAX)
        .saturating_sub(usize::from(ended_with_newline))
        .saturating_sub(inner_newlines)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reads_header_and_rows() {
        let raw = "\u{feff}Link,File name,Hook\n\
                   https://example.com/a.png,first,promo\n\
                   https://example.com/b.png,,\n\
                   short\n";

        let table = CsvTable::from_reader("campaign", raw.as_bytes()).expect("valid csv");

        assert_eq!(table.group_names(), vec!["campaign".to_string()]);
        assert_eq!(
            table.columns("campaign"),
            Some(&["Link".to_string(), "File name".to_string(), "Hook".to_string()][..])
        );

        let rows = table.rows("campaign").expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][2], Cell::Text("promo".to_string()));
        assert_eq!(rows[1][1], Cell::Empty);
        assert_eq!(rows[2].len(), 1);

        assert!(table.rows("other").is_none());
    }

    #[test]
    fn row_numbers_follow_file_lines() {
        let raw = "url,name\n\
                   https://example.com/1.png,one\n\
                   \n\
                   https://example.com/2.png,two\n\
                   https://example.com/3.png,\"three\nlines\nlong\"\n\
                   https://example.com/4.png,four";

        let table = CsvTable::from_reader("sheet", raw.as_bytes()).expect("valid csv");

        let rows = table.rows("sheet").expect("rows");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2][1], Cell::Text("three\nlines\nlong".to_string()));
        assert_eq!(
            (0..rows.len())
                .map(|i| table.row_number("sheet", i))
                .collect::<Vec<_>>(),
            vec![2, 4, 5, 8]
        );
    }

    #[test]
    fn crlf_row_numbers() {
        let raw = "url\r\nhttps://example.com/1.png\r\n\r\nhttps://example.com/2.png\r\n";

        let table = CsvTable::from_reader("sheet", raw.as_bytes()).expect("valid csv");

        assert_eq!(table.row_number("sheet", 0), 2);
        assert_eq!(table.row_number("sheet", 1), 4);
    }

    #[test]
    fn group_is_named_after_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("spring_campaign.csv");
        std::fs::write(&path, "url\nhttps://example.com\n").expect("write");

        let table = CsvTable::from_path(&path).expect("read");

        assert_eq!(table.name(), "spring_campaign");
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");

        let err = CsvTable::from_path(&dir.path().join("nope.csv")).expect_err("missing");

        assert!(matches!(err, SourceError::Read { .. }));
    }
}
