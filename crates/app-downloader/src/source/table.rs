use std::fmt;

/// A single spreadsheet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Blank strings and the `nan` placeholder become [`Cell::Empty`].
    #[must_use]
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(x) => Some(x),
            _ => None,
        }
    }

    /// The cell rendered as a string, `None` when empty.
    #[must_use]
    pub fn to_display(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            x => Some(x.to_string()),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Self::Empty
        } else {
            Self::Number(value)
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl fmt::Display for Cell {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(x) => f.write_str(x),
            // Spreadsheets store ids as floats, `1234.0` should read as `1234`.
            Self::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Self::Number(x) => write!(f, "{x}"),
        }
    }
}

/// Tabular input: named groups (sheets) of rows under a header.
pub trait Table {
    /// Group names in their natural order.
    fn group_names(&self) -> Vec<String>;

    fn columns(&self, group: &str) -> Option<&[String]>;

    /// Rows below the header. A row may be shorter than the header.
    fn rows(&self, group: &str) -> Option<&[Vec<Cell>]>;

    /// Row number a user sees for `rows(group)[index]`, the header being
    /// row 1.
    fn row_number(&self, _group: &str, index: usize) -> usize {
        index + 2
    }
}
