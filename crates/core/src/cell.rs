use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One spreadsheet cell as handed over by the reader collaborator.
///
/// Deserializes untagged from JSON: `null` is `Empty`, numbers are `Number`,
/// ISO-8601 datetime strings are `Date`, and any other string is `Text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

/// A sheet: ordered rows of ordered cells. Rows may be ragged.
pub type Grid = Vec<Vec<Cell>>;

impl Cell {
    pub fn text_value(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    /// True for `Empty` and for text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Date(_) => false,
        }
    }

    /// Trimmed display text of the cell.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text_value(s)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::text_value(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(d: NaiveDateTime) -> Self {
        Cell::Date(d)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Looks up `row[col]`, treating out-of-range columns as empty.
pub fn cell_at(row: &[Cell], col: Option<usize>) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    col.and_then(|c| row.get(c)).unwrap_or(&EMPTY)
}
