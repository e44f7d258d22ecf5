//! In-memory columnar tables
//!
//! A [`Table`] is the shape every spreadsheet is read into and every report
//! sheet is built from: named columns over rows of text cells. Blank cells
//! are stored as empty strings and read back as `None`.

use serde::{Deserialize, Serialize};

/// A table of text cells with named columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding or truncating it to the column count.
    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Index of the first column with this header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell text, `None` when blank or out of range
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// All cells of a named column, `None` for blanks
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>> + '_> {
        let idx = self.column_index(name)?;
        Some((0..self.rows.len()).map(move |row| self.cell(row, idx)))
    }

    /// Place tables next to each other, aligning rows by position.
    ///
    /// Shorter tables are padded with blank cells. No relationship between
    /// rows of different parts is implied.
    pub fn side_by_side(parts: &[Table]) -> Table {
        let columns: Vec<String> = parts.iter().flat_map(|t| t.columns.clone()).collect();
        let height = parts.iter().map(Table::len).max().unwrap_or(0);

        let mut combined = Table::new(columns);
        for row in 0..height {
            let mut cells = Vec::with_capacity(combined.columns.len());
            for part in parts {
                match part.rows.get(row) {
                    Some(r) => cells.extend(r.iter().cloned()),
                    None => cells.extend(std::iter::repeat_n(String::new(), part.columns.len())),
                }
            }
            combined.push_row(cells);
        }
        combined
    }
}
