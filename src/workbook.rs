//! Spreadsheet I/O
//!
//! Reading goes through calamine, writing through rust_xlsxwriter. Every
//! cell is written as text so that values such as `007` or `1.50` survive a
//! round trip unchanged.

use crate::error::{Error, Result};
use crate::table::Table;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Color, Format, Workbook};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Background fills for individual data cells, keyed by (row, column) of the
/// table being written (row 0 is the first data row, not the header).
pub type CellFills = BTreeMap<(usize, usize), Color>;

/// Load the first sheet of a workbook.
///
/// `header_row` is the 0-based sheet row that holds the column names; rows
/// above it are ignored. Blank rows inside the data are kept so that row
/// positions match the sheet.
pub fn load_table(path: &Path, header_row: usize) -> Result<Table> {
    load_table_with_header_row(path, header_row).map(|(table, _)| table)
}

/// Like [`load_table`], also returning the 0-based sheet row the headers
/// were actually read from. Leading blank rows push it below `header_row`.
pub fn load_table_with_header_row(path: &Path, header_row: usize) -> Result<(Table, usize)> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::MissingSheet {
            sheet: "<first>".to_string(),
            path: path.to_path_buf(),
        })?;
    let range = workbook.worksheet_range(&first)?;
    Ok(range_to_table(&range, header_row))
}

/// Load a named sheet, headers on the first row.
pub fn load_sheet(path: &Path, sheet: &str) -> Result<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        return Err(Error::MissingSheet {
            sheet: sheet.to_string(),
            path: path.to_path_buf(),
        });
    }
    let range = workbook.worksheet_range(sheet)?;
    Ok(range_to_table(&range, 0).0)
}

/// Load every sheet in workbook order, headers on the first row.
pub fn load_all_sheets(path: &Path) -> Result<Vec<(String, Table)>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        sheets.push((name, range_to_table(&range, 0).0));
    }
    Ok(sheets)
}

/// Write a workbook holding a single sheet.
///
/// Empty cells are left unwritten, so trailing rows that are entirely blank
/// do not survive a round trip through [`load_table`].
pub fn save_table(table: &Table, path: &Path, sheet: &str) -> Result<()> {
    let mut report = ReportWorkbook::new();
    report.add_sheet(sheet, table, &CellFills::new())?;
    report.save(path)
}

/// Add a sheet to an existing workbook, creating the file if needed.
///
/// The workbook is rewritten, so fills on the existing sheets are not kept.
/// Adding a sheet name that already exists is an error.
pub fn append_sheet(table: &Table, path: &Path, sheet: &str) -> Result<()> {
    let existing = if path.exists() {
        load_all_sheets(path)?
    } else {
        Vec::new()
    };

    if existing.iter().any(|(name, _)| name == sheet) {
        return Err(Error::Other(format!(
            "Sheet '{}' already exists in {}",
            sheet,
            path.display()
        )));
    }

    let mut report = ReportWorkbook::new();
    for (name, t) in &existing {
        report.add_sheet(name, t, &CellFills::new())?;
    }
    report.add_sheet(sheet, table, &CellFills::new())?;
    report.save(path)
}

/// Multi-sheet workbook builder for report output
pub struct ReportWorkbook {
    workbook: Workbook,
    header: Format,
    sheets: Vec<String>,
}

impl Default for ReportWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportWorkbook {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            header: Format::new().set_bold(),
            sheets: Vec::new(),
        }
    }

    /// Names of the sheets added so far
    pub fn sheet_names(&self) -> &[String] {
        &self.sheets
    }

    pub fn add_sheet(&mut self, name: &str, table: &Table, fills: &CellFills) -> Result<()> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(name)?;

        for (col, header) in table.columns().iter().enumerate() {
            worksheet.write_string_with_format(0, to_col(col)?, header, &self.header)?;
        }

        for (row_idx, row) in table.rows().iter().enumerate() {
            let sheet_row = to_row(row_idx + 1)?;
            for (col_idx, value) in row.iter().enumerate() {
                let col = to_col(col_idx)?;
                match fills.get(&(row_idx, col_idx)) {
                    Some(color) => {
                        let fill = Format::new().set_background_color(*color);
                        worksheet.write_string_with_format(sheet_row, col, value, &fill)?;
                    }
                    None if value.is_empty() => {}
                    None => {
                        worksheet.write_string(sheet_row, col, value)?;
                    }
                }
            }
        }

        worksheet.autofit();
        self.sheets.push(name.to_string());
        debug!(sheet = name, rows = table.len(), "sheet added");
        Ok(())
    }

    pub fn save(mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.workbook.save(path)?;
        Ok(())
    }
}

/// Parse an `RRGGBB` colour literal, with or without a leading `#`.
pub fn parse_color(literal: &str) -> Result<Color> {
    let hex = literal.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Config(format!("Invalid colour '{}', expected RRGGBB", literal)));
    }
    let rgb = u32::from_str_radix(hex, 16)
        .map_err(|e| Error::Config(format!("Invalid colour '{}': {}", literal, e)))?;
    Ok(Color::RGB(rgb))
}

fn to_row(idx: usize) -> Result<u32> {
    u32::try_from(idx).map_err(|_| Error::Other(format!("Row index {} out of range", idx)))
}

fn to_col(idx: usize) -> Result<u16> {
    u16::try_from(idx).map_err(|_| Error::Other(format!("Column index {} out of range", idx)))
}

fn range_to_table(range: &Range<Data>, header_row: usize) -> (Table, usize) {
    let Some((first_row, _)) = range.start() else {
        return (Table::default(), header_row);
    };

    let mut table: Option<(Table, usize)> = None;
    for (offset, cells) in range.rows().enumerate() {
        let sheet_row = first_row as usize + offset;
        if sheet_row < header_row {
            continue;
        }

        let values: Vec<String> = cells.iter().map(cell_text).collect();
        match table.as_mut() {
            None => {
                let headers = Table::new(values.iter().map(|h| h.trim().to_string()));
                table = Some((headers, sheet_row));
            }
            Some((t, _)) => t.push_row(values),
        }
    }

    table.unwrap_or_else(|| (Table::default(), header_row))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
