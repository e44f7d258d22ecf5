//! Spreadsheet round trips

use idrecon::workbook::{append_sheet, load_all_sheets, load_sheet, load_table, save_table};
use idrecon::{Error, Table};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn sample() -> Table {
    let mut table = Table::new(["Табельный №", "ФИО", "Ставка"]);
    table.push_row(["007", "Пётр Иванов", "1.50"]);
    table.push_row(["0012", "Анна-Мария О'Нил", ""]);
    table.push_row(["42", "李 小龍", "1e3"]);
    table
}

#[test]
fn test_round_trip_keeps_text_and_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("вывод").join("r.xlsx");

    save_table(&sample(), &path, "Лист").unwrap();
    let loaded = load_table(&path, 0).unwrap();

    assert_eq!(loaded, sample());
}

#[test]
fn test_append_sheet_keeps_existing_sheets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r.xlsx");

    let mut first = Table::new(["A"]);
    first.push_row(["1"]);
    save_table(&first, &path, "first").unwrap();
    append_sheet(&sample(), &path, "second").unwrap();

    let sheets = load_all_sheets(&path).unwrap();
    let names: Vec<&str> = sheets.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(sheets[0].1, first);
    assert_eq!(load_sheet(&path, "second").unwrap(), sample());
}

#[test]
fn test_append_sheet_creates_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new.xlsx");

    append_sheet(&sample(), &path, "only").unwrap();
    assert_eq!(load_sheet(&path, "only").unwrap(), sample());
}

#[test]
fn test_append_duplicate_sheet_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r.xlsx");

    save_table(&sample(), &path, "data").unwrap();
    assert!(append_sheet(&sample(), &path, "data").is_err());
}

#[test]
fn test_missing_sheet() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r.xlsx");

    save_table(&sample(), &path, "data").unwrap();
    let err = load_sheet(&path, "other").unwrap_err();
    assert!(matches!(err, Error::MissingSheet { ref sheet, .. } if sheet == "other"));
}

#[test]
fn test_trailing_blank_rows_are_not_kept() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r.xlsx");

    let mut table = sample();
    table.push_row(["", "", ""]);
    save_table(&table, &path, "data").unwrap();

    assert_eq!(load_table(&path, 0).unwrap(), sample());
}
