//! External service exports
//!
//! Each document-exchange or ERP service is described declaratively by a
//! [`ServiceDescriptor`]: where its exports live, which spreadsheet columns
//! hold the name, status and administrator flag, and how the status cell
//! decides whether an account is active. One generic loader and one orphan
//! detector serve every service.

use crate::discovery::{find_latest_file, Freshness};
use crate::error::{Error, Result};
use crate::normalize::fold_letters;
use crate::orphans::IdentityRecord;
use crate::table::Table;
use crate::workbook::load_table_with_header_row;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How a service's status cell maps to "account is active"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ActivityRule {
    /// Active when the status cell is blank (e.g. a blockage date)
    Blank,
    /// Active when the status cell holds anything
    Filled,
    /// Active when the trimmed status equals `value`, ignoring case
    Equals { value: String },
}

impl ActivityRule {
    pub fn is_active(&self, status: Option<&str>) -> bool {
        let status = status.map(str::trim).filter(|s| !s.is_empty());
        match self {
            ActivityRule::Blank => status.is_none(),
            ActivityRule::Filled => status.is_some(),
            ActivityRule::Equals { value } => {
                status.is_some_and(|s| s.to_lowercase() == value.trim().to_lowercase())
            }
        }
    }
}

/// Column names for the name, status and administrator fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceColumns {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub admin: Option<String>,
}

/// Declarative description of one external service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceDescriptor {
    /// Stable identifier used on the command line (e.g. `kontur`)
    pub id: String,

    /// Human-facing name used in logs and reports
    pub label: String,

    /// Directory the service's exports are dropped into
    pub dir: PathBuf,

    /// Glob matched against file names in `dir`
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// 0-based sheet row holding the column headers
    #[serde(default)]
    pub header_row: usize,

    /// Column names in the service's export
    pub columns: ServiceColumns,

    /// Column names written to the report
    pub headers: ServiceColumns,

    pub activity: ActivityRule,

    /// Status text written for active accounts (raw status when unset)
    #[serde(default)]
    pub active_label: Option<String>,

    /// Status text written for inactive accounts (raw status when unset)
    #[serde(default)]
    pub blocked_label: Option<String>,

    /// Sheet listing internal duplicates
    pub duplicates_sheet: String,

    /// Sheet listing accounts to remove
    pub remove_sheet: String,
}

pub(crate) fn default_pattern() -> String {
    "*.xlsx".to_string()
}

/// One account row from a service export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// 1-based sheet row the record was read from
    pub row: usize,
    pub full_name: Option<String>,
    pub status: Option<String>,
    pub admin: Option<String>,
}

impl IdentityRecord for ServiceRecord {
    fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }
}

/// A loaded service export
#[derive(Debug, Clone)]
pub struct ServiceExport {
    pub path: PathBuf,
    pub records: Vec<ServiceRecord>,
}

impl ServiceDescriptor {
    pub fn is_active(&self, record: &ServiceRecord) -> bool {
        self.activity.is_active(record.status.as_deref())
    }

    /// Status text shown in reports
    pub fn display_status(&self, record: &ServiceRecord) -> String {
        let label = if self.is_active(record) {
            self.active_label.as_ref()
        } else {
            self.blocked_label.as_ref()
        };
        match label {
            Some(l) => l.clone(),
            None => record.status.clone().unwrap_or_default(),
        }
    }

    /// Find and load the newest fresh export of this service.
    ///
    /// `Ok(None)` means no fresh export exists, which is an expected
    /// condition rather than a failure.
    pub fn load(&self, freshness: &Freshness) -> Result<Option<ServiceExport>> {
        let Some(path) = find_latest_file(&self.dir, &self.pattern, freshness)? else {
            info!(service = %self.label, dir = %self.dir.display(), "no fresh export found");
            return Ok(None);
        };

        info!(service = %self.label, path = %path.display(), "loading export");
        let (table, header_row) = load_table_with_header_row(&path, self.header_row)?;
        if header_row != self.header_row {
            debug!(service = %self.label, configured = self.header_row, used = header_row, "headers found below configured row");
        }
        let records = self.records_from_table(&table, header_row, &path)?;
        info!(service = %self.label, records = records.len(), "export loaded");

        Ok(Some(ServiceExport { path, records }))
    }

    /// Extract records from a loaded sheet; rows with a blank name are dropped.
    ///
    /// `header_row` is the 0-based sheet row the table's headers came from.
    pub fn records_from_table(
        &self,
        table: &Table,
        header_row: usize,
        path: &Path,
    ) -> Result<Vec<ServiceRecord>> {
        let required = |column: &str| {
            table.column_index(column).ok_or_else(|| Error::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })
        };
        let name_idx = required(&self.columns.name)?;
        let status_idx = required(&self.columns.status)?;
        let admin_idx = match &self.columns.admin {
            Some(column) => {
                let idx = table.column_index(column);
                if idx.is_none() {
                    warn!(service = %self.label, column = %column, path = %path.display(), "admin column missing");
                }
                idx
            }
            None => None,
        };

        let mut records = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let sheet_row = header_row + row + 2;
            let Some(name) = table.cell(row, name_idx) else {
                debug!(service = %self.label, row = sheet_row, "row without name skipped");
                continue;
            };
            records.push(ServiceRecord {
                row: sheet_row,
                full_name: Some(name.trim().to_string()),
                status: table.cell(row, status_idx).map(|s| s.trim().to_string()),
                admin: admin_idx
                    .and_then(|idx| table.cell(row, idx))
                    .map(|s| s.trim().to_string()),
            });
        }
        Ok(records)
    }

    fn header_names(&self) -> Vec<String> {
        let mut headers = vec![self.headers.name.clone(), self.headers.status.clone()];
        if self.columns.admin.is_some() {
            headers.push(
                self.headers
                    .admin
                    .clone()
                    .unwrap_or_else(|| format!("{}_admin", self.label)),
            );
        }
        headers
    }

    /// Render records as a report table: folded name, display status and
    /// the normalized administrator flag.
    pub fn to_table<'a, I>(&self, records: I) -> Table
    where
        I: IntoIterator<Item = &'a ServiceRecord>,
    {
        self.render(records, None)
    }

    /// Like [`to_table`](Self::to_table), with a trailing column holding the
    /// sheet row each account was read from.
    pub fn to_removal_table<'a, I>(&self, records: I, row_header: &str) -> Table
    where
        I: IntoIterator<Item = &'a ServiceRecord>,
    {
        self.render(records, Some(row_header))
    }

    fn render<'a, I>(&self, records: I, row_header: Option<&str>) -> Table
    where
        I: IntoIterator<Item = &'a ServiceRecord>,
    {
        let with_admin = self.columns.admin.is_some();
        let mut headers = self.header_names();
        headers.extend(row_header.map(str::to_string));

        let mut table = Table::new(headers);
        for record in records {
            let mut cells = vec![
                fold_letters(record.full_name.as_deref().unwrap_or_default()),
                self.display_status(record),
            ];
            if with_admin {
                cells.push(normalize_flag(record.admin.as_deref()));
            }
            if row_header.is_some() {
                cells.push(record.row.to_string());
            }
            table.push_row(cells);
        }
        table
    }
}

/// Render a yes/no flag as `да`/`нет`; anything else passes through.
pub fn normalize_flag(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "истина" | "1" | "yes" | "да" => "да".to_string(),
        "false" | "ложь" | "0" | "no" | "нет" => "нет".to_string(),
        _ => raw.to_string(),
    }
}

/// Service set used by the default configuration
pub fn default_services(input_dir: &Path) -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor {
            id: "onec".into(),
            label: "1С".into(),
            dir: input_dir.join("1С"),
            pattern: default_pattern(),
            header_row: 3,
            columns: ServiceColumns {
                name: "Полное имя".into(),
                status: "Вход в приложение разрешен".into(),
                admin: None,
            },
            headers: ServiceColumns {
                name: "1C_ФИО".into(),
                status: "1C_Активен".into(),
                admin: None,
            },
            activity: ActivityRule::Filled,
            active_label: Some("Да".into()),
            blocked_label: Some("Нет".into()),
            duplicates_sheet: "дубли в 1С".into(),
            remove_sheet: "удалить из 1С".into(),
        },
        ServiceDescriptor {
            id: "diadoc".into(),
            label: "Диадок".into(),
            dir: input_dir.join("эдо_диадок"),
            pattern: default_pattern(),
            header_row: 0,
            columns: ServiceColumns {
                name: "ФИО".into(),
                status: "Активен".into(),
                admin: Some("Администратор".into()),
            },
            headers: ServiceColumns {
                name: "Диадок_ФИО".into(),
                status: "Диадок_Активен".into(),
                admin: Some("Диадок_Администратор".into()),
            },
            activity: ActivityRule::Equals { value: "Да".into() },
            active_label: None,
            blocked_label: None,
            duplicates_sheet: "дубли в Диадоке".into(),
            remove_sheet: "удалить из Диадока".into(),
        },
        ServiceDescriptor {
            id: "kontur".into(),
            label: "Контур".into(),
            dir: input_dir.join("эдо_контур"),
            pattern: default_pattern(),
            header_row: 0,
            columns: ServiceColumns {
                name: "ФИО".into(),
                status: "Дата блокировки".into(),
                admin: Some("Администратор".into()),
            },
            headers: ServiceColumns {
                name: "Контур_ФИО".into(),
                status: "Контур_статус".into(),
                admin: Some("Контур_Администратор".into()),
            },
            activity: ActivityRule::Blank,
            active_label: Some("активна".into()),
            blocked_label: Some("заблокирована".into()),
            duplicates_sheet: "дубли в Контуре".into(),
            remove_sheet: "удалить из Контура".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kontur() -> ServiceDescriptor {
        default_services(Path::new("in"))
            .into_iter()
            .find(|s| s.id == "kontur")
            .unwrap()
    }

    #[rstest]
    #[case(ActivityRule::Blank, None, true)]
    #[case(ActivityRule::Blank, Some("  "), true)]
    #[case(ActivityRule::Blank, Some("2024-01-01"), false)]
    #[case(ActivityRule::Filled, Some("x"), true)]
    #[case(ActivityRule::Filled, None, false)]
    #[case(ActivityRule::Equals { value: "Да".into() }, Some(" да "), true)]
    #[case(ActivityRule::Equals { value: "Да".into() }, Some("Нет"), false)]
    #[case(ActivityRule::Equals { value: "Да".into() }, None, false)]
    fn test_activity_rules(
        #[case] rule: ActivityRule,
        #[case] status: Option<&str>,
        #[case] expected: bool,
    ) {
        assert_eq!(rule.is_active(status), expected);
    }

    #[rstest]
    #[case(Some("TRUE"), "да")]
    #[case(Some("Ложь"), "нет")]
    #[case(Some("0"), "нет")]
    #[case(Some("maybe"), "maybe")]
    #[case(None, "")]
    fn test_normalize_flag(#[case] raw: Option<&str>, #[case] expected: &str) {
        assert_eq!(normalize_flag(raw), expected);
    }

    #[test]
    fn test_records_from_table_skips_blank_names() {
        let mut table = Table::new(["ФИО", "Администратор", "Дата блокировки"]);
        table.push_row(["Пётр Иванов", "true", ""]);
        table.push_row(["", "false", ""]);
        table.push_row(["Анна Смирнова", "", "01.02.2024"]);

        let records = kontur()
            .records_from_table(&table, 0, Path::new("k.xlsx"))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row, 2);
        assert_eq!(records[1].row, 4);
        assert_eq!(records[1].status.as_deref(), Some("01.02.2024"));
    }

    #[test]
    fn test_record_rows_follow_header_row() {
        let mut table = Table::new(["ФИО", "Дата блокировки"]);
        table.push_row(["Пётр Иванов", ""]);
        table.push_row(["Анна Смирнова", ""]);

        let records = kontur()
            .records_from_table(&table, 3, Path::new("k.xlsx"))
            .unwrap();
        let rows: Vec<usize> = records.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![5, 6]);
    }

    #[test]
    fn test_records_from_table_requires_name_column() {
        let table = Table::new(["Имя", "Дата блокировки"]);
        let err = kontur()
            .records_from_table(&table, 0, Path::new("k.xlsx"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "ФИО"));
    }

    #[test]
    fn test_to_table_renders_labels() {
        let service = kontur();
        let records = vec![
            ServiceRecord {
                row: 2,
                full_name: Some("Пётр Иванов".into()),
                status: None,
                admin: Some("true".into()),
            },
            ServiceRecord {
                row: 3,
                full_name: Some("Анна Смирнова".into()),
                status: Some("01.02.2024".into()),
                admin: None,
            },
        ];
        let table = service.to_table(&records);
        assert_eq!(
            table.columns(),
            &["Контур_ФИО", "Контур_статус", "Контур_Администратор"]
        );
        assert_eq!(table.rows()[0], vec!["Петр Иванов", "активна", "да"]);
        assert_eq!(table.rows()[1], vec!["Анна Смирнова", "заблокирована", ""]);
    }

    #[test]
    fn test_removal_table_keeps_sheet_row() {
        let records = vec![ServiceRecord {
            row: 7,
            full_name: Some("Анна Смирнова".into()),
            status: None,
            admin: Some("0".into()),
        }];
        let table = kontur().to_removal_table(&records, "Строка");
        assert_eq!(
            table.columns(),
            &["Контур_ФИО", "Контур_статус", "Контур_Администратор", "Строка"]
        );
        assert_eq!(table.rows()[0], vec!["Анна Смирнова", "активна", "нет", "7"]);
    }
}
