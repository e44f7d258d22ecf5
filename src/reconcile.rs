//! Reconciliation run
//!
//! A run refreshes the directory listings (unless told to reuse them), loads
//! the roster and every selected service export, compares each service
//! against the directory, and writes one report workbook. Missing or stale
//! inputs never abort a run: the affected source contributes nothing and the
//! summary says so.

use crate::compare::{cross_source_matches, internal_duplicates, IdentitySet};
use crate::config::Config;
use crate::directory::{export_directory, DirectoryExporter, DirectorySnapshot, ListedIdentity};
use crate::discovery::{find_latest_file, Freshness};
use crate::error::{Error, Result};
use crate::normalize::{fold_letters, normalize};
use crate::orphans::find_orphans;
use crate::report::{DirectoryOutcome, ReconciliationReport, RosterOutcome, ServiceOutcome};
use crate::roster::{find_missing_from_roster, RosterGap};
use crate::service::{ServiceDescriptor, ServiceRecord};
use crate::table::Table;
use crate::workbook::{load_table, parse_color, CellFills, ReportWorkbook};
use chrono::{DateTime, Local};
use rust_xlsxwriter::Color;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Directory categories included in cross-source matching and the combined sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySelection {
    pub employees: bool,
    pub contractors: bool,
}

impl Default for CategorySelection {
    fn default() -> Self {
        Self::all()
    }
}

impl CategorySelection {
    pub fn all() -> Self {
        Self {
            employees: true,
            contractors: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.employees && !self.contractors
    }

    /// Keys of the selected categories
    pub fn keys(&self, snapshot: &DirectorySnapshot) -> IdentitySet {
        let mut keys = IdentitySet::new();
        if self.employees {
            keys.extend(snapshot.employee_keys());
        }
        if self.contractors {
            keys.extend(snapshot.contractor_keys());
        }
        keys
    }
}

/// What a run should do
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Service ids to process; empty means every configured service
    pub services: Vec<String>,
    pub categories: CategorySelection,
    /// Reuse the existing listing files instead of running the export
    pub skip_export: bool,
    /// Report path; defaults to a timestamped file in the output directory
    pub output: Option<PathBuf>,
}

/// Comparison results for one service
#[derive(Debug, Clone, Default)]
pub struct ServiceResult<'a> {
    /// Keys appearing on two or more rows of the export
    pub internal_duplicates: IdentitySet,
    /// Keys also present in the selected directory categories
    pub cross_source_matches: IdentitySet,
    /// Active accounts with no directory identity, in export order
    pub orphans: Vec<&'a ServiceRecord>,
}

impl ServiceResult<'_> {
    fn orphan_rows(&self) -> BTreeSet<usize> {
        self.orphans.iter().map(|r| r.row).collect()
    }
}

/// Compare one service's records against the directory.
///
/// `selected` feeds the informational cross-source matches; `valid` decides
/// which accounts are orphans and is always every directory identity.
pub fn analyze_service<'a>(
    service: &ServiceDescriptor,
    records: &'a [ServiceRecord],
    selected: &IdentitySet,
    valid: &IdentitySet,
) -> ServiceResult<'a> {
    let names = records.iter().map(|r| r.full_name.as_deref());
    let keys = IdentitySet::from_names(names.clone());

    ServiceResult {
        internal_duplicates: internal_duplicates(names),
        cross_source_matches: cross_source_matches(selected, &keys),
        orphans: find_orphans(records, valid, |record| service.is_active(record)),
    }
}

struct LoadedService<'c> {
    descriptor: &'c ServiceDescriptor,
    records: Vec<ServiceRecord>,
    outcome: ServiceOutcome,
}

struct LoadedRoster {
    path: PathBuf,
    names: Vec<String>,
}

struct Fills {
    duplicate: Color,
    orphan: Color,
}

/// Drives a reconciliation run over one configuration
pub struct Reconciler<'c> {
    config: &'c Config,
    exporter: DirectoryExporter,
    freshness: Freshness,
}

impl<'c> Reconciler<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self {
            config,
            exporter: DirectoryExporter::from_config(config),
            freshness: Freshness::days(config.freshness.max_file_age_days),
        }
    }

    /// Use a different export program
    pub fn with_exporter(mut self, exporter: DirectoryExporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// Evaluate freshness and name the report as of `now`
    pub fn with_clock(mut self, now: DateTime<Local>) -> Self {
        self.freshness.now = now;
        self
    }

    /// Services named by `ids`, in configuration order; empty selects all.
    pub fn select_services(&self, ids: &[String]) -> Result<Vec<&'c ServiceDescriptor>> {
        if let Some(unknown) = ids.iter().find(|id| self.config.service(id).is_none()) {
            return Err(Error::Config(format!("Unknown service '{}'", unknown)));
        }
        Ok(self
            .config
            .services
            .iter()
            .filter(|s| ids.is_empty() || ids.contains(&s.id))
            .collect())
    }

    pub fn run(&self, options: &RunOptions) -> Result<ReconciliationReport> {
        let services = self.select_services(&options.services)?;
        let fills = Fills {
            duplicate: parse_color(&self.config.output.duplicate_color)?,
            orphan: parse_color(&self.config.output.orphan_color)?,
        };
        let output = options
            .output
            .clone()
            .unwrap_or_else(|| self.config.report_path(self.freshness.now));

        let mut directory = DirectoryOutcome::default();
        if options.skip_export {
            info!("directory export skipped, reading existing listings");
        } else {
            match export_directory(self.config, &self.exporter) {
                Ok(summary) => directory.export = Some(summary),
                Err(e) => {
                    error!(error = %e, "directory export failed, continuing without directory data");
                    directory.export_error = Some(e.to_string());
                }
            }
        }

        let snapshot = match DirectorySnapshot::load(&self.config.directory) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "cannot read directory listings");
                DirectorySnapshot::default()
            }
        };
        directory.employees = snapshot.employees.len();
        directory.contractors = snapshot.contractors.len();
        if snapshot.is_empty() {
            warn!("directory is empty, every active service account will be flagged for removal");
        }

        let valid = snapshot.valid_keys();
        let selected = options.categories.keys(&snapshot);

        let roster = self.load_roster();
        let gaps = roster.as_ref().map(|r| {
            let keys = IdentitySet::from_names(r.names.iter().map(|n| Some(n.as_str())));
            find_missing_from_roster(snapshot.employees.iter().map(|e| e.name.as_str()), &keys)
        });

        let loaded: Vec<LoadedService<'c>> =
            services.into_iter().map(|s| self.load_service(s)).collect();
        let results: Vec<ServiceResult<'_>> = loaded
            .iter()
            .map(|l| analyze_service(l.descriptor, &l.records, &selected, &valid))
            .collect();

        let mut workbook = ReportWorkbook::new();
        let (combined, combined_fills) = self.combined_sheet(
            roster.as_ref(),
            &snapshot,
            options.categories,
            &loaded,
            &results,
            &fills,
        );
        workbook.add_sheet(&self.config.output.combined_sheet, &combined, &combined_fills)?;

        if let Some(gaps) = &gaps {
            workbook.add_sheet(
                &self.config.output.roster_sheet,
                &self.gap_table(gaps),
                &CellFills::new(),
            )?;
        }

        for (service, result) in loaded.iter().zip(&results) {
            let duplicates = duplicate_records(&service.records, &result.internal_duplicates);
            if !duplicates.is_empty() {
                workbook.add_sheet(
                    &service.descriptor.duplicates_sheet,
                    &service.descriptor.to_table(duplicates),
                    &CellFills::new(),
                )?;
            }
            if !result.orphans.is_empty() {
                workbook.add_sheet(
                    &service.descriptor.remove_sheet,
                    &service.descriptor.to_removal_table(
                        result.orphans.iter().copied(),
                        &self.config.output.headers.source_row,
                    ),
                    &CellFills::new(),
                )?;
            }
        }

        let sheets = workbook.sheet_names().to_vec();
        workbook.save(&output)?;
        info!(path = %output.display(), sheets = sheets.len(), "report written");

        let outcomes = loaded
            .iter()
            .zip(&results)
            .map(|(service, result)| {
                let mut outcome = service.outcome.clone();
                outcome.internal_duplicates = key_strings(&result.internal_duplicates);
                outcome.cross_source_matches = key_strings(&result.cross_source_matches);
                outcome.orphans = result.orphans.len();
                outcome
            })
            .collect();

        Ok(ReconciliationReport {
            output,
            sheets,
            directory,
            roster: roster.zip(gaps).map(|(r, g)| RosterOutcome {
                path: r.path,
                names: r.names.len(),
                gaps: g.len(),
            }),
            services: outcomes,
        })
    }

    fn load_roster(&self) -> Option<LoadedRoster> {
        let roster = &self.config.roster;
        let path = match find_latest_file(&roster.dir, &roster.pattern, &self.freshness) {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(dir = %roster.dir.display(), "no fresh roster found, gap check skipped");
                return None;
            }
            Err(e) => {
                error!(dir = %roster.dir.display(), error = %e, "roster lookup failed");
                return None;
            }
        };

        let table = match load_table(&path, roster.header_row) {
            Ok(table) => table,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot read roster");
                return None;
            }
        };
        let Some(column) = table.column(&roster.name_column) else {
            error!(path = %path.display(), column = %roster.name_column, "roster name column missing");
            return None;
        };

        let names: Vec<String> = column.flatten().map(|n| n.trim().to_string()).collect();
        info!(path = %path.display(), names = names.len(), "roster loaded");
        Some(LoadedRoster { path, names })
    }

    fn load_service(&self, descriptor: &'c ServiceDescriptor) -> LoadedService<'c> {
        let mut outcome = ServiceOutcome {
            id: descriptor.id.clone(),
            label: descriptor.label.clone(),
            ..Default::default()
        };

        let records = match descriptor.load(&self.freshness) {
            Ok(Some(export)) => {
                outcome.source = Some(export.path);
                export.records
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!(service = %descriptor.label, error = %e, "cannot read export, service skipped");
                outcome.error = Some(e.to_string());
                Vec::new()
            }
        };
        outcome.records = records.len();

        LoadedService {
            descriptor,
            records,
            outcome,
        }
    }

    fn combined_sheet(
        &self,
        roster: Option<&LoadedRoster>,
        snapshot: &DirectorySnapshot,
        categories: CategorySelection,
        services: &[LoadedService<'_>],
        results: &[ServiceResult<'_>],
        fills: &Fills,
    ) -> (Table, CellFills) {
        let headers = &self.config.output.headers;

        let mut roster_part = Table::new([headers.roster_name.clone()]);
        for name in roster.map(|r| r.names.as_slice()).unwrap_or_default() {
            roster_part.push_row([fold_letters(name)]);
        }
        let mut parts = vec![roster_part];

        if categories.employees {
            parts.push(listing_table(
                &snapshot.employees,
                &headers.employees,
                &headers.employees_status,
            ));
        }
        if categories.contractors {
            parts.push(listing_table(
                &snapshot.contractors,
                &headers.contractors,
                &headers.contractors_status,
            ));
        }

        let mut cell_fills = CellFills::new();
        for (service, result) in services.iter().zip(results) {
            let offset: usize = parts.iter().map(|p| p.columns().len()).sum();
            let orphan_rows = result.orphan_rows();
            for (row, record) in service.records.iter().enumerate() {
                if orphan_rows.contains(&record.row) {
                    cell_fills.insert((row, offset), fills.orphan);
                } else if result
                    .internal_duplicates
                    .contains(&normalize(record.full_name.as_deref()))
                {
                    cell_fills.insert((row, offset), fills.duplicate);
                }
            }
            parts.push(service.descriptor.to_table(&service.records));
        }

        (Table::side_by_side(&parts), cell_fills)
    }

    fn gap_table(&self, gaps: &[RosterGap]) -> Table {
        let headers = &self.config.output.headers;
        let mut table = Table::new([headers.gap_name.clone(), headers.gap_reason.clone()]);
        for gap in gaps {
            table.push_row([gap.original_name.clone(), gap.reason.clone()]);
        }
        table
    }
}

fn listing_table(entries: &[ListedIdentity], name_header: &str, status_header: &str) -> Table {
    let mut table = Table::new([name_header, status_header]);
    for entry in entries {
        table.push_row([fold_letters(&entry.name), entry.status.label().to_string()]);
    }
    table
}

/// Records whose key is duplicated, grouped by key and otherwise in export order
fn duplicate_records<'a>(records: &'a [ServiceRecord], duplicates: &IdentitySet) -> Vec<&'a ServiceRecord> {
    let mut rows: Vec<_> = records
        .iter()
        .map(|r| (normalize(r.full_name.as_deref()), r))
        .filter(|(key, _)| duplicates.contains(key))
        .collect();
    rows.sort_by(|(a, _), (b, _)| a.cmp(b));
    rows.into_iter().map(|(_, r)| r).collect()
}

fn key_strings(keys: &IdentitySet) -> Vec<String> {
    keys.iter().map(|k| k.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::AccountStatus;
    use crate::service::default_services;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn record(row: usize, name: &str, status: Option<&str>) -> ServiceRecord {
        ServiceRecord {
            row,
            full_name: Some(name.into()),
            status: status.map(Into::into),
            admin: None,
        }
    }

    fn service(id: &str) -> ServiceDescriptor {
        default_services(Path::new("in"))
            .into_iter()
            .find(|s| s.id == id)
            .unwrap()
    }

    fn kontur() -> ServiceDescriptor {
        service("kontur")
    }

    fn loaded<'c>(descriptor: &'c ServiceDescriptor, records: Vec<ServiceRecord>) -> LoadedService<'c> {
        LoadedService {
            descriptor,
            records,
            outcome: ServiceOutcome::default(),
        }
    }

    #[test]
    fn test_analyze_service() {
        let records = vec![
            record(2, "Иван Петров", None),
            record(3, "ИВАН ПЕТРОВ Сергеевич", Some("01.01.2024")),
            record(4, "Петр Смирнов", None),
            record(5, "Олег Орлов", Some("01.01.2024")),
        ];
        let valid = IdentitySet::from_names(vec![Some("Ivan Sidorov"), Some("Иван Петров")]);
        let selected = IdentitySet::from_names(vec![Some("Иван Петров")]);

        let result = analyze_service(&kontur(), &records, &selected, &valid);
        assert_eq!(key_strings(&result.internal_duplicates), vec!["ИВАН ПЕТРОВ"]);
        assert_eq!(key_strings(&result.cross_source_matches), vec!["ИВАН ПЕТРОВ"]);
        assert_eq!(result.orphans, vec![&records[2]]);
    }

    #[test]
    fn test_empty_directory_flags_every_active_account() {
        let records = vec![record(2, "A B", None), record(3, "C D", Some("x"))];
        let result = analyze_service(&kontur(), &records, &IdentitySet::new(), &IdentitySet::new());
        assert_eq!(result.orphans, vec![&records[0]]);
        assert!(result.cross_source_matches.is_empty());
    }

    #[test]
    fn test_duplicate_records_grouped() {
        let records = vec![
            record(2, "Яна Яковлева", None),
            record(3, "Анна Иванова", None),
            record(4, "Олег Орлов", None),
            record(5, "яна яковлева", None),
            record(6, "АННА ИВАНОВА", None),
        ];
        let dups = internal_duplicates(records.iter().map(|r| r.full_name.as_deref()));
        let rows: Vec<usize> = duplicate_records(&records, &dups).iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![3, 6, 2, 5]);
    }

    #[test]
    fn test_unknown_service_rejected() {
        let config = Config::default();
        let reconciler = Reconciler::new(&config);
        assert!(reconciler.select_services(&["nope".to_string()]).is_err());
        assert_eq!(reconciler.select_services(&[]).unwrap().len(), 3);
        let picked = reconciler
            .select_services(&["kontur".to_string(), "onec".to_string()])
            .unwrap();
        let ids: Vec<&str> = picked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["onec", "kontur"]);
    }

    #[test]
    fn test_combined_sheet_fills() {
        const RED: Color = Color::RGB(0xFFC7CE);
        const YELLOW: Color = Color::RGB(0xFFEB9C);

        let config = Config::default();
        let reconciler = Reconciler::new(&config);
        let snapshot = DirectorySnapshot {
            employees: vec![ListedIdentity {
                name: "Иван Петров".into(),
                status: AccountStatus::Active,
            }],
            contractors: Vec::new(),
        };
        let valid = snapshot.valid_keys();

        let kontur = kontur();
        let onec = service("onec");
        let services = vec![
            loaded(
                &kontur,
                vec![
                    record(2, "Иван Петров", None),
                    record(3, "иван петров", None),
                    record(4, "Анна Смирнова", None),
                    record(5, "Анна Смирнова", None),
                    record(6, "Олег Орлов", Some("01.01.2024")),
                ],
            ),
            loaded(
                &onec,
                vec![record(5, "Семён Лебедев", Some("Да")), record(6, "Иван Петров", Some("Да"))],
            ),
        ];
        let results: Vec<ServiceResult<'_>> = services
            .iter()
            .map(|l| analyze_service(l.descriptor, &l.records, &valid, &valid))
            .collect();
        let fills = Fills {
            duplicate: RED,
            orphan: YELLOW,
        };

        let (table, cell_fills) = reconciler.combined_sheet(
            None,
            &snapshot,
            CategorySelection::all(),
            &services,
            &results,
            &fills,
        );

        // roster (1) + employees (2) + contractors (2), then Контур (3) and 1С (2)
        assert_eq!(table.columns().len(), 10);
        assert_eq!(table.columns()[5], "Контур_ФИО");
        assert_eq!(table.columns()[8], "1C_ФИО");

        let expected: CellFills = [
            ((0, 5), RED),
            ((1, 5), RED),
            ((2, 5), YELLOW),
            ((3, 5), YELLOW),
            ((0, 8), YELLOW),
        ]
        .into_iter()
        .collect();
        assert_eq!(cell_fills, expected);
    }
}
