//! Run summary
//!
//! A [`ReconciliationReport`] is what a run returns besides the workbook: the
//! counts per source and per service, the keys flagged, and which inputs were
//! missing. It prints as text for operators or as JSON for scripts.

use crate::directory::ExportSummary;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory side of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryOutcome {
    /// Present when the export ran and succeeded
    pub export: Option<ExportSummary>,
    /// Present when the export ran and failed
    pub export_error: Option<String>,
    pub employees: usize,
    pub contractors: usize,
}

/// Roster side of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RosterOutcome {
    pub path: PathBuf,
    pub names: usize,
    pub gaps: usize,
}

/// Results for one external service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceOutcome {
    pub id: String,
    pub label: String,
    /// Export file used; `None` when no fresh export was found
    pub source: Option<PathBuf>,
    /// Set when the export existed but could not be read
    pub error: Option<String>,
    pub records: usize,
    pub internal_duplicates: Vec<String>,
    pub cross_source_matches: Vec<String>,
    pub orphans: usize,
}

impl ServiceOutcome {
    pub fn status(&self) -> &'static str {
        match (&self.source, &self.error) {
            (_, Some(_)) => "unreadable",
            (None, None) => "missing",
            (Some(_), None) => "ok",
        }
    }
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationReport {
    /// Workbook written by the run
    pub output: PathBuf,
    pub sheets: Vec<String>,
    pub directory: DirectoryOutcome,
    /// `None` when no fresh roster was found
    pub roster: Option<RosterOutcome>,
    pub services: Vec<ServiceOutcome>,
}

impl ReconciliationReport {
    pub fn total_orphans(&self) -> usize {
        self.services.iter().map(|s| s.orphans).sum()
    }

    /// Format as human-readable report
    pub fn to_report(&self) -> String {
        let mut out = String::new();

        out.push_str("RECONCILIATION REPORT\n");
        out.push_str("═══════════════════════════════════════════════════════════════\n\n");

        out.push_str("Directory:\n");
        match (&self.directory.export, &self.directory.export_error) {
            (Some(export), _) => out.push_str(&format!(
                "  export: {} users ({} employees, {} contractors)\n",
                export.total, export.employees, export.contractors
            )),
            (None, Some(e)) => out.push_str(&format!("  export FAILED: {}\n", e)),
            (None, None) => out.push_str("  export skipped, existing listings used\n"),
        }
        out.push_str(&format!(
            "  listed: {} employees, {} contractors\n\n",
            self.directory.employees, self.directory.contractors
        ));

        match &self.roster {
            Some(roster) => out.push_str(&format!(
                "Roster: {} names from {}, {} directory identities missing\n\n",
                roster.names,
                roster.path.display(),
                roster.gaps
            )),
            None => out.push_str("Roster: no fresh file, gap check skipped\n\n"),
        }

        out.push_str("Services:\n");
        for service in &self.services {
            out.push_str(&format!("  {} [{}]", service.label, service.status()));
            match (&service.source, &service.error) {
                (_, Some(e)) => out.push_str(&format!(" {}\n", e)),
                (Some(path), None) => out.push_str(&format!(
                    " {}\n    records: {}, duplicates: {}, matches: {}, to remove: {}\n",
                    path.display(),
                    service.records,
                    service.internal_duplicates.len(),
                    service.cross_source_matches.len(),
                    service.orphans
                )),
                (None, None) => out.push('\n'),
            }
        }

        out.push_str(&format!(
            "\nOutput: {} ({} sheets)\n",
            self.output.display(),
            self.sheets.len()
        ));
        out.push_str(&format!("Accounts to remove: {}\n", self.total_orphans()));

        out
    }
}
