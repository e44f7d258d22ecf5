//! Directory export and classification
//!
//! The directory is queried by an external program (PowerShell with the
//! ActiveDirectory module by default) that prints one compressed JSON object
//! per user, separated by blank lines. The output is read to completion
//! before anything is compared. Enabled users are classified as employees or
//! contractors by their distinguished-name path and written to two listing
//! files, which are what a reconciliation run reads back.

use crate::compare::IdentitySet;
use crate::config::{Config, DirectoryConfig};
use crate::error::{Error, Result};
use crate::table::Table;
use crate::workbook::save_table;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;
use tracing::{debug, error, info, warn};

/// PowerShell script printing every directory user as JSON
pub const EXPORT_SCRIPT: &str = r#"
$OutputEncoding = [System.Text.Encoding]::UTF8
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8
$ErrorActionPreference = 'Stop'
try {
    $users = Get-ADUser -Filter * -Properties Name, SamAccountName, Enabled, EmailAddress, Company, DistinguishedName
    Write-Output "Users found: $($users.Count)"
    foreach ($user in $users) {
        $user | Select-Object Name, SamAccountName, Enabled, EmailAddress, Company, DistinguishedName |
            ConvertTo-Json -Depth 2 -Compress
        Write-Output ""
    }
}
catch {
    Write-Error $_
    exit 1
}
"#;

/// Line prefix the export script uses to report the user count
pub const USER_COUNT_MARKER: &str = "Users found:";

/// Enabled/disabled status of a directory account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AccountStatus {
    Active,
    Blocked,
    Unknown,
}

impl AccountStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Активна",
            AccountStatus::Blocked => "Заблокирована",
            AccountStatus::Unknown => "Неизвестно",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "активна" => AccountStatus::Active,
            "заблокирована" => AccountStatus::Blocked,
            _ => AccountStatus::Unknown,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Directory record category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Employee,
    Contractor,
}

/// One user from the directory export, with cleaned field values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub full_name: String,
    pub logon_id: String,
    pub enabled: bool,
    pub email: String,
    pub organization: String,
    pub distinguished_name: String,
}

impl DirectoryUser {
    pub fn status(&self) -> AccountStatus {
        if self.enabled {
            AccountStatus::Active
        } else {
            AccountStatus::Blocked
        }
    }
}

/// Raw shape of one JSON fragment; any field may be null or absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExportedUser {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    sam_account_name: Option<Value>,
    #[serde(default)]
    enabled: Option<Value>,
    #[serde(default)]
    email_address: Option<Value>,
    #[serde(default)]
    company: Option<Value>,
    #[serde(default)]
    distinguished_name: Option<Value>,
}

/// Result of parsing the export program's output
#[derive(Debug, Default)]
pub struct ParsedExport {
    pub users: Vec<DirectoryUser>,
    /// Count announced by the script, if it printed one
    pub reported_count: Option<usize>,
    /// Fragments dropped because they were not valid JSON
    pub malformed: usize,
}

/// Parser for the export program's output
pub struct ExportParser {
    control_chars: Regex,
}

impl ExportParser {
    pub fn new() -> Result<Self> {
        let control_chars =
            Regex::new(r"\p{C}").map_err(|e| Error::Other(format!("Invalid pattern: {}", e)))?;
        Ok(Self { control_chars })
    }

    /// Strip control and format characters, then trim.
    pub fn clean_value(&self, value: Option<&Value>) -> String {
        let text = match value {
            None | Some(Value::Null) => return String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        self.control_chars.replace_all(&text, "").trim().to_string()
    }

    /// Parse the complete output. Blank lines end a fragment; an
    /// unparseable fragment is dropped with a warning.
    pub fn parse(&self, output: &str) -> ParsedExport {
        let mut parsed = ParsedExport::default();
        let mut fragment = String::new();

        for line in output.lines() {
            if let Some(count) = line.trim().strip_prefix(USER_COUNT_MARKER) {
                match count.trim().parse::<usize>() {
                    Ok(n) => {
                        info!(count = n, "directory reports users");
                        parsed.reported_count = Some(n);
                    }
                    Err(_) => debug!(line, "unreadable user count line"),
                }
                continue;
            }

            if line.trim().is_empty() {
                self.flush(&mut fragment, &mut parsed);
                continue;
            }

            fragment.push_str(line);
            fragment.push('\n');
        }
        self.flush(&mut fragment, &mut parsed);

        if let Some(expected) = parsed.reported_count {
            if expected != parsed.users.len() {
                warn!(expected, parsed = parsed.users.len(), "user count mismatch");
            }
        }

        parsed
    }

    fn flush(&self, fragment: &mut String, parsed: &mut ParsedExport) {
        if fragment.trim().is_empty() {
            fragment.clear();
            return;
        }

        match serde_json::from_str::<ExportedUser>(fragment) {
            Ok(raw) => parsed.users.push(DirectoryUser {
                full_name: self.clean_value(raw.name.as_ref()),
                logon_id: self.clean_value(raw.sam_account_name.as_ref()),
                enabled: matches!(raw.enabled, Some(Value::Bool(true))),
                email: self.clean_value(raw.email_address.as_ref()),
                organization: self.clean_value(raw.company.as_ref()),
                distinguished_name: self.clean_value(raw.distinguished_name.as_ref()),
            }),
            Err(e) => {
                warn!(error = %e, fragment = %fragment.trim(), "malformed export record dropped");
                parsed.malformed += 1;
            }
        }
        fragment.clear();
    }
}

/// Path-marker classification of enabled directory users
#[derive(Debug, Clone)]
pub struct Classifier {
    employee_marker: String,
    contractor_marker: String,
    contractor_org_marker: String,
}

impl Classifier {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            employee_marker: config.employee_marker.to_lowercase(),
            contractor_marker: config.contractor_marker.to_lowercase(),
            contractor_org_marker: config.contractor_org_marker.to_lowercase(),
        }
    }

    /// Category of an enabled user; disabled users belong to neither.
    pub fn classify(&self, user: &DirectoryUser) -> Option<Category> {
        if !user.enabled {
            return None;
        }

        let path = user.distinguished_name.to_lowercase();
        let has = |marker: &str| !marker.is_empty() && path.contains(marker);

        if has(&self.employee_marker) && !has(&self.contractor_marker) {
            Some(Category::Employee)
        } else if has(&self.contractor_org_marker) || has(&self.contractor_marker) {
            Some(Category::Contractor)
        } else {
            None
        }
    }
}

/// Runs the export program and collects its output
#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    program: String,
    args: Vec<String>,
}

impl DirectoryExporter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.directory.program.clone(), config.export_args(EXPORT_SCRIPT))
    }

    /// Run the program to completion and parse its output.
    ///
    /// A non-zero exit is only an error when no users were parsed.
    pub fn run(&self) -> Result<Vec<DirectoryUser>> {
        info!(program = %self.program, "running directory export");
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| Error::Export(format!("cannot start {}: {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let parsed = ExportParser::new()?.parse(&stdout);

        if !output.status.success() {
            if parsed.users.is_empty() {
                return Err(Error::Export(format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                )));
            }
            error!(status = %output.status, stderr = %stderr.trim(), "export program failed, keeping parsed users");
        } else if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "export program wrote to stderr");
        }

        info!(users = parsed.users.len(), malformed = parsed.malformed, "directory export parsed");
        Ok(parsed.users)
    }
}

/// One name/status entry of a listing file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedIdentity {
    pub name: String,
    pub status: AccountStatus,
}

/// Render a listing file: `Name:`/`Status:` blocks separated by blank lines.
pub fn render_listing(entries: &[ListedIdentity]) -> String {
    let mut out = String::new();
    for entry in entries {
        // Writing into a String cannot fail.
        let _ = write!(out, "Name: {}\nStatus: {}\n\n", entry.name, entry.status);
    }
    out
}

/// Parse a listing file. A name without a status line is `Unknown`.
pub fn parse_listing(text: &str) -> Vec<ListedIdentity> {
    let mut entries = Vec::new();
    let mut current: Option<ListedIdentity> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("Name:") {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some(ListedIdentity {
                name: name.trim().to_string(),
                status: AccountStatus::Unknown,
            });
        } else if let Some(status) = line.strip_prefix("Status:") {
            if let Some(entry) = current.as_mut() {
                entry.status = AccountStatus::from_label(status);
            }
        }
    }
    entries.extend(current);
    entries
}

/// Read a listing file; a missing file is an empty listing.
pub fn read_listing(path: &Path) -> Result<Vec<ListedIdentity>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_listing(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "listing file not found");
            Ok(Vec::new())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Employees and contractors as read back from the listing files
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub employees: Vec<ListedIdentity>,
    pub contractors: Vec<ListedIdentity>,
}

impl DirectorySnapshot {
    pub fn load(config: &DirectoryConfig) -> Result<Self> {
        Ok(Self {
            employees: read_listing(&config.employees_path())?,
            contractors: read_listing(&config.contractors_path())?,
        })
    }

    pub fn employee_keys(&self) -> IdentitySet {
        IdentitySet::from_names(self.employees.iter().map(|e| Some(e.name.as_str())))
    }

    pub fn contractor_keys(&self) -> IdentitySet {
        IdentitySet::from_names(self.contractors.iter().map(|e| Some(e.name.as_str())))
    }

    /// Every identity that makes a service account legitimate
    pub fn valid_keys(&self) -> IdentitySet {
        self.employee_keys().union(&self.contractor_keys())
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty() && self.contractors.is_empty()
    }
}

/// Counts from one export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExportSummary {
    pub total: usize,
    pub employees: usize,
    pub contractors: usize,
}

/// Split users into listing entries per category.
pub fn classify_users(
    users: &[DirectoryUser],
    classifier: &Classifier,
) -> (Vec<ListedIdentity>, Vec<ListedIdentity>) {
    let mut employees = Vec::new();
    let mut contractors = Vec::new();
    for user in users {
        let entry = || ListedIdentity {
            name: user.full_name.clone(),
            status: user.status(),
        };
        match classifier.classify(user) {
            Some(Category::Employee) => employees.push(entry()),
            Some(Category::Contractor) => contractors.push(entry()),
            None => {}
        }
    }
    (employees, contractors)
}

/// Full export as a table for the export workbook
pub fn users_table(users: &[DirectoryUser]) -> Table {
    let mut table = Table::new([
        "Name",
        "SamAccountName",
        "Enabled",
        "EmailAddress",
        "Company",
        "DistinguishedName",
    ]);
    for user in users {
        table.push_row([
            user.full_name.clone(),
            user.logon_id.clone(),
            user.status().label().to_string(),
            user.email.clone(),
            user.organization.clone(),
            user.distinguished_name.clone(),
        ]);
    }
    table
}

/// Write listing files and the export workbook for an exported user set.
pub fn write_export(config: &Config, users: &[DirectoryUser]) -> Result<ExportSummary> {
    let classifier = Classifier::new(&config.directory);
    let (employees, contractors) = classify_users(users, &classifier);

    std::fs::create_dir_all(&config.directory.listing_dir)?;
    std::fs::write(config.directory.employees_path(), render_listing(&employees))?;
    std::fs::write(config.directory.contractors_path(), render_listing(&contractors))?;

    let workbook = config.export_workbook_path();
    save_table(&users_table(users), &workbook, "AD")?;
    info!(
        path = %workbook.display(),
        total = users.len(),
        employees = employees.len(),
        contractors = contractors.len(),
        "directory export written"
    );

    Ok(ExportSummary {
        total: users.len(),
        employees: employees.len(),
        contractors: contractors.len(),
    })
}

/// Run the export and write its artifacts.
///
/// On failure the listing files are truncated so that a previous export is
/// never mistaken for current data, and the error is returned.
pub fn export_directory(config: &Config, exporter: &DirectoryExporter) -> Result<ExportSummary> {
    match exporter.run() {
        Ok(users) => write_export(config, &users),
        Err(e) => {
            std::fs::create_dir_all(&config.directory.listing_dir)?;
            std::fs::write(config.directory.employees_path(), "")?;
            std::fs::write(config.directory.contractors_path(), "")?;
            Err(e)
        }
    }
}
