//! Config validation for idrecon
//!
//! Checks an `idrecon.yaml` file for problems that would otherwise surface
//! halfway through a run: sheet names Excel rejects, duplicate ids, unusable
//! patterns and colours.

use crate::config::{Config, SCRIPT_PLACEHOLDER};
use crate::workbook::parse_color;
use globset::Glob;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Excel's limit on worksheet name length
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Severity level for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A validation issue found in config
#[derive(Debug, Clone, Serialize)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub file: String,
}

impl ConfigIssue {
    pub fn error(code: &str, message: &str, file: &str) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            message: message.to_string(),
            file: file.to_string(),
        }
    }

    pub fn warning(code: &str, message: &str, file: &str) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.to_string(),
            file: file.to_string(),
        }
    }
}

/// Result of config validation
#[derive(Debug, Default, Serialize)]
pub struct ConfigValidationResult {
    pub issues: Vec<ConfigIssue>,
    pub services_checked: usize,
}

impl ConfigValidationResult {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    fn error(&mut self, code: &str, message: String, file: &str) {
        self.issues.push(ConfigIssue::error(code, &message, file));
    }

    fn warning(&mut self, code: &str, message: String, file: &str) {
        self.issues.push(ConfigIssue::warning(code, &message, file));
    }
}

/// Validate a config file on disk
pub fn validate_config_file(path: &Path) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::default();
    let file_str = path.display().to_string();

    if !path.exists() {
        result
            .issues
            .push(ConfigIssue::error("E001", "File does not exist", &file_str));
        return result;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.error("E002", format!("Cannot read file: {}", e), &file_str);
            return result;
        }
    };

    let config: Config = match serde_norway::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            result.error("E003", format!("Invalid YAML: {}", e), &file_str);
            return result;
        }
    };

    validate_config(&config, &file_str, &mut result);
    result
}

/// Validate an already parsed config
pub fn validate_config(config: &Config, file: &str, result: &mut ConfigValidationResult) {
    if config.version != 1 {
        result.error(
            "E004",
            format!(
                "Unsupported version: {}. Only version 1 is supported.",
                config.version
            ),
            file,
        );
    }

    if config.services.is_empty() {
        result.warning("W001", "No services configured".to_string(), file);
    }

    if config.freshness.max_file_age_days == 0 {
        result.warning(
            "W003",
            "max_file_age_days is 0: only files modified right now are accepted".to_string(),
            file,
        );
    }

    let directory = &config.directory;
    for (field, marker) in [
        ("employee_marker", &directory.employee_marker),
        ("contractor_marker", &directory.contractor_marker),
        ("contractor_org_marker", &directory.contractor_org_marker),
    ] {
        if marker.trim().is_empty() {
            result.warning(
                "W002",
                format!("directory.{} is empty and will never match", field),
                file,
            );
        }
    }
    if !directory.args.iter().any(|a| a.contains(SCRIPT_PLACEHOLDER)) {
        result.warning(
            "W005",
            format!(
                "directory.args has no {} placeholder; the export script will not be passed",
                SCRIPT_PLACEHOLDER
            ),
            file,
        );
    }

    check_pattern("roster.pattern", &config.roster.pattern, file, result);
    check_column("roster.name_column", &config.roster.name_column, file, result);

    for (field, literal) in [
        ("output.duplicate_color", &config.output.duplicate_color),
        ("output.orphan_color", &config.output.orphan_color),
    ] {
        if let Err(e) = parse_color(literal) {
            result.error("E010", format!("{}: {}", field, e), file);
        }
    }

    let mut ids: BTreeMap<&str, usize> = BTreeMap::new();
    for service in &config.services {
        result.services_checked += 1;
        let prefix = format!("services.{}", service.id);

        if service.id.trim().is_empty() {
            result.error("E011", "Service id cannot be empty".to_string(), file);
        }
        *ids.entry(service.id.as_str()).or_default() += 1;

        check_pattern(&format!("{}.pattern", prefix), &service.pattern, file, result);
        check_column(&format!("{}.columns.name", prefix), &service.columns.name, file, result);
        check_column(&format!("{}.columns.status", prefix), &service.columns.status, file, result);
        if let Some(admin) = &service.columns.admin {
            check_column(&format!("{}.columns.admin", prefix), admin, file, result);
        }
        check_column(&format!("{}.headers.name", prefix), &service.headers.name, file, result);
        check_column(&format!("{}.headers.status", prefix), &service.headers.status, file, result);

        if !service.dir.exists() {
            result.warning(
                "W004",
                format!("{}: directory {} does not exist", prefix, service.dir.display()),
                file,
            );
        }
    }

    for (id, count) in ids {
        if count > 1 {
            result.error("E005", format!("Service id '{}' is used {} times", id, count), file);
        }
    }

    let mut sheets: Vec<(&str, &str)> = vec![
        ("output.combined_sheet", config.output.combined_sheet.as_str()),
        ("output.roster_sheet", config.output.roster_sheet.as_str()),
    ];
    for service in &config.services {
        sheets.push(("duplicates_sheet", service.duplicates_sheet.as_str()));
        sheets.push(("remove_sheet", service.remove_sheet.as_str()));
    }
    validate_sheet_names(&sheets, file, result);
}

fn check_pattern(field: &str, pattern: &str, file: &str, result: &mut ConfigValidationResult) {
    if let Err(e) = Glob::new(pattern) {
        result.error("E009", format!("{}: invalid pattern '{}': {}", field, pattern, e), file);
    }
}

fn check_column(field: &str, column: &str, file: &str, result: &mut ConfigValidationResult) {
    if column.trim().is_empty() {
        result.error("E006", format!("{} cannot be empty", field), file);
    }
}

fn validate_sheet_names(sheets: &[(&str, &str)], file: &str, result: &mut ConfigValidationResult) {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();

    for &(field, name) in sheets {
        if name.trim().is_empty() {
            result.error("E007", format!("{}: sheet name cannot be empty", field), file);
            continue;
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            result.error(
                "E007",
                format!(
                    "{}: sheet name '{}' is longer than {} characters",
                    field, name, MAX_SHEET_NAME_LEN
                ),
                file,
            );
        }
        if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
            result.error(
                "E007",
                format!("{}: sheet name '{}' contains '{}'", field, name, c),
                file,
            );
        }

        // Excel compares sheet names case-insensitively.
        if let Some(previous) = seen.insert(name.to_lowercase(), field) {
            result.error(
                "E008",
                format!("Sheet name '{}' is used by both {} and {}", name, previous, field),
                file,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn codes(result: &ConfigValidationResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.code.as_str()).collect()
    }

    fn check(config: &Config) -> ConfigValidationResult {
        let mut result = ConfigValidationResult::default();
        validate_config(config, "idrecon.yaml", &mut result);
        result
    }

    #[test]
    fn test_default_config_has_no_errors() {
        let result = check(&Config::default());
        assert!(!result.has_errors(), "{:?}", result.issues);
        assert_eq!(result.services_checked, 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = validate_config_file(&dir.path().join("idrecon.yaml"));
        assert_eq!(codes(&result), vec!["E001"]);
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idrecon.yaml");
        std::fs::write(&path, "version: [1").unwrap();
        let result = validate_config_file(&path);
        assert_eq!(codes(&result), vec!["E003"]);
    }

    #[test]
    fn test_invalid_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idrecon.yaml");
        std::fs::write(&path, "version: 2\nservices: []\n").unwrap();
        let result = validate_config_file(&path);
        assert!(codes(&result).contains(&"E004"));
        assert!(codes(&result).contains(&"W001"));
    }

    #[test]
    fn test_duplicate_service_ids_and_sheets() {
        let mut config = Config::default();
        let copy = config.services[0].clone();
        config.services.push(copy);
        let result = check(&config);
        assert!(codes(&result).contains(&"E005"));
        assert!(codes(&result).contains(&"E008"));
    }

    #[test]
    fn test_bad_sheet_names() {
        let mut config = Config::default();
        config.output.combined_sheet = "a/b".into();
        config.output.roster_sheet = "x".repeat(32);
        let result = check(&config);
        assert_eq!(result.issues.iter().filter(|i| i.code == "E007").count(), 2);
    }

    #[test]
    fn test_bad_pattern_colour_and_column() {
        let mut config = Config::default();
        config.services[0].pattern = "[".into();
        config.services[0].columns.name = " ".into();
        config.output.orphan_color = "yellow".into();
        let result = check(&config);
        assert!(codes(&result).contains(&"E009"));
        assert!(codes(&result).contains(&"E006"));
        assert!(codes(&result).contains(&"E010"));
    }

    #[test]
    fn test_warnings() {
        let mut config = Config::default();
        config.freshness.max_file_age_days = 0;
        config.directory.contractor_marker.clear();
        config.directory.args = vec!["-File".into(), "export.ps1".into()];
        let result = check(&config);
        assert!(!result.has_errors());
        assert!(codes(&result).contains(&"W002"));
        assert!(codes(&result).contains(&"W003"));
        assert!(codes(&result).contains(&"W005"));
    }
}
