//! idrecon configuration
//!
//! One [`Config`] is built at process start (from `idrecon.yaml`, or the
//! defaults when no file exists) and passed by reference to the reconciler
//! and every loader. The defaults reproduce the standard deployment layout:
//! exports under `эксельки/`, reports under `вывод/`.

use crate::error::{Error, Result};
use crate::service::{default_pattern, default_services, ServiceDescriptor};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "idrecon.yaml";

/// Placeholder in `directory.args` replaced by the built-in export script
pub const SCRIPT_PLACEHOLDER: &str = "{script}";

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Schema version for migrations
    pub version: u32,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub freshness: FreshnessConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub roster: RosterConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// External services to reconcile
    #[serde(default = "default_service_list")]
    pub services: Vec<ServiceDescriptor>,
}

/// Input and output roots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PathsConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("эксельки")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("вывод")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// Input freshness policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FreshnessConfig {
    /// Files modified longer ago than this are ignored
    #[serde(default = "default_max_age")]
    pub max_file_age_days: u32,
}

fn default_max_age() -> u32 {
    30
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            max_file_age_days: default_max_age(),
        }
    }
}

/// Directory export and classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryConfig {
    /// Program that prints the directory export
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments; `{script}` is replaced by the built-in export script
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Directory holding the employee/contractor listing files
    #[serde(default = "default_listing_dir")]
    pub listing_dir: PathBuf,

    #[serde(default = "default_employees_listing")]
    pub employees_listing: String,

    #[serde(default = "default_contractors_listing")]
    pub contractors_listing: String,

    /// Full export workbook, written to the output directory
    #[serde(default = "default_export_workbook")]
    pub export_workbook: String,

    /// Path marker of the employee organizational unit
    #[serde(default = "default_employee_marker")]
    pub employee_marker: String,

    /// Path marker of contractors
    #[serde(default = "default_contractor_marker")]
    pub contractor_marker: String,

    /// Path marker of the external organizations unit (contractors)
    #[serde(default = "default_contractor_org_marker")]
    pub contractor_org_marker: String,
}

fn default_program() -> String {
    "powershell".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "-NoProfile".to_string(),
        "-Command".to_string(),
        SCRIPT_PLACEHOLDER.to_string(),
    ]
}

fn default_listing_dir() -> PathBuf {
    default_input_dir().join("AD")
}

fn default_employees_listing() -> String {
    "сотрудники.txt".to_string()
}

fn default_contractors_listing() -> String {
    "ГПХ.txt".to_string()
}

fn default_export_workbook() -> String {
    "ad_users_export.xlsx".to_string()
}

fn default_employee_marker() -> String {
    "cu_users".to_string()
}

fn default_contractor_marker() -> String {
    "гпх".to_string()
}

fn default_contractor_org_marker() -> String {
    "external_organizations".to_string()
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            listing_dir: default_listing_dir(),
            employees_listing: default_employees_listing(),
            contractors_listing: default_contractors_listing(),
            export_workbook: default_export_workbook(),
            employee_marker: default_employee_marker(),
            contractor_marker: default_contractor_marker(),
            contractor_org_marker: default_contractor_org_marker(),
        }
    }
}

impl DirectoryConfig {
    pub fn employees_path(&self) -> PathBuf {
        self.listing_dir.join(&self.employees_listing)
    }

    pub fn contractors_path(&self) -> PathBuf {
        self.listing_dir.join(&self.contractors_listing)
    }
}

/// Staffing roster input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RosterConfig {
    #[serde(default = "default_roster_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Column holding the full name
    #[serde(default = "default_roster_column")]
    pub name_column: String,

    /// 0-based sheet row holding the column headers
    #[serde(default)]
    pub header_row: usize,
}

fn default_roster_dir() -> PathBuf {
    default_input_dir().join("штатка")
}

fn default_roster_column() -> String {
    "Ф.И.О.".to_string()
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            dir: default_roster_dir(),
            pattern: default_pattern(),
            name_column: default_roster_column(),
            header_row: 0,
        }
    }
}

/// Report workbook layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputConfig {
    /// Report file name prefix; a `_YYYYMMDD_HHMMSS.xlsx` suffix is added
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Log file in the output directory
    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default = "default_combined_sheet")]
    pub combined_sheet: String,

    #[serde(default = "default_roster_sheet")]
    pub roster_sheet: String,

    /// Fill for internal duplicates (RRGGBB)
    #[serde(default = "default_duplicate_color")]
    pub duplicate_color: String,

    /// Fill for accounts to remove (RRGGBB)
    #[serde(default = "default_orphan_color")]
    pub orphan_color: String,

    #[serde(default)]
    pub headers: HeadersConfig,
}

fn default_file_prefix() -> String {
    "результат_обработки".to_string()
}

fn default_log_file() -> String {
    "processing.log".to_string()
}

fn default_combined_sheet() -> String {
    "сравнение пользователей".to_string()
}

fn default_roster_sheet() -> String {
    "сравнение AD и Штатки".to_string()
}

fn default_duplicate_color() -> String {
    "FFC7CE".to_string()
}

fn default_orphan_color() -> String {
    "FFEB9C".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_prefix: default_file_prefix(),
            log_file: default_log_file(),
            combined_sheet: default_combined_sheet(),
            roster_sheet: default_roster_sheet(),
            duplicate_color: default_duplicate_color(),
            orphan_color: default_orphan_color(),
            headers: HeadersConfig::default(),
        }
    }
}

/// Column headers of the directory and roster parts of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HeadersConfig {
    pub roster_name: String,
    pub employees: String,
    pub employees_status: String,
    pub contractors: String,
    pub contractors_status: String,
    pub gap_name: String,
    pub gap_reason: String,
    /// Sheet-row column on the removal sheets
    pub source_row: String,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            roster_name: "Штатное_ФИО".into(),
            employees: "AD_сотрудники".into(),
            employees_status: "AD_Статус_сотрудники".into(),
            contractors: "AD_ГПХ".into(),
            contractors_status: "AD_Статус_ГПХ".into(),
            gap_name: "ФИО_AD".into(),
            gap_reason: "Статус".into(),
            source_row: "Строка".into(),
        }
    }
}

fn default_service_list() -> Vec<ServiceDescriptor> {
    default_services(&default_input_dir())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            paths: PathsConfig::default(),
            freshness: FreshnessConfig::default(),
            directory: DirectoryConfig::default(),
            roster: RosterConfig::default(),
            output: OutputConfig::default(),
            services: default_service_list(),
        }
    }
}

impl Config {
    /// Parse a YAML config and check its version
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_norway::from_str(yaml)?;
        if config.version != 1 {
            return Err(Error::Config(format!(
                "Unsupported config version: {}",
                config.version
            )));
        }
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_norway::to_string(self)?)
    }

    /// Load a config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn service(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn log_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.output.log_file)
    }

    pub fn export_workbook_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.directory.export_workbook)
    }

    /// Timestamped report path in the output directory
    pub fn report_path(&self, at: chrono::DateTime<chrono::Local>) -> PathBuf {
        self.paths.output_dir.join(format!(
            "{}_{}.xlsx",
            self.output.file_prefix,
            at.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Arguments for the export program with the script substituted
    pub fn export_args(&self, script: &str) -> Vec<String> {
        self.directory
            .args
            .iter()
            .map(|a| a.replace(SCRIPT_PLACEHOLDER, script))
            .collect()
    }
}
