// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # idrecon — employee identity reconciliation
//!
//! Reconciles who has access against who should: the directory service, the
//! staffing roster and a set of external document-exchange/ERP services are
//! compared by name, and the result is one report workbook listing
//!
//! - names duplicated inside a service export,
//! - service accounts that are active but match nobody in the directory
//!   ("accounts to remove"),
//! - directory employees missing from the staffing roster.
//!
//! ## Matching
//!
//! Every comparison runs on a [`CanonicalKey`]: the first two tokens of a
//! name (given name and surname, patronymic dropped), uppercased, with `ё`
//! folded to `е`. Blank names produce the empty key, which never matches and
//! is never counted.
//!
//! ```rust
//! use idrecon::{normalize_str, IdentitySet, internal_duplicates};
//!
//! assert_eq!(normalize_str("  пётр   иванов сергеевич"), normalize_str("ПЕТР ИВАНОВ"));
//!
//! let dups = internal_duplicates(vec![Some("Ivan Petrov"), Some("IVAN PETROV"), Some("Ivan Sidorov")]);
//! assert_eq!(dups, IdentitySet::from_names(vec![Some("ivan petrov")]));
//! ```
//!
//! ## Services
//!
//! External services are described by [`ServiceDescriptor`]s in the config:
//! which columns hold the name, status and administrator flag, and the
//! [`ActivityRule`] deciding when an account counts as active. One loader and
//! one orphan detector serve all of them.
//!
//! ## Running
//!
//! [`Reconciler::run`] performs a full run for a [`Config`] and returns a
//! [`ReconciliationReport`]. Missing or stale inputs are logged and yield
//! empty results for that source; the run still completes.

pub mod compare;
pub mod config;
pub mod config_validate;
pub mod directory;
pub mod discovery;
pub mod error;
pub mod normalize;
pub mod orphans;
pub mod reconcile;
pub mod report;
pub mod roster;
pub mod service;
pub mod table;
pub mod workbook;

// Re-exports
pub use compare::{cross_source_matches, internal_duplicates, IdentitySet};
pub use config::{Config, DEFAULT_CONFIG_FILE};
pub use directory::{
    AccountStatus, Category, Classifier, DirectoryExporter, DirectorySnapshot, DirectoryUser,
    ListedIdentity,
};
pub use discovery::{find_latest_file, Freshness};
pub use error::{Error, Result};
pub use normalize::{fold_letters, normalize, normalize_str, CanonicalKey};
pub use orphans::{find_orphans, IdentityRecord};
pub use reconcile::{analyze_service, CategorySelection, Reconciler, RunOptions, ServiceResult};
pub use report::{DirectoryOutcome, ReconciliationReport, RosterOutcome, ServiceOutcome};
pub use roster::{find_missing_from_roster, RosterGap, MISSING_FROM_ROSTER_REASON};
pub use service::{ActivityRule, ServiceColumns, ServiceDescriptor, ServiceRecord};
pub use table::Table;
pub use workbook::{append_sheet, load_table, save_table, ReportWorkbook};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
