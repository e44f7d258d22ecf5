//! CLI command implementations
//!
//! - `run`: reconciliation run and directory export
//! - `simple`: name normalization
//! - `config`: config check, schema and init
//! - `util`: interactive selection and output helpers

pub mod config;
pub mod run;
pub mod simple;
pub mod util;

pub use config::cmd_config;
pub use run::{cmd_export, cmd_run};
pub use simple::cmd_normalize;
