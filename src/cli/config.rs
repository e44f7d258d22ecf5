//! Config and schema CLI commands

use super::util::print_json;
use crate::ConfigCommand;
use idrecon::config_validate::{validate_config_file, Severity};
use idrecon::{Config, Error, ReconciliationReport, Result};
use std::path::Path;

pub fn cmd_config(path: &Path, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Check { json } => cmd_check(path, json),
        ConfigCommand::Schema { name } => match name.as_str() {
            "config" => print_schema::<Config>(),
            "report" => print_schema::<ReconciliationReport>(),
            _ => Err(format!("Unknown schema: {}. Use 'config' or 'report'.", name).into()),
        },
        ConfigCommand::Init { force } => cmd_init(path, force),
    }
}

fn cmd_check(path: &Path, json: bool) -> Result<()> {
    let result = validate_config_file(path);

    if json {
        let output = serde_json::json!({
            "valid": !result.has_errors(),
            "errors": result.error_count(),
            "warnings": result.warning_count(),
            "issues": result.issues,
        });
        print_json(&output)?;
    } else if result.issues.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for issue in &result.issues {
            let (prefix, level) = match issue.severity {
                Severity::Error => ("✗", "ERROR"),
                Severity::Warning => ("⚠", "WARN"),
            };
            println!("{} [{}] {}: {}", prefix, issue.code, level, issue.message);
        }

        println!();
        if result.has_errors() {
            println!(
                "✗ {} error(s), {} warning(s)",
                result.error_count(),
                result.warning_count()
            );
        } else {
            println!("✓ {} warning(s) (no errors)", result.warning_count());
        }
    }

    if result.has_errors() {
        return Err(Error::Config("Configuration validation failed".into()));
    }
    Ok(())
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    std::fs::write(path, Config::default().to_yaml()?)?;
    println!("Written to: {}", path.display());
    Ok(())
}

fn print_schema<T: schemars::JsonSchema>() -> Result<()> {
    let schema = schemars::schema_for!(T);
    print_json(&schema)
}
