//! Reconciliation and export commands

use super::util::{print_json, resolve_categories, resolve_services};
use crate::RunArgs;
use idrecon::directory::export_directory;
use idrecon::{Config, DirectoryExporter, Reconciler, Result, RunOptions};
use tracing::info;

pub fn cmd_run(config: &Config, args: RunArgs) -> Result<()> {
    let services = resolve_services(config, args.services)?;
    let categories = resolve_categories(args.categories)?;

    let options = RunOptions {
        services,
        categories,
        skip_export: args.skip_export,
        output: args.output,
    };
    info!(
        services = ?options.services,
        employees = options.categories.employees,
        contractors = options.categories.contractors,
        "starting reconciliation"
    );

    let report = Reconciler::new(config).run(&options)?;

    if args.json {
        print_json(&report)
    } else {
        println!("{}", report.to_report());
        Ok(())
    }
}

pub fn cmd_export(config: &Config, json: bool) -> Result<()> {
    let summary = export_directory(config, &DirectoryExporter::from_config(config))?;

    if json {
        print_json(&summary)
    } else {
        println!(
            "Exported {} users: {} employees, {} contractors",
            summary.total, summary.employees, summary.contractors
        );
        println!("  {}", config.directory.employees_path().display());
        println!("  {}", config.directory.contractors_path().display());
        println!("  {}", config.export_workbook_path().display());
        Ok(())
    }
}
