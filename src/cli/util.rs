//! CLI utility helpers

use crate::CategoryArg;
use dialoguer::MultiSelect;
use idrecon::{CategorySelection, Config, Error, Result};
use serde::Serialize;
use std::io::IsTerminal;

/// Whether stdin and stdout are both attached to a terminal
pub fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Multi-select with every option checked initially
pub fn prompt_multiselect(prompt: &str, options: &[String]) -> Result<Vec<usize>> {
    let defaults = vec![true; options.len()];
    MultiSelect::new()
        .with_prompt(prompt)
        .items(options)
        .defaults(&defaults)
        .interact()
        .map_err(|e| Error::Other(format!("Prompt failed: {}", e)))
}

/// Service ids from `--services`, a prompt, or every configured service.
///
/// An empty result means "all services".
pub fn resolve_services(config: &Config, requested: Option<Vec<String>>) -> Result<Vec<String>> {
    match requested {
        Some(ids) if ids.iter().any(|id| id.eq_ignore_ascii_case("all")) => Ok(Vec::new()),
        Some(ids) => Ok(ids.into_iter().map(|id| id.trim().to_string()).collect()),
        None if is_interactive_terminal() && !config.services.is_empty() => {
            let labels: Vec<String> = config
                .services
                .iter()
                .map(|s| format!("{} ({})", s.label, s.id))
                .collect();
            let picked = prompt_multiselect("Services to check", &labels)?;
            if picked.is_empty() {
                return Err("No services selected".into());
            }
            Ok(picked
                .into_iter()
                .map(|idx| config.services[idx].id.clone())
                .collect())
        }
        None => Ok(Vec::new()),
    }
}

/// Directory categories from `--categories`, a prompt, or both.
pub fn resolve_categories(requested: Option<Vec<CategoryArg>>) -> Result<CategorySelection> {
    let selection = match requested {
        Some(args) => categories_from_args(&args),
        None if is_interactive_terminal() => {
            let options = vec!["Сотрудники".to_string(), "ГПХ".to_string()];
            let picked = prompt_multiselect("Directory categories to compare", &options)?;
            CategorySelection {
                employees: picked.contains(&0),
                contractors: picked.contains(&1),
            }
        }
        None => CategorySelection::all(),
    };

    if selection.is_empty() {
        return Err("No directory categories selected".into());
    }
    Ok(selection)
}

pub fn categories_from_args(args: &[CategoryArg]) -> CategorySelection {
    let all = args.contains(&CategoryArg::All);
    CategorySelection {
        employees: all || args.contains(&CategoryArg::Employees),
        contractors: all || args.contains(&CategoryArg::Contractors),
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_from_args() {
        assert_eq!(
            categories_from_args(&[CategoryArg::Employees]),
            CategorySelection {
                employees: true,
                contractors: false
            }
        );
        assert_eq!(categories_from_args(&[CategoryArg::All]), CategorySelection::all());
        assert!(categories_from_args(&[]).is_empty());
    }

    #[test]
    fn test_explicit_services() {
        let config = Config::default();
        assert!(resolve_services(&config, Some(vec!["all".into()]))
            .unwrap()
            .is_empty());
        assert_eq!(
            resolve_services(&config, Some(vec![" kontur".into()])).unwrap(),
            vec!["kontur"]
        );
    }
}
