// wright/src/commands/validate.rs
//
// USE CASE: Static consistency checks, no generation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use wright_core::application::load_project;
use wright_core::domain::validation::{ValidationReport, validate};
use wright_core::infrastructure::config::MartDiscovery;

use crate::cli::OutputFormat;

pub fn execute(project_dir: PathBuf, select: Option<String>, format: OutputFormat) -> anyhow::Result<()> {
    let (_project, marts) = load_project(&MartDiscovery, &project_dir, select.as_deref())?;

    let reports: BTreeMap<String, ValidationReport> = marts
        .iter()
        .map(|mart| (mart.config.project_name.clone(), validate(&mart.config).report()))
        .collect();
    let all_valid = reports.values().all(|r| r.is_valid);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for (name, report) in &reports {
                let badge = if report.is_valid { "✅" } else { "❌" };
                println!("{} {}", badge, name);
                for error in &report.errors {
                    println!("   ❌ {}", error);
                }
                for warning in &report.warnings {
                    println!("   ⚠️  {}", warning);
                }
            }
        }
    }

    if !all_valid {
        eprintln!("💥 Validation failed.");
        std::process::exit(1);
    }
    Ok(())
}
