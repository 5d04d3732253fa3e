// wright/src/commands/discover.rs
//
// USE CASE: Profile mapping data in DuckDB and print the `inputs:` block to paste
// into each mart file.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use wright_core::application::{discover_inputs, load_project, verify_sources};
use wright_core::domain::mart::GenerationInputs;
use wright_core::infrastructure::adapters::DuckDBMetadataSource;
use wright_core::infrastructure::config::MartDiscovery;

pub async fn execute(
    project_dir: PathBuf,
    select: Option<String>,
    db_path: String,
    timeout_secs: u64,
    verify: bool,
) -> anyhow::Result<()> {
    let (_project, marts) = load_project(&MartDiscovery, &project_dir, select.as_deref())?;
    let source = DuckDBMetadataSource::new(&db_path)?;
    let timeout = Duration::from_secs(timeout_secs);

    eprintln!("🕵️‍♀️  Profiling {} mart(s) in '{}'...", marts.len(), db_path);

    let mut failures = 0;
    for mart in &marts {
        let name = &mart.config.project_name;

        if verify {
            match verify_sources(&source, &mart.config, timeout).await {
                Ok(checks) => {
                    for check in checks.iter().filter(|c| !c.is_ok()) {
                        eprintln!(
                            "❌ {}: table {} lacks {}",
                            name,
                            check.table,
                            check.missing_columns.join(", ")
                        );
                        failures += 1;
                    }
                }
                Err(e) => {
                    eprintln!("❌ {}: {}", name, e);
                    failures += 1;
                    continue;
                }
            }
        }

        let inputs = match discover_inputs(&source, &mart.config, timeout).await {
            Ok(inputs) => inputs,
            Err(e) => {
                eprintln!("❌ {}: {}", name, e);
                failures += 1;
                continue;
            }
        };

        if !mart.inputs.is_empty() && mart.inputs != inputs {
            eprintln!("⚠️  {}: declared inputs differ from the data in {:?}", name, mart.path);
        }

        let block: BTreeMap<&str, &GenerationInputs> = BTreeMap::from([("inputs", &inputs)]);
        println!("# {}", name);
        print!("{}", serde_yaml::to_string(&block)?);
    }

    if failures > 0 {
        eprintln!("💥 Discovery reported {} problem(s).", failures);
        std::process::exit(1);
    }
    Ok(())
}
