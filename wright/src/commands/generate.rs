// wright/src/commands/generate.rs
//
// USE CASE: Generate the four-layer DDL bundle of every selected mart.

use comfy_table::{Table, presets::UTF8_FULL};
use std::path::PathBuf;
use tracing::debug;

use wright_core::application::{PipelineBundle, bundle_dir, export_bundle, generate_all, load_project};
use wright_core::infrastructure::config::MartDiscovery;

pub async fn execute(
    project_dir: PathBuf,
    select: Option<String>,
    summary: bool,
    stdout: bool,
) -> anyhow::Result<()> {
    let (project, marts) = load_project(&MartDiscovery, &project_dir, select.as_deref())?;

    if !stdout {
        println!("🏗️  Generating {} mart(s) for project '{}'...", marts.len(), project.name);
    }

    let work = marts.into_iter().map(|mart| (mart.config, mart.inputs)).collect();
    let results = generate_all(work).await;

    let mut failures = 0;
    for (name, result) in results {
        let bundle = match result {
            Ok(bundle) => bundle,
            Err(e) => {
                eprintln!("❌ {}: {}", name, e);
                failures += 1;
                continue;
            }
        };

        for warning in &bundle.warnings {
            eprintln!("⚠️  {} [{}] {}", name, warning.layer(), warning);
        }
        if project.strict && !bundle.warnings.is_empty() {
            eprintln!("❌ {}: {} warning(s) in strict mode", name, bundle.warnings.len());
            failures += 1;
            continue;
        }

        if stdout {
            for object in &bundle.objects {
                print!("{}", object.ddl_text);
                println!();
            }
        } else if summary {
            print_summary(&bundle);
        } else {
            let out_dir = bundle_dir(&project_dir, &project.target_path, &bundle.project_name);
            let manifest = export_bundle(&bundle, &out_dir)?;
            debug!(mart = %name, steps = ?bundle.deploy_order(), "Deploy order written");
            println!(
                "   ✅ {} -> {} ({} objects, checksum {})",
                name,
                out_dir.display(),
                manifest.steps.len(),
                &manifest.checksum[..12.min(manifest.checksum.len())]
            );
        }
    }

    if failures > 0 {
        eprintln!("💥 {} mart(s) failed.", failures);
        std::process::exit(1);
    }

    if !stdout {
        println!("✨ Generation complete.");
    }
    Ok(())
}

fn print_summary(bundle: &PipelineBundle) {
    println!("📦 {}", bundle.project_name);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Layer", "Object", "Columns"]);
    for (i, object) in bundle.summary().iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            object.layer.to_string(),
            object.qualified_name.clone(),
            object.column_list.join(", "),
        ]);
    }
    println!("{table}");
}
