// wright/src/commands/diff.rs
//
// USE CASE: Compare freshly generated DDL with a baseline (deployed or hand-written).

use comfy_table::{Table, presets::UTF8_FULL};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use wright_core::application::{LayerComparison, LayerDiff, diff_bundle, generate, load_baselines, load_project};
use wright_core::infrastructure::config::MartDiscovery;

use crate::cli::OutputFormat;

pub fn execute(
    project_dir: PathBuf,
    select: Option<String>,
    baseline_dir: PathBuf,
    check: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (_project, marts) = load_project(&MartDiscovery, &project_dir, select.as_deref())?;
    let root = if baseline_dir.is_absolute() {
        baseline_dir
    } else {
        project_dir.join(baseline_dir)
    };

    let mut reports: BTreeMap<String, Vec<LayerDiff>> = BTreeMap::new();
    let mut failures = 0;
    for mart in &marts {
        let bundle = match generate(&mart.config, &mart.inputs) {
            Ok(bundle) => bundle,
            Err(e) => {
                eprintln!("❌ {}: {}", mart.config.project_name, e);
                failures += 1;
                continue;
            }
        };
        let dir = mart_baseline_dir(&root, &mart.config.project_name);
        let baselines = load_baselines(&dir, &bundle)?;
        reports.insert(bundle.project_name.clone(), diff_bundle(&bundle, &baselines));
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for (name, diffs) in &reports {
                println!("🧮 {}", name);
                println!("{}", render_table(diffs));
                for diff in diffs {
                    print_details(diff);
                }
            }
        }
    }

    let breaking: usize = reports
        .values()
        .flatten()
        .filter(|d| d.is_breaking())
        .count();

    if failures > 0 {
        eprintln!("💥 {} mart(s) failed to generate.", failures);
        std::process::exit(1);
    }
    if check && breaking > 0 {
        eprintln!("💥 {} breaking change(s) detected.", breaking);
        std::process::exit(1);
    }
    Ok(())
}

/// `<root>/<mart>/` when it exists, otherwise `<root>` itself.
fn mart_baseline_dir(root: &Path, project_name: &str) -> PathBuf {
    let nested = root.join(project_name.trim().to_lowercase());
    if nested.is_dir() { nested } else { root.to_path_buf() }
}

fn render_table(diffs: &[LayerDiff]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Layer", "Object", "Status", "Similarity", "+Cols", "-Cols", "~Cols"]);
    for diff in diffs {
        let row = match &diff.comparison {
            LayerComparison::Compared { diff: d } => {
                let status = if d.is_breaking {
                    "💥 breaking"
                } else if d.is_identical() {
                    "✅ identical"
                } else {
                    "📝 changed"
                };
                vec![
                    status.to_string(),
                    format!("{:.3}", d.similarity),
                    d.added_columns.len().to_string(),
                    d.removed_columns.len().to_string(),
                    d.modified_columns.len().to_string(),
                ]
            }
            LayerComparison::NoBaseline => placeholder_row("➖ no baseline"),
            LayerComparison::Failed { .. } => placeholder_row("❌ failed"),
        };
        let mut cells = vec![diff.layer.to_string(), diff.qualified_name.clone()];
        cells.extend(row);
        table.add_row(cells);
    }
    table
}

fn placeholder_row(status: &str) -> Vec<String> {
    let mut row = vec![status.to_string()];
    row.extend(std::iter::repeat_n("-".to_string(), 4));
    row
}

fn print_details(diff: &LayerDiff) {
    match &diff.comparison {
        LayerComparison::Compared { diff: d } if !d.is_identical() => {
            for c in &d.removed_columns {
                println!("   [{}] - column {}", diff.layer, c);
            }
            for c in &d.added_columns {
                println!("   [{}] + column {}", diff.layer, c);
            }
            for c in &d.modified_columns {
                println!("   [{}] ~ column {}", diff.layer, c);
            }
            for p in &d.join_changes.removed {
                println!("   [{}] - join {}", diff.layer, p);
            }
            for p in &d.join_changes.added {
                println!("   [{}] + join {}", diff.layer, p);
            }
            for p in &d.where_changes.removed {
                println!("   [{}] - where {}", diff.layer, p);
            }
            for p in &d.where_changes.added {
                println!("   [{}] + where {}", diff.layer, p);
            }
        }
        LayerComparison::Failed { reason } => println!("   [{}] ❌ {}", diff.layer, reason),
        _ => {}
    }
}
