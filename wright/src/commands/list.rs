// wright/src/commands/list.rs
//
// USE CASE: Show what the project would generate.

use comfy_table::{Table, presets::UTF8_FULL};
use std::path::PathBuf;

use wright_core::application::load_project;
use wright_core::domain::mart::Layer;
use wright_core::infrastructure::config::MartDiscovery;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let (project, marts) = load_project(&MartDiscovery, &project_dir, None)?;

    println!("📋 Project '{}' ({} marts)", project.name, marts.len());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Mart", "Report type", "Patterns", "Depth", "Flags", "Data mart"]);

    for mart in &marts {
        let config = &mart.config;
        let mut flags = Vec::new();
        if config.has_sign_change {
            flags.push("sign");
        }
        if config.has_exclusions {
            flags.push("exclusions");
        }
        if config.has_group_filter_precedence {
            flags.push("precedence");
        }

        table.add_row(vec![
            config.project_name.clone(),
            config.report_type.clone(),
            config.join_patterns.len().to_string(),
            config.hierarchy_depth.to_string(),
            flags.join(", "),
            Layer::DataMart.qualified_name(config),
        ]);
    }
    println!("{table}");
    Ok(())
}
