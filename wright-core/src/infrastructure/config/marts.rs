// wright-core/src/infrastructure/config/marts.rs

use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use validator::Validate;
use walkdir::WalkDir;

use crate::domain::error::DomainError;
use crate::domain::mart::config_key;
use crate::domain::ports::{MartDefinition, MartLoader};
use crate::domain::project::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

/// Finds mart definition files (`*.yml` / `*.yaml`) under the project's mart paths.
pub struct MartDiscovery;

impl MartLoader for MartDiscovery {
    fn load(&self, root: &Path, config: &ProjectConfig) -> Result<Vec<MartDefinition>, DomainError> {
        Self::discover(root, config).map_err(|e| DomainError::MartLoad(e.to_string()))
    }
}

impl MartDiscovery {
    /// Returns definitions sorted by config key. Project-level target
    /// database and schema fill in whatever a mart leaves empty.
    pub fn discover(
        project_dir: &Path,
        config: &ProjectConfig,
    ) -> Result<Vec<MartDefinition>, InfrastructureError> {
        let mut marts: BTreeMap<String, MartDefinition> = BTreeMap::new();

        for mart_path in &config.mart_paths {
            let dir = project_dir.join(mart_path);
            if !dir.exists() {
                warn!(path = ?dir, "Mart path does not exist, skipping");
                continue;
            }

            let walker = WalkDir::new(&dir).follow_links(true).sort_by_file_name();
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path
                    .extension()
                    .is_some_and(|ext| ext == "yml" || ext == "yaml")
                {
                    continue;
                }

                let mut mart = Self::parse_mart_file(path)?;
                Self::apply_project_defaults(&mut mart, config);

                let key = config_key(&mart.config.project_name);
                if let Some(existing) = marts.get(&key) {
                    return Err(InfrastructureError::ConfigError(format!(
                        "Mart '{}' is defined twice ({:?} and {:?})",
                        mart.config.project_name, existing.path, mart.path
                    )));
                }
                debug!(mart = %key, path = ?path, "Mart definition loaded");
                marts.insert(key, mart);
            }
        }

        info!(count = marts.len(), "Mart discovery complete");
        Ok(marts.into_values().collect())
    }

    fn parse_mart_file(path: &Path) -> Result<MartDefinition, InfrastructureError> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mart definition at {:?}", path))?;
        let mut mart: MartDefinition = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse mart definition at {:?}", path))?;

        mart.config.validate().map_err(|e| {
            InfrastructureError::ConfigError(format!("Invalid mart definition at {:?}: {}", path, e))
        })?;

        mart.path = path.to_path_buf();
        Ok(mart)
    }

    fn apply_project_defaults(mart: &mut MartDefinition, project: &ProjectConfig) {
        if mart.config.target_database.trim().is_empty() {
            mart.config.target_database = project.target_database.clone();
        }
        if mart.config.target_schema.trim().is_empty() {
            mart.config.target_schema = project.target_schema.clone();
        }
    }
}
