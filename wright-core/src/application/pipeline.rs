// wright-core/src/application/pipeline.rs
//
// Fixed four-stage orchestration: VW_1 -> DT_2 -> DT_3A -> DT_3. Either the
// whole bundle is produced or nothing is.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::application::store::ConfigStore;
use crate::domain::error::DomainError;
use crate::domain::generator::{
    GenerationWarning, data_mart, granularity, pre_aggregation, translation,
};
use crate::domain::mart::{GeneratedObject, GenerationInputs, Layer, MartConfig, ObjectSummary};
use crate::domain::ports::{MartDefinition, MartLoader};
use crate::domain::project::ProjectConfig;
use crate::domain::resolver::IdSourceResolver;
use crate::domain::validation;
use crate::error::WrightError;
use crate::infrastructure::config::load_project_config;

const GENERATION_CONCURRENCY: usize = 8;

/// Deployment bundle: the four objects in dependency order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineBundle {
    pub project_name: String,
    pub objects: Vec<GeneratedObject>,
    pub warnings: Vec<GenerationWarning>,
    /// SHA-256 over the ordered DDL texts.
    pub checksum: String,
}

impl PipelineBundle {
    pub fn object(&self, layer: Layer) -> Option<&GeneratedObject> {
        self.objects.iter().find(|o| o.layer == layer)
    }

    pub fn summary(&self) -> Vec<ObjectSummary> {
        self.objects.iter().map(GeneratedObject::summary).collect()
    }

    pub fn deploy_order(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.qualified_name.as_str()).collect()
    }
}

pub fn bundle_checksum(objects: &[GeneratedObject]) -> String {
    let mut hasher = Sha256::new();
    for object in objects {
        hasher.update(object.ddl_text.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[instrument(skip_all, fields(project = %config.project_name))]
pub fn generate(config: &MartConfig, inputs: &GenerationInputs) -> Result<PipelineBundle, WrightError> {
    let checks = validation::validate(config);
    if !checks.is_valid() {
        return Err(DomainError::InvalidConfig {
            layer: "pipeline".to_string(),
            reason: checks.errors().join("; "),
        }
        .into());
    }

    let resolver = IdSourceResolver::for_config(config);
    let vw = translation::generate(config, &resolver, inputs)?;
    let dt2 = granularity::generate(config, &vw, inputs)?;
    let dt3a = pre_aggregation::generate(config, &dt2)?;
    let dt3 = data_mart::generate(config, &dt3a)?;

    let mut warnings = vw.warnings;
    warnings.extend(dt2.warnings);
    warnings.extend(dt3a.warnings);
    for warning in &warnings {
        warn!(layer = %warning.layer(), "{}", warning);
    }

    let objects = vec![vw.object, dt2.object, dt3a.object, dt3.object];
    let checksum = bundle_checksum(&objects);
    info!(objects = objects.len(), warnings = warnings.len(), checksum = %checksum, "Bundle generated");

    Ok(PipelineBundle {
        project_name: config.project_name.clone(),
        objects,
        warnings,
        checksum,
    })
}

pub fn generate_from_store(
    store: &ConfigStore,
    name: &str,
    inputs: &GenerationInputs,
) -> Result<PipelineBundle, WrightError> {
    let config = store.get(name)?;
    generate(&config, inputs)
}

/// Generates every config on the blocking pool, at most
/// `GENERATION_CONCURRENCY` at a time. Results come back sorted by project
/// name; one failing config does not affect the others.
pub async fn generate_all(
    marts: Vec<(MartConfig, GenerationInputs)>,
) -> Vec<(String, Result<PipelineBundle, WrightError>)> {
    let futures = marts.into_iter().map(|(config, inputs)| async move {
        let name = config.project_name.clone();
        let result = tokio::task::spawn_blocking(move || generate(&config, &inputs))
            .await
            .unwrap_or_else(|e| {
                Err(WrightError::InternalError(format!("Generation task failed: {}", e)))
            });
        (name, result)
    });

    let mut results: Vec<_> = futures::stream::iter(futures)
        .buffer_unordered(GENERATION_CONCURRENCY)
        .collect()
        .await;
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

/// Loads the project file and its mart definitions, optionally narrowed to
/// one mart (case-insensitive).
pub fn load_project<M: MartLoader>(
    loader: &M,
    project_dir: &Path,
    select: Option<&str>,
) -> Result<(ProjectConfig, Vec<MartDefinition>), WrightError> {
    let project = load_project_config(project_dir)?;
    let mut marts = loader.load(project_dir, &project)?;

    if let Some(selected) = select {
        let key = crate::domain::mart::config_key(selected);
        marts.retain(|m| m.config.key() == key);
        if marts.is_empty() {
            return Err(DomainError::ConfigNotFound(selected.to_string()).into());
        }
    }
    Ok((project, marts))
}
