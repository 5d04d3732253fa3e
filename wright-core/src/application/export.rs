// wright-core/src/application/export.rs
//
// Writes a bundle to disk: one SQL file per layer, numbered in deployment
// order, plus a `deploy_order.json` manifest for downstream executors.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::application::pipeline::PipelineBundle;
use crate::domain::mart::{GeneratedObject, Layer};
use crate::error::WrightError;
use crate::infrastructure::fs::atomic_write;

pub const MANIFEST_FILE: &str = "deploy_order.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployStep {
    pub order: usize,
    pub layer: Layer,
    pub qualified_name: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployManifest {
    pub project_name: String,
    pub checksum: String,
    pub generated_at: String,
    pub steps: Vec<DeployStep>,
    pub warnings: Vec<String>,
}

pub fn file_name(object: &GeneratedObject) -> String {
    format!("{:02}_{}.sql", object.layer.position(), object.layer.suffix())
}

pub fn export_bundle(bundle: &PipelineBundle, out_dir: &Path) -> Result<DeployManifest, WrightError> {
    let mut steps = Vec::with_capacity(bundle.objects.len());
    for object in &bundle.objects {
        let file = file_name(object);
        atomic_write(out_dir.join(&file), &object.ddl_text)?;
        steps.push(DeployStep {
            order: object.layer.position(),
            layer: object.layer,
            qualified_name: object.qualified_name.clone(),
            file,
        });
    }

    let manifest = DeployManifest {
        project_name: bundle.project_name.clone(),
        checksum: bundle.checksum.clone(),
        generated_at: Utc::now().to_rfc3339(),
        steps,
        warnings: bundle.warnings.iter().map(|w| w.to_string()).collect(),
    };

    let content = serde_json::to_string_pretty(&manifest)
        .map_err(|e| WrightError::InternalError(format!("Serialization: {}", e)))?;
    atomic_write(out_dir.join(MANIFEST_FILE), content)?;

    info!(project = %bundle.project_name, dir = ?out_dir, "Bundle exported");
    Ok(manifest)
}

/// Export directory of one mart under the project's target path.
pub fn bundle_dir(project_dir: &Path, target_path: &str, project_name: &str) -> PathBuf {
    project_dir
        .join(target_path)
        .join(project_name.trim().to_lowercase())
}
