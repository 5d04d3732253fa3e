// wright-core/src/application/baseline.rs
//
// Compares a generated bundle against hand-maintained or previously exported
// DDL. A layer that cannot be compared never blocks the other three.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::application::export::file_name;
use crate::application::pipeline::PipelineBundle;
use crate::domain::diff::{DiffResult, compare};
use crate::domain::mart::{GeneratedObject, Layer};
use crate::error::WrightError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerComparison {
    Compared { diff: DiffResult },
    NoBaseline,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDiff {
    pub layer: Layer,
    pub qualified_name: String,
    #[serde(flatten)]
    pub comparison: LayerComparison,
}

impl LayerDiff {
    pub fn is_breaking(&self) -> bool {
        matches!(&self.comparison, LayerComparison::Compared { diff } if diff.is_breaking)
    }
}

/// Candidate baseline files for one object, most specific first.
fn candidates(dir: &Path, object: &GeneratedObject) -> Vec<PathBuf> {
    vec![
        dir.join(format!("{}.sql", object.qualified_name)),
        dir.join(file_name(object)),
        dir.join(format!("{}.sql", object.layer.suffix())),
    ]
}

/// Reads the baseline DDL of every layer that has one in `dir`.
pub fn load_baselines(
    dir: &Path,
    bundle: &PipelineBundle,
) -> Result<BTreeMap<Layer, String>, WrightError> {
    let mut baselines = BTreeMap::new();
    for object in &bundle.objects {
        if let Some(path) = candidates(dir, object).into_iter().find(|p| p.is_file()) {
            debug!(layer = %object.layer, path = ?path, "Baseline found");
            baselines.insert(object.layer, fs::read_to_string(&path)?);
        }
    }
    Ok(baselines)
}

pub fn diff_bundle(bundle: &PipelineBundle, baselines: &BTreeMap<Layer, String>) -> Vec<LayerDiff> {
    bundle
        .objects
        .iter()
        .map(|object| {
            let comparison = match baselines.get(&object.layer) {
                None => LayerComparison::NoBaseline,
                Some(baseline) => match compare(object.layer, &object.ddl_text, baseline) {
                    Ok(diff) => LayerComparison::Compared { diff },
                    Err(e) => {
                        warn!(layer = %object.layer, error = %e, "Layer comparison aborted");
                        LayerComparison::Failed {
                            reason: e.to_string(),
                        }
                    }
                },
            };
            LayerDiff {
                layer: object.layer,
                qualified_name: object.qualified_name.clone(),
                comparison,
            }
        })
        .collect()
}
