// wright-core/src/domain/ports/mart_loader.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::error::DomainError;
use crate::domain::mart::{GenerationInputs, MartConfig};
use crate::domain::project::ProjectConfig;

/// One mart file: the config plus the optional profile of its mapping data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MartDefinition {
    #[serde(flatten)]
    pub config: MartConfig,

    #[serde(default, skip_serializing_if = "GenerationInputs::is_empty")]
    pub inputs: GenerationInputs,

    #[serde(skip)]
    pub path: PathBuf,
}

pub trait MartLoader: Send + Sync {
    fn load(&self, root: &Path, config: &ProjectConfig) -> Result<Vec<MartDefinition>, DomainError>;
}
