// wright-core/src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProjectConfig {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(rename = "mart-paths", default = "default_mart_paths")]
    pub mart_paths: Vec<String>,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(rename = "clean-targets", default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    /// Applied to marts that leave `target_database` empty.
    #[serde(rename = "target-database", default)]
    pub target_database: String,

    #[serde(rename = "target-schema", default)]
    pub target_schema: String,

    /// Generation warnings fail the run.
    #[serde(default)]
    pub strict: bool,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            mart_paths: default_mart_paths(),
            target_path: default_target_path(),
            clean_targets: default_clean_targets(),
            target_database: String::new(),
            target_schema: String::new(),
            strict: false,
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}
fn default_mart_paths() -> Vec<String> {
    vec!["marts".to_string()]
}
fn default_clean_targets() -> Vec<String> {
    vec!["target".to_string()]
}
fn default_target_path() -> String {
    "target".to_string()
}
