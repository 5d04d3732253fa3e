// wright-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Mart configuration '{0}' already exists")]
    #[diagnostic(
        code(wright::domain::duplicate_config),
        help("Project names are unique (case-insensitive). Delete the existing config first.")
    )]
    DuplicateConfig(String),

    #[error("Mart configuration '{0}' not found")]
    #[diagnostic(code(wright::domain::config_not_found))]
    ConfigNotFound(String),

    #[error(
        "Join pattern '{pattern}' in '{config}' is invalid: {join_keys} join key(s) vs {fact_keys} fact key(s)"
    )]
    #[diagnostic(
        code(wright::domain::invalid_pattern),
        help("join_keys and fact_keys are paired by position and must have the same length.")
    )]
    InvalidPattern {
        config: String,
        pattern: String,
        join_keys: usize,
        fact_keys: usize,
    },

    #[error("Join pattern '{pattern}' already exists in '{config}'")]
    #[diagnostic(code(wright::domain::duplicate_pattern))]
    DuplicatePattern { config: String, pattern: String },

    #[error("Join pattern '{pattern}' not found in '{config}'")]
    #[diagnostic(code(wright::domain::pattern_not_found))]
    PatternNotFound { config: String, pattern: String },

    #[error("Invalid configuration for layer {layer}: {reason}")]
    #[diagnostic(
        code(wright::domain::config),
        help("Fix the mart configuration and regenerate. No DDL was emitted for this layer.")
    )]
    InvalidConfig { layer: String, reason: String },

    #[error("Failed to load mart definitions: {0}")]
    #[diagnostic(
        code(wright::domain::mart_load),
        help("Check the YAML files under the project's mart-paths.")
    )]
    MartLoad(String),

    #[error("Diff aborted for layer {layer}: {reason}")]
    #[diagnostic(
        code(wright::domain::diff),
        help("Only CREATE [OR REPLACE] VIEW/TABLE ... AS <query> statements can be compared.")
    )]
    DiffComparison { layer: String, reason: String },
}
