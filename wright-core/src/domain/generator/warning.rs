// wright-core/src/domain/generator/warning.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::mart::Layer;

/// Non-fatal findings. Generation proceeds; the bundle is flagged for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationWarning {
    UnresolvedIdSource {
        raw: String,
        suggestions: Vec<String>,
    },
    CorrectedIdSource {
        raw: String,
        corrected_to: String,
        similarity: f64,
    },
    NoIdSources,
    AmbiguousPattern {
        first: String,
        second: String,
    },
    UnknownJoinKey {
        pattern: String,
        key: String,
    },
    IgnoredExclusionValues {
        count: usize,
    },
}

impl GenerationWarning {
    pub fn layer(&self) -> Layer {
        match self {
            GenerationWarning::UnresolvedIdSource { .. }
            | GenerationWarning::CorrectedIdSource { .. }
            | GenerationWarning::NoIdSources => Layer::TranslationView,
            GenerationWarning::IgnoredExclusionValues { .. } => Layer::GranularityTable,
            GenerationWarning::AmbiguousPattern { .. }
            | GenerationWarning::UnknownJoinKey { .. } => Layer::PreAggregation,
        }
    }
}

impl fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationWarning::UnresolvedIdSource { raw, suggestions } => {
                if suggestions.is_empty() {
                    write!(f, "ID_SOURCE '{}' is unknown; its branch returns NULL", raw)
                } else {
                    write!(
                        f,
                        "ID_SOURCE '{}' is unknown; its branch returns NULL (did you mean: {}?)",
                        raw,
                        suggestions.join(", ")
                    )
                }
            }
            GenerationWarning::CorrectedIdSource {
                raw,
                corrected_to,
                similarity,
            } => write!(
                f,
                "ID_SOURCE '{}' was corrected to '{}' (similarity {:.2})",
                raw, corrected_to, similarity
            ),
            GenerationWarning::NoIdSources => {
                write!(f, "No ID_SOURCE values supplied; RESOLVED_VALUE is always NULL")
            }
            GenerationWarning::AmbiguousPattern { first, second } => write!(
                f,
                "Join patterns '{}' and '{}' share join keys without a distinguishing filter; fact rows may be counted twice",
                first, second
            ),
            GenerationWarning::UnknownJoinKey { pattern, key } => write!(
                f,
                "Join pattern '{}' references '{}', which the granularity table does not produce",
                pattern, key
            ),
            GenerationWarning::IgnoredExclusionValues { count } => write!(
                f,
                "{} exclusion value(s) supplied but has_exclusions is off; they were ignored",
                count
            ),
        }
    }
}
