// wright-core/src/domain/mart/inputs.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Caller-supplied profile of the mapping data. This is the only row-level
/// information the generator ever sees; sets keep rendering order stable.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GenerationInputs {
    /// Distinct discriminator (ID_SOURCE) values.
    #[serde(default)]
    pub id_sources: BTreeSet<String>,

    /// Mapping IDs removed outright when exclusions are enabled.
    #[serde(default)]
    pub exclusion_values: BTreeSet<String>,

    /// Distinct PRECEDENCE_GROUP values.
    #[serde(default)]
    pub precedence_groups: BTreeSet<u32>,
}

impl GenerationInputs {
    pub fn with_id_sources<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_sources.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_exclusions<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusion_values
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_precedence_groups<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.precedence_groups.extend(values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.id_sources.is_empty()
            && self.exclusion_values.is_empty()
            && self.precedence_groups.is_empty()
    }
}
