// wright-core/src/domain/mart/layer.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::MartConfig;

/// The four objects of a mart pipeline, in dependency order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    TranslationView,
    GranularityTable,
    PreAggregation,
    DataMart,
}

impl Layer {
    pub const ORDERED: [Layer; 4] = [
        Layer::TranslationView,
        Layer::GranularityTable,
        Layer::PreAggregation,
        Layer::DataMart,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Layer::TranslationView => "VW_1",
            Layer::GranularityTable => "DT_2",
            Layer::PreAggregation => "DT_3A",
            Layer::DataMart => "DT_3",
        }
    }

    /// Warehouse object kind used in the CREATE statement.
    pub fn object_kind(&self) -> &'static str {
        match self {
            Layer::TranslationView => "VIEW",
            _ => "TABLE",
        }
    }

    /// 1-based deployment position.
    pub fn position(&self) -> usize {
        match self {
            Layer::TranslationView => 1,
            Layer::GranularityTable => 2,
            Layer::PreAggregation => 3,
            Layer::DataMart => 4,
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Layer> {
        let upper = suffix.trim().to_uppercase();
        Layer::ORDERED.into_iter().find(|l| l.suffix() == upper)
    }

    pub fn qualified_name(&self, config: &MartConfig) -> String {
        let object = format!(
            "{}_{}",
            config.project_name.trim().to_uppercase(),
            self.suffix()
        );
        [
            config.target_database.trim(),
            config.target_schema.trim(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| part.to_uppercase())
        .chain(std::iter::once(object))
        .collect::<Vec<_>>()
        .join(".")
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Layer::TranslationView => "translation_view",
            Layer::GranularityTable => "granularity_table",
            Layer::PreAggregation => "pre_aggregation",
            Layer::DataMart => "data_mart",
        };
        write!(f, "{} ({})", label, self.suffix())
    }
}

/// One generated warehouse object. Produced on demand, never persisted
/// unless exported.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneratedObject {
    pub layer: Layer,
    pub qualified_name: String,
    pub ddl_text: String,
    pub columns: Vec<String>,
}

impl GeneratedObject {
    pub fn summary(&self) -> ObjectSummary {
        ObjectSummary {
            layer: self.layer,
            qualified_name: self.qualified_name.clone(),
            column_list: self.columns.clone(),
        }
    }
}

/// Summary mode output: names and columns without DDL text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ObjectSummary {
    pub layer: Layer,
    pub qualified_name: String,
    pub column_list: Vec<String>,
}
