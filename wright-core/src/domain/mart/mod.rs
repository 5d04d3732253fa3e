// wright-core/src/domain/mart/mod.rs

pub mod config;
pub mod inputs;
pub mod layer;

pub use config::{FormulaOp, FormulaRule, JoinPattern, MartConfig, config_key};
pub use inputs::GenerationInputs;
pub use layer::{GeneratedObject, Layer, ObjectSummary};
