// wright-core/src/domain/resolver/mod.rs

pub mod id_source;
pub mod similarity;

pub use id_source::{Correction, FUZZY_THRESHOLD, IdSource, IdSourceResolver, Resolution};
