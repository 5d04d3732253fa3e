// wright-core/src/ports/mod.rs

pub mod metadata;

pub use metadata::MetadataSource;
