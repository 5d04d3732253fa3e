// wright-core/src/domain/ports/mod.rs

pub mod mart_loader;

pub use mart_loader::{MartDefinition, MartLoader};
