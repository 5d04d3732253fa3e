// wright-core/src/domain/mod.rs

pub mod compiler;
pub mod diff;
pub mod error;
pub mod generator;
pub mod mart;
pub mod ports;
pub mod project;
pub mod resolver;
pub mod validation;

pub use error::DomainError;
