// wright-core/src/infrastructure/config/mod.rs

pub mod marts;
pub mod project;

pub use crate::domain::project::ProjectConfig;
pub use marts::MartDiscovery;
pub use project::load_project_config;
