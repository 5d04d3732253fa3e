// wright-core/src/application/mod.rs

pub mod baseline;
pub mod clean;
pub mod discovery;
pub mod export;
pub mod pipeline;
pub mod store;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use wright_core::application::{generate, ConfigStore, export_bundle};`

pub use baseline::{LayerComparison, LayerDiff, diff_bundle, load_baselines};
pub use clean::clean_project;
pub use discovery::{SourceCheck, discover_inputs, verify_sources};
pub use export::{DeployManifest, bundle_dir, export_bundle};
pub use pipeline::{PipelineBundle, generate, generate_all, generate_from_store, load_project};
pub use store::ConfigStore;
