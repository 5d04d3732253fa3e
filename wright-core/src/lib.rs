// wright-core/src/lib.rs

// 1. Documentation is enforced module by module for now
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts towards live warehouses (metadata profiling).
pub mod ports;

// 2. Domain (Core logic)
// Mart model, discriminator resolution, the four layer generators,
// validation and structural diffing. Pure: no IO, no infra.
pub mod domain;

// 3. Infrastructure (Adapters)
// YAML loading, mart discovery, DuckDB metadata adapter, filesystem.
pub mod infrastructure;

// 4. Application (Use Cases)
// Config store, pipeline orchestration, export, baseline diff, live discovery.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use wright_core::WrightError;
pub use error::WrightError;
