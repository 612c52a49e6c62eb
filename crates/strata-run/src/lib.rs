#![deny(missing_docs)]
#![doc = "Configuration, pipeline and manifest for stratified sampling runs."]

/// YAML run configuration.
pub mod config;
/// Canonical hashing helpers.
pub mod hash;
pub mod manifest;
/// The single parameterised sampling pipeline.
pub mod pipeline;
/// Canonical JSON and YAML serde helpers.
pub mod serde;

pub use config::{load_config, ReserveSpec, RunConfig, SamplerSpec};
pub use manifest::{RunManifest, SchemaVersion, MANIFEST_SCHEMA};
pub use pipeline::{plan_only, run, run_from_config, PlanReport, RunSummary};
