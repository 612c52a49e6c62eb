#![deny(missing_docs)]
#![doc = "Pluggable spatially balanced samplers, sample validation and the reprojection seam."]

/// Coordinate frame conversion around the sampling step.
pub mod project;
/// Sampler capability and the bundled implementations.
pub mod sampler;
/// Consistency checks on a returned sample.
pub mod validate;

pub use project::{Identity, Reprojector};
pub use sampler::{GridBalancedSampler, SimpleRandomSampler, SpatialSampler};
pub use validate::validate_sample;
