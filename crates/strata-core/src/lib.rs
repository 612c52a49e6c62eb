#![deny(missing_docs)]
#![doc = "Record model and stratified sample size calculation for strata runs."]

/// Source allow-list and label presence checks.
pub mod eligibility;
pub mod errors;
/// Stratum label extraction from year and date fields.
pub mod label;
/// Stratified sample size calculation.
pub mod plan;
pub mod rng;
mod types;

pub use eligibility::{ensure_unique_ids, Eligibility, EligibilityFilter};
pub use errors::{ErrorInfo, StrataError};
pub use label::LabelSource;
pub use plan::{
    compute_plan, plan_from_counts, population_counts, stratify, SamplePolicy, SampleSizePlan,
    Stratified,
};
pub use rng::{derive_substream_seed, RngHandle};
pub use types::{Position, Record, RecordId, StratumLabel};
