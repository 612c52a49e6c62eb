use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, StrataError};
use crate::{Record, StratumLabel};

/// Sampling fraction applied to every eligible stratum.
pub const DEFAULT_FRACTION: f64 = 0.10;
/// Smallest stratum population that is still sampled.
pub const DEFAULT_MIN_POPULATION: usize = 100;

/// Relative slack under which `population * fraction` counts as an integer.
const INTEGRAL_TOLERANCE: f64 = 1e-9;

fn default_fraction() -> f64 {
    DEFAULT_FRACTION
}

fn default_min_population() -> usize {
    DEFAULT_MIN_POPULATION
}

/// Fraction and threshold governing per-stratum sample sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePolicy {
    /// Share of each stratum to draw, in `(0, 1]`.
    #[serde(default = "default_fraction")]
    pub fraction: f64,
    /// Strata with fewer eligible records are dropped entirely.
    #[serde(default = "default_min_population")]
    pub min_population: usize,
}

impl Default for SamplePolicy {
    fn default() -> Self {
        Self {
            fraction: DEFAULT_FRACTION,
            min_population: DEFAULT_MIN_POPULATION,
        }
    }
}

impl SamplePolicy {
    /// Rejects fractions outside `(0, 1]` and a zero threshold.
    pub fn validate(&self) -> Result<(), StrataError> {
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(StrataError::InvalidInput(
                ErrorInfo::new("policy_fraction", "sampling fraction must lie in (0, 1]")
                    .with_context("fraction", self.fraction.to_string()),
            ));
        }
        if self.min_population == 0 {
            return Err(StrataError::InvalidInput(ErrorInfo::new(
                "policy_min_population",
                "minimum population must be at least 1",
            )));
        }
        Ok(())
    }

    /// Returns `ceil(population * fraction)`.
    ///
    /// Products within an absolute `1e-9` of an integer are snapped to it, so
    /// `70 * 0.1` yields 7 rather than 8.
    pub fn target_for(&self, population: usize) -> usize {
        let raw = population as f64 * self.fraction;
        let nearest = raw.round();
        if (raw - nearest).abs() <= INTEGRAL_TOLERANCE {
            nearest as usize
        } else {
            raw.ceil() as usize
        }
    }
}

/// Per-stratum target draw counts for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSizePlan {
    /// Fraction the targets were computed with.
    pub fraction: f64,
    /// Threshold the strata were filtered with.
    pub min_population: usize,
    /// Population count of every labeled stratum, retained or not.
    pub populations: BTreeMap<StratumLabel, usize>,
    /// Target counts of the retained strata.
    pub targets: BTreeMap<StratumLabel, usize>,
}

impl SampleSizePlan {
    /// Returns the target count for a stratum, if it was retained.
    pub fn target(&self, label: &StratumLabel) -> Option<usize> {
        self.targets.get(label).copied()
    }

    /// Returns true when the stratum was retained.
    pub fn contains(&self, label: &StratumLabel) -> bool {
        self.targets.contains_key(label)
    }

    /// Sum of all targets.
    pub fn total_target(&self) -> usize {
        self.targets.values().sum()
    }

    /// Strata dropped for falling below the threshold, with their populations.
    pub fn excluded(&self) -> impl Iterator<Item = (&StratumLabel, usize)> + '_ {
        self.populations
            .iter()
            .filter(|(label, _)| !self.targets.contains_key(*label))
            .map(|(label, count)| (label, *count))
    }
}

/// A plan together with the records of its retained strata.
#[derive(Debug, Clone, PartialEq)]
pub struct Stratified {
    /// Sample size plan.
    pub plan: SampleSizePlan,
    /// Records belonging to retained strata, in input order.
    pub records: Vec<Record>,
}

/// Counts records per stratum label.
///
/// Fails with `InvalidInput` listing every record that carries no label.
pub fn population_counts(records: &[Record]) -> Result<BTreeMap<StratumLabel, usize>, StrataError> {
    let unlabeled: Vec<&str> = records
        .iter()
        .filter(|record| record.stratum.is_none())
        .map(|record| record.id.as_str())
        .collect();
    if !unlabeled.is_empty() {
        return Err(StrataError::InvalidInput(
            ErrorInfo::new("missing_label", "records lack a stratum label")
                .with_context("count", unlabeled.len().to_string())
                .with_ids("records", unlabeled)
                .with_hint("filter unlabeled records before computing the plan"),
        ));
    }
    let mut counts = BTreeMap::new();
    for label in records.iter().filter_map(|record| record.stratum.as_ref()) {
        *counts.entry(label.clone()).or_insert(0usize) += 1;
    }
    Ok(counts)
}

/// Builds the plan from precomputed population counts.
pub fn plan_from_counts(
    populations: BTreeMap<StratumLabel, usize>,
    policy: &SamplePolicy,
) -> Result<SampleSizePlan, StrataError> {
    policy.validate()?;
    if populations.values().all(|count| *count == 0) {
        return Err(StrataError::EmptyPopulation(ErrorInfo::new(
            "empty_population",
            "no eligible records to stratify",
        )));
    }
    let targets: BTreeMap<StratumLabel, usize> = populations
        .iter()
        .map(|(label, count)| (label.clone(), *count, policy.target_for(*count)))
        .filter(|(_, count, _)| *count >= policy.min_population)
        .map(|(label, _, target)| (label, target))
        .collect();
    if targets.is_empty() {
        let largest = populations.values().copied().max().unwrap_or(0);
        return Err(StrataError::EmptyPopulation(
            ErrorInfo::new(
                "no_eligible_stratum",
                "no stratum reaches the minimum population",
            )
            .with_context("min_population", policy.min_population.to_string())
            .with_context("largest_stratum", largest.to_string())
            .with_context("strata", populations.len().to_string()),
        ));
    }
    Ok(SampleSizePlan {
        fraction: policy.fraction,
        min_population: policy.min_population,
        populations,
        targets,
    })
}

/// Computes the sample size plan for a labeled record collection.
pub fn compute_plan(
    records: &[Record],
    policy: &SamplePolicy,
) -> Result<SampleSizePlan, StrataError> {
    plan_from_counts(population_counts(records)?, policy)
}

/// Computes the plan and restricts the records to the retained strata.
pub fn stratify(records: Vec<Record>, policy: &SamplePolicy) -> Result<Stratified, StrataError> {
    let plan = compute_plan(&records, policy)?;
    let records = records
        .into_iter()
        .filter(|record| {
            record
                .stratum
                .as_ref()
                .is_some_and(|label| plan.contains(label))
        })
        .collect();
    Ok(Stratified { plan, records })
}
