use std::collections::{BTreeMap, HashMap, HashSet};

use strata_core::errors::{ErrorInfo, StrataError};
use strata_core::{Record, SampleSizePlan, StratumLabel};

/// Checks a returned sample against the population it was drawn from.
///
/// Every selected identifier must exist in the population, carry the same
/// stratum there, occur once, and each planned stratum must hold exactly its
/// target count.
pub fn validate_sample(
    population: &[Record],
    plan: &SampleSizePlan,
    selected: &[Record],
) -> Result<(), StrataError> {
    let strata: HashMap<&str, Option<&StratumLabel>> = population
        .iter()
        .map(|record| (record.id.as_str(), record.stratum.as_ref()))
        .collect();
    let mut unknown = Vec::new();
    let mut mismatched = Vec::new();
    let mut repeated = Vec::new();
    let mut seen = HashSet::new();
    let mut counts: BTreeMap<&StratumLabel, usize> = BTreeMap::new();
    for record in selected {
        let id = record.id.as_str();
        match strata.get(id) {
            None => unknown.push(id),
            Some(expected) if *expected != record.stratum.as_ref() => mismatched.push(id),
            Some(_) => {}
        }
        if !seen.insert(id) {
            repeated.push(id);
        }
        if let Some(label) = &record.stratum {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    if !unknown.is_empty() {
        return Err(StrataError::Sampling(
            ErrorInfo::new("unknown_id", "sample contains identifiers outside the population")
                .with_ids("records", unknown),
        ));
    }
    if !mismatched.is_empty() {
        return Err(StrataError::Sampling(
            ErrorInfo::new("stratum_mismatch", "sampled records changed stratum")
                .with_ids("records", mismatched),
        ));
    }
    if !repeated.is_empty() {
        return Err(StrataError::Sampling(
            ErrorInfo::new("repeated_id", "sample selects an identifier twice")
                .with_ids("records", repeated),
        ));
    }
    for (label, target) in &plan.targets {
        let drawn = counts.remove(label).unwrap_or(0);
        if drawn != *target {
            return Err(StrataError::Sampling(
                ErrorInfo::new("count_mismatch", "stratum sample size differs from the plan")
                    .with_context("stratum", label.as_str())
                    .with_context("target", target.to_string())
                    .with_context("drawn", drawn.to_string()),
            ));
        }
    }
    if let Some((label, drawn)) = counts.into_iter().next() {
        return Err(StrataError::Sampling(
            ErrorInfo::new("unplanned_stratum", "sample contains a stratum outside the plan")
                .with_context("stratum", label.as_str())
                .with_context("drawn", drawn.to_string()),
        ));
    }
    Ok(())
}
