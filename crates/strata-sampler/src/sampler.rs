use std::collections::BTreeMap;

use rand::seq::{index, SliceRandom};
use strata_core::errors::{ErrorInfo, StrataError};
use strata_core::{Record, RngHandle, SampleSizePlan, StratumLabel};
use tracing::debug;

/// Draws a spatially balanced sample per stratum.
///
/// Implementations receive the eligible records of the retained strata, the
/// plan giving the count per stratum, the name of the stratum field (used in
/// diagnostics) and the run seed. They return exactly the planned number of
/// records for every stratum.
pub trait SpatialSampler {
    /// Name recorded in the run manifest.
    fn name(&self) -> &str;

    /// Selects the sample.
    fn draw(
        &self,
        records: &[Record],
        plan: &SampleSizePlan,
        stratum_field: &str,
        seed: u64,
    ) -> Result<Vec<Record>, StrataError>;
}

fn sampling_error(code: &str, message: impl Into<String>, stratum_field: &str) -> ErrorInfo {
    ErrorInfo::new(code, message).with_context("stratum_field", stratum_field)
}

/// Groups records by stratum after checking them against the plan.
fn group_by_stratum<'a>(
    records: &'a [Record],
    plan: &SampleSizePlan,
    stratum_field: &str,
) -> Result<BTreeMap<StratumLabel, Vec<&'a Record>>, StrataError> {
    let mut groups: BTreeMap<StratumLabel, Vec<&Record>> = BTreeMap::new();
    for record in records {
        let label = record.stratum.as_ref().ok_or_else(|| {
            StrataError::Sampling(
                sampling_error("unlabeled_record", "record has no stratum", stratum_field)
                    .with_context("id", record.id.as_str()),
            )
        })?;
        if !plan.contains(label) {
            return Err(StrataError::Sampling(
                sampling_error(
                    "unplanned_stratum",
                    "record belongs to a stratum outside the plan",
                    stratum_field,
                )
                    .with_context("id", record.id.as_str())
                    .with_context("stratum", label.as_str()),
            ));
        }
        if !record.position.is_finite() {
            return Err(StrataError::Sampling(
                sampling_error("bad_geometry", "record position is not finite", stratum_field)
                    .with_context("id", record.id.as_str()),
            ));
        }
        groups.entry(label.clone()).or_default().push(record);
    }
    for (label, target) in &plan.targets {
        let available = groups.get(label).map_or(0, Vec::len);
        if *target > available {
            return Err(StrataError::Sampling(
                sampling_error(
                    "target_exceeds_population",
                    "stratum has fewer records than its target",
                    stratum_field,
                )
                    .with_context("stratum", label.as_str())
                    .with_context("target", target.to_string())
                    .with_context("available", available.to_string()),
            ));
        }
    }
    Ok(groups)
}

/// Uniform random draw within each stratum, without spatial balancing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRandomSampler;

impl SpatialSampler for SimpleRandomSampler {
    fn name(&self) -> &str {
        "simple-random"
    }

    fn draw(
        &self,
        records: &[Record],
        plan: &SampleSizePlan,
        stratum_field: &str,
        seed: u64,
    ) -> Result<Vec<Record>, StrataError> {
        let groups = group_by_stratum(records, plan, stratum_field)?;
        let mut selected = Vec::with_capacity(plan.total_target());
        for (label, members) in &groups {
            let target = plan.target(label).unwrap_or(0);
            let mut rng = RngHandle::for_stratum(seed, label);
            let picks = index::sample(rng.inner_mut(), members.len(), target);
            selected.extend(picks.iter().map(|idx| members[idx].clone()));
            debug!(stratum = %label, population = members.len(), target, "drew stratum");
        }
        Ok(selected)
    }
}

/// Grid dispersion heuristic.
///
/// Each stratum's bounding box is cut into a square grid; cells are visited
/// in a seeded random order and one point is taken per non-empty cell per
/// pass, so picks spread over space before any cell is used twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridBalancedSampler {
    /// Cells per grid axis. Defaults to `ceil(sqrt(target))` per stratum.
    pub cells_per_axis: Option<usize>,
}

impl GridBalancedSampler {
    /// Creates a sampler with a fixed grid resolution.
    pub fn with_cells(cells_per_axis: usize) -> Self {
        Self {
            cells_per_axis: Some(cells_per_axis),
        }
    }

    fn resolution(&self, target: usize) -> usize {
        self.cells_per_axis
            .unwrap_or_else(|| (target as f64).sqrt().ceil() as usize)
            .max(1)
    }
}

fn cell_of(value: f64, min: f64, max: f64, cells: usize) -> usize {
    let span = max - min;
    if span <= 0.0 {
        return 0;
    }
    (((value - min) / span * cells as f64).floor() as usize).min(cells - 1)
}

impl SpatialSampler for GridBalancedSampler {
    fn name(&self) -> &str {
        "grid-balanced"
    }

    fn draw(
        &self,
        records: &[Record],
        plan: &SampleSizePlan,
        stratum_field: &str,
        seed: u64,
    ) -> Result<Vec<Record>, StrataError> {
        let groups = group_by_stratum(records, plan, stratum_field)?;
        let mut selected = Vec::with_capacity(plan.total_target());
        for (label, members) in &groups {
            let target = plan.target(label).unwrap_or(0);
            let cells = self.resolution(target);
            let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
            let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
            for record in members {
                min_x = min_x.min(record.position.x);
                max_x = max_x.max(record.position.x);
                min_y = min_y.min(record.position.y);
                max_y = max_y.max(record.position.y);
            }
            let mut buckets: BTreeMap<(usize, usize), Vec<&Record>> = BTreeMap::new();
            for record in members {
                let key = (
                    cell_of(record.position.x, min_x, max_x, cells),
                    cell_of(record.position.y, min_y, max_y, cells),
                );
                buckets.entry(key).or_default().push(record);
            }

            let mut rng = RngHandle::for_stratum(seed, label);
            let mut queues: Vec<Vec<&Record>> = buckets.into_values().collect();
            for queue in &mut queues {
                queue.shuffle(rng.inner_mut());
            }
            queues.shuffle(rng.inner_mut());

            let mut taken = 0;
            while taken < target {
                for queue in &mut queues {
                    if taken == target {
                        break;
                    }
                    if let Some(record) = queue.pop() {
                        selected.push((*record).clone());
                        taken += 1;
                    }
                }
                queues.retain(|queue| !queue.is_empty());
            }
            debug!(stratum = %label, population = members.len(), target, cells, "drew stratum");
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{plan_from_counts, Position, SamplePolicy};

    fn grid_population(year: i32, side: usize) -> Vec<Record> {
        let mut records = Vec::new();
        for i in 0..side {
            for j in 0..side {
                records.push(
                    Record::new(
                        format!("{year}-{i}-{j}"),
                        Position::new(i as f64, j as f64),
                    )
                    .with_stratum(StratumLabel::from_year(year)),
                );
            }
        }
        records
    }

    fn plan_for(records: &[Record]) -> SampleSizePlan {
        let mut counts = BTreeMap::new();
        for record in records {
            *counts.entry(record.stratum.clone().unwrap()).or_insert(0) += 1;
        }
        plan_from_counts(counts, &SamplePolicy::default()).unwrap()
    }

    #[test]
    fn cell_index_clamps_to_last_cell() {
        assert_eq!(cell_of(10.0, 0.0, 10.0, 4), 3);
        assert_eq!(cell_of(0.0, 0.0, 10.0, 4), 0);
        assert_eq!(cell_of(5.0, 5.0, 5.0, 4), 0);
    }

    #[test]
    fn grid_draw_covers_every_quadrant() {
        let records = grid_population(2016, 20);
        let plan = plan_for(&records);
        let sample = GridBalancedSampler::with_cells(2)
            .draw(&records, &plan, "year", 11)
            .unwrap();
        assert_eq!(sample.len(), 40);
        let mut quadrants = [0usize; 4];
        for record in &sample {
            let qx = usize::from(record.position.x >= 10.0);
            let qy = usize::from(record.position.y >= 10.0);
            quadrants[qx * 2 + qy] += 1;
        }
        assert_eq!(quadrants, [10, 10, 10, 10]);
    }

    #[test]
    fn target_above_population_is_a_sampling_failure() {
        let records = grid_population(2016, 11);
        let mut plan = plan_for(&records);
        plan.targets.insert(StratumLabel::from_year(2016), 500);
        let err = SimpleRandomSampler
            .draw(&records, &plan, "year", 1)
            .unwrap_err();
        assert_eq!(err.code(), "target_exceeds_population");
    }

    #[test]
    fn records_outside_the_plan_are_rejected() {
        let mut records = grid_population(2016, 11);
        let plan = plan_for(&records);
        records.push(
            Record::new("stray", Position::new(0.0, 0.0))
                .with_stratum(StratumLabel::from_year(1999)),
        );
        let err = GridBalancedSampler::default()
            .draw(&records, &plan, "year", 1)
            .unwrap_err();
        assert!(matches!(err, StrataError::Sampling(_)));
        assert_eq!(err.code(), "unplanned_stratum");
    }
}
