use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strata_core::errors::StrataError;
use strata_core::{ensure_unique_ids, stratify, SampleSizePlan, Stratified};
use strata_io::{
    commit_all, ensure_writable, merge_reserve, read_all, read_sample, stage_bytes, stage_sample,
    CsvSource, MergedSample, RecordSource, SampleRow,
};
use strata_sampler::{validate_sample, Identity, Reprojector, SpatialSampler};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::manifest::{RunManifest, MANIFEST_SCHEMA};
use crate::serde::to_canonical_json_pretty;

/// Population counts gathered before sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    /// Records read across all sources.
    pub records_read: usize,
    /// Records dropped by the source allow-list.
    pub rejected_source: usize,
    /// Records dropped for lacking a stratum label.
    pub missing_label: usize,
    /// Eligible records in retained strata.
    pub eligible: usize,
    /// Sample size plan.
    pub plan: SampleSizePlan,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Counts and plan from the preparation stage.
    pub report: PlanReport,
    /// Rows drawn in this run.
    pub drawn: usize,
    /// Rows carried from the reserve sample.
    pub reserve_rows: usize,
    /// Rows removed by reserve deduplication.
    pub duplicates_dropped: usize,
    /// Written sample file.
    pub output: PathBuf,
    /// Written manifest file.
    pub manifest: PathBuf,
}

fn prepare(config: &RunConfig) -> Result<(PlanReport, Stratified), StrataError> {
    let sources: Vec<CsvSource> = config.source_specs().into_iter().map(CsvSource::new).collect();
    let handles: Vec<&dyn RecordSource> = sources.iter().map(|s| s as &dyn RecordSource).collect();
    let records = read_all(&handles)?;
    let records_read = records.len();
    info!(sources = sources.len(), records = records_read, "read sources");

    let eligibility = config.eligibility.partition(records);
    if eligibility.missing_label > 0 {
        warn!(
            count = eligibility.missing_label,
            "dropped records without a stratum label"
        );
    }
    info!(
        eligible = eligibility.eligible.len(),
        rejected_source = eligibility.rejected_source,
        missing_label = eligibility.missing_label,
        "applied eligibility filter"
    );
    ensure_unique_ids(&eligibility.eligible)?;

    let stratified = stratify(eligibility.eligible, &config.policy)?;
    for (label, population) in stratified.plan.excluded() {
        info!(stratum = %label, population, "stratum below minimum population");
    }
    info!(
        strata = stratified.plan.targets.len(),
        total_target = stratified.plan.total_target(),
        "computed sample size plan"
    );
    let report = PlanReport {
        records_read,
        rejected_source: eligibility.rejected_source,
        missing_label: eligibility.missing_label,
        eligible: stratified.records.len(),
        plan: stratified.plan.clone(),
    };
    Ok((report, stratified))
}

/// Computes the sample size plan without drawing or writing anything.
pub fn plan_only(config: &RunConfig) -> Result<PlanReport, StrataError> {
    config.validate()?;
    prepare(config).map(|(report, _)| report)
}

/// Runs the full pipeline with the given sampler and reprojection.
///
/// Output is all-or-nothing: the sample and its manifest are staged first and
/// only moved into place once both are complete.
pub fn run(
    config: &RunConfig,
    sampler: &dyn SpatialSampler,
    projector: &dyn Reprojector,
) -> Result<RunSummary, StrataError> {
    config.validate()?;
    let output = config.output_path();
    let manifest_path = config.manifest_path();
    ensure_writable(&output, config.overwrite)?;
    ensure_writable(&manifest_path, config.overwrite)?;

    let (report, stratified) = prepare(config)?;
    let population = projector.forward_all(stratified.records)?;
    let plan = &stratified.plan;

    let selected = sampler.draw(&population, plan, &config.stratum_field, config.seed)?;
    validate_sample(&population, plan, &selected)?;
    info!(sampler = sampler.name(), drawn = selected.len(), "drew sample");

    let mut drawn_per_stratum: BTreeMap<_, usize> = BTreeMap::new();
    let mut rows = Vec::with_capacity(selected.len());
    for record in &selected {
        let Some(row) = SampleRow::from_record(record) else {
            continue;
        };
        *drawn_per_stratum.entry(row.stratum.clone()).or_insert(0) += 1;
        let row = if config.keep_coordinates {
            row.with_position(projector.inverse(record.position)?)
        } else {
            row
        };
        rows.push(row);
    }

    let merged = match (&config.reserve, config.reserve_path()) {
        (Some(reserve), Some(path)) => {
            let mut prior = read_sample(&path, &config.stratum_field)?;
            if !config.keep_coordinates {
                for row in &mut prior {
                    row.position = None;
                }
            }
            info!(path = %path.display(), rows = prior.len(), "read reserve sample");
            let merged = merge_reserve(rows, prior, reserve.policy);
            if !merged.duplicate_ids.is_empty() {
                warn!(
                    repeated = merged.duplicate_ids.len(),
                    dropped = merged.duplicates_dropped,
                    "identifiers occur in both the draw and the reserve"
                );
            }
            merged
        }
        _ => MergedSample {
            drawn: rows.len(),
            rows,
            reserve: 0,
            duplicate_ids: Vec::new(),
            duplicates_dropped: 0,
        },
    };

    let manifest = RunManifest {
        schema_version: MANIFEST_SCHEMA,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        config_hash: config.config_hash()?,
        sampler: sampler.name().to_string(),
        seed: config.seed,
        stratum_field: config.stratum_field.clone(),
        plan: plan.clone(),
        drawn: drawn_per_stratum,
        reserve_rows: merged.reserve,
        duplicate_ids: merged.duplicate_ids.clone(),
        duplicates_dropped: merged.duplicates_dropped,
        tool_versions: BTreeMap::from([(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )]),
    };
    let staged_sample = stage_sample(&output, &config.stratum_field, &merged.rows)?;
    let staged_manifest = stage_bytes(&manifest_path, &to_canonical_json_pretty(&manifest)?)?;
    commit_all(vec![staged_sample, staged_manifest], config.overwrite)?;
    info!(
        path = %output.display(),
        rows = merged.rows.len(),
        "wrote sample"
    );

    Ok(RunSummary {
        report,
        drawn: merged.drawn,
        reserve_rows: merged.reserve,
        duplicates_dropped: merged.duplicates_dropped,
        output,
        manifest: manifest_path,
    })
}

/// Runs the pipeline with the configured sampler and no reprojection.
pub fn run_from_config(config: &RunConfig) -> Result<RunSummary, StrataError> {
    let sampler = config.sampler.build();
    run(config, sampler.as_ref(), &Identity)
}
