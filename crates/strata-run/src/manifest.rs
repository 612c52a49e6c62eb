//! Provenance record written next to every sample.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_core::{RecordId, SampleSizePlan, StratumLabel};

/// Semantic version describing the manifest layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for fixes.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Current manifest layout.
pub const MANIFEST_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Everything needed to reproduce or audit a sample file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Manifest layout version.
    pub schema_version: SchemaVersion,
    /// RFC 3339 timestamp of the run.
    pub created_at: String,
    /// SHA-256 of the canonical configuration.
    pub config_hash: String,
    /// Sampler implementation name.
    pub sampler: String,
    /// Master seed.
    pub seed: u64,
    /// Output column holding the stratum.
    pub stratum_field: String,
    /// Sample size plan the draw followed.
    pub plan: SampleSizePlan,
    /// Rows drawn per stratum in this run.
    pub drawn: BTreeMap<StratumLabel, usize>,
    /// Rows carried from the reserve sample.
    pub reserve_rows: usize,
    /// Identifiers present in both the draw and the reserve.
    pub duplicate_ids: Vec<RecordId>,
    /// Rows removed by reserve deduplication.
    pub duplicates_dropped: usize,
    /// Tool versions involved in the run.
    pub tool_versions: BTreeMap<String, String>,
}
