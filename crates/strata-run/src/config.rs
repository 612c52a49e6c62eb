use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_core::errors::{ErrorInfo, StrataError};
use strata_core::{EligibilityFilter, SamplePolicy};
use strata_io::{ReservePolicy, SourceSpec};
use strata_sampler::{GridBalancedSampler, SimpleRandomSampler, SpatialSampler};

use crate::hash::stable_hash_string;
use crate::serde::from_yaml_slice;

const RESERVED_COLUMNS: &[&str] = &["id", "x", "y"];

fn config_error(code: &str, message: impl Into<String>) -> StrataError {
    StrataError::Config(ErrorInfo::new(code, message))
}

fn default_stratum_field() -> String {
    "year".to_string()
}

/// Which sampler implementation a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SamplerSpec {
    /// Uniform random draw per stratum.
    SimpleRandom,
    /// Grid dispersion heuristic.
    GridBalanced {
        /// Cells per grid axis; derived from the target when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cells_per_axis: Option<usize>,
    },
}

impl Default for SamplerSpec {
    fn default() -> Self {
        SamplerSpec::GridBalanced {
            cells_per_axis: None,
        }
    }
}

impl SamplerSpec {
    /// Instantiates the configured sampler.
    pub fn build(&self) -> Box<dyn SpatialSampler> {
        match *self {
            SamplerSpec::SimpleRandom => Box::new(SimpleRandomSampler),
            SamplerSpec::GridBalanced { cells_per_axis } => {
                Box::new(GridBalancedSampler { cells_per_axis })
            }
        }
    }
}

/// Prior sample carried into the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSpec {
    /// Sample file written by an earlier run.
    pub path: PathBuf,
    /// How repeated identifiers are handled.
    #[serde(default)]
    pub policy: ReservePolicy,
}

/// Immutable description of one sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Input datasets, concatenated in order.
    pub sources: Vec<SourceSpec>,
    /// Destination of the sample CSV.
    pub output: PathBuf,
    /// Master seed handed to the sampler.
    pub seed: u64,
    /// Sampling fraction and minimum stratum population.
    #[serde(default)]
    pub policy: SamplePolicy,
    /// Source/project allow-list.
    #[serde(default)]
    pub eligibility: EligibilityFilter,
    /// Name of the stratum column in the output.
    #[serde(default = "default_stratum_field")]
    pub stratum_field: String,
    /// Sampler implementation.
    #[serde(default)]
    pub sampler: SamplerSpec,
    /// Prior reserve sample; present means it is appended to the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve: Option<ReserveSpec>,
    /// Whether output rows carry `x,y` coordinates.
    #[serde(default)]
    pub keep_coordinates: bool,
    /// Whether an existing output may be replaced.
    #[serde(default)]
    pub overwrite: bool,
    /// Directory relative paths resolve against (ignored when serializing).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl RunConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Checks the fields that serde cannot.
    pub fn validate(&self) -> Result<(), StrataError> {
        if self.sources.is_empty() {
            return Err(config_error("no_sources", "at least one source is required"));
        }
        let field = self.stratum_field.trim();
        if field.is_empty() || RESERVED_COLUMNS.contains(&field) {
            return Err(StrataError::Config(
                ErrorInfo::new("stratum_field", "stratum field name is empty or reserved")
                    .with_context("stratum_field", self.stratum_field.clone()),
            ));
        }
        if let SamplerSpec::GridBalanced {
            cells_per_axis: Some(0),
        } = self.sampler
        {
            return Err(config_error("grid_cells", "cells_per_axis must be at least 1"));
        }
        self.policy.validate()
    }

    /// Source specifications with resolved paths.
    pub fn source_specs(&self) -> Vec<SourceSpec> {
        self.sources
            .iter()
            .map(|spec| spec.resolved(&self.base_dir))
            .collect()
    }

    /// Resolved sample destination.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output)
    }

    /// Resolved manifest destination, next to the sample.
    pub fn manifest_path(&self) -> PathBuf {
        let output = self.output_path();
        let name = output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sample".to_string());
        output.with_file_name(format!("{name}.manifest.json"))
    }

    /// Resolved reserve sample location, when configured.
    pub fn reserve_path(&self) -> Option<PathBuf> {
        self.reserve.as_ref().map(|reserve| self.resolve(&reserve.path))
    }

    /// Deterministic hash of the configuration contents.
    pub fn config_hash(&self) -> Result<String, StrataError> {
        stable_hash_string(self)
    }
}

/// Loads and validates a run configuration from YAML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, StrataError> {
    let config_path = path.as_ref();
    let bytes = fs::read(config_path).map_err(|err| {
        StrataError::Config(
            ErrorInfo::new("config_read", err.to_string())
                .with_context("path", config_path.display().to_string()),
        )
    })?;
    let mut config: RunConfig = from_yaml_slice(&bytes)?;
    config.base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    config.validate()?;
    Ok(config)
}
