use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use strata_core::errors::{ErrorInfo, StrataError};
use strata_core::{LabelSource, Position, Record};
use tracing::debug;

/// Anything that can produce the raw records of one input dataset.
pub trait RecordSource {
    /// Name used in diagnostics and run summaries.
    fn name(&self) -> &str;

    /// Reads every record of the dataset.
    fn read(&self) -> Result<Vec<Record>, StrataError>;
}

/// Column mapping for a tabular point dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Dataset name used in diagnostics.
    pub name: String,
    /// Location of the CSV file.
    pub path: PathBuf,
    /// Column holding the unique site identifier.
    pub id_column: String,
    /// Column holding the x coordinate (longitude or easting).
    pub x_column: String,
    /// Column holding the y coordinate (latitude or northing).
    pub y_column: String,
    /// Where the stratum label comes from.
    pub label: LabelSource,
    /// Column holding the source/project tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    /// Tag stamped on rows whose tag column is absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_value: Option<String>,
}

impl SourceSpec {
    /// Returns a copy whose relative path is resolved against `base_dir`.
    pub fn resolved(&self, base_dir: &Path) -> Self {
        let mut spec = self.clone();
        if spec.path.is_relative() {
            spec.path = base_dir.join(&spec.path);
        }
        spec
    }
}

/// CSV backed [`RecordSource`].
#[derive(Debug, Clone)]
pub struct CsvSource {
    spec: SourceSpec,
}

struct Columns {
    id: usize,
    x: usize,
    y: usize,
    label: usize,
    source: Option<usize>,
}

impl CsvSource {
    /// Creates a source from its column mapping.
    pub fn new(spec: SourceSpec) -> Self {
        Self { spec }
    }

    /// Returns the column mapping.
    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    fn input_info(&self, code: &str, message: impl Into<String>) -> ErrorInfo {
        ErrorInfo::new(code, message)
            .with_context("source", self.spec.name.clone())
            .with_context("path", self.spec.path.display().to_string())
    }

    fn input_error(&self, code: &str, message: impl Into<String>) -> StrataError {
        StrataError::InputRead(self.input_info(code, message))
    }

    fn column(&self, headers: &StringRecord, name: &str) -> Result<usize, StrataError> {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| {
                let available = headers.iter().collect::<Vec<_>>().join(", ");
                StrataError::InputRead(
                    self.input_info("source_column", "required column is missing")
                        .with_context("column", name)
                        .with_hint(format!("available columns: {available}")),
                )
            })
    }

    fn columns(&self, headers: &StringRecord) -> Result<Columns, StrataError> {
        Ok(Columns {
            id: self.column(headers, &self.spec.id_column)?,
            x: self.column(headers, &self.spec.x_column)?,
            y: self.column(headers, &self.spec.y_column)?,
            label: self.column(headers, self.spec.label.column())?,
            source: match &self.spec.source_column {
                Some(name) => Some(self.column(headers, name)?),
                None => None,
            },
        })
    }

    fn parse_row(&self, row: &StringRecord, columns: &Columns) -> Result<Record, StrataError> {
        let line = row
            .position()
            .map(|pos| pos.line().to_string())
            .unwrap_or_default();
        let id = row.get(columns.id).unwrap_or_default();
        if id.is_empty() {
            return Err(StrataError::InvalidInput(
                ErrorInfo::new("missing_id", "row has no identifier")
                    .with_context("source", self.spec.name.clone())
                    .with_context("line", line),
            ));
        }
        let coordinate = |idx: usize, column: &str| -> Result<f64, StrataError> {
            let raw = row.get(idx).unwrap_or_default();
            raw.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    StrataError::InvalidInput(
                        ErrorInfo::new("bad_coordinate", "coordinate is not a finite number")
                            .with_context("source", self.spec.name.clone())
                            .with_context("line", line.clone())
                            .with_context("id", id)
                            .with_context("column", column)
                            .with_context("value", raw),
                    )
                })
        };
        let position = Position::new(
            coordinate(columns.x, &self.spec.x_column)?,
            coordinate(columns.y, &self.spec.y_column)?,
        );
        let mut record = Record::new(id, position);
        record.stratum = self.spec.label.extract(row.get(columns.label));
        record.source = columns
            .source
            .and_then(|idx| row.get(idx))
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .or_else(|| self.spec.source_value.clone());
        Ok(record)
    }
}

impl RecordSource for CsvSource {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn read(&self) -> Result<Vec<Record>, StrataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(&self.spec.path)
            .map_err(|err| {
                self.input_error("source_open", format!("failed to open dataset: {err}"))
            })?;
        let headers = reader
            .headers()
            .map_err(|err| self.input_error("source_header", format!("unreadable header: {err}")))?
            .clone();
        let columns = self.columns(&headers)?;
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row
                .map_err(|err| self.input_error("source_row", format!("malformed row: {err}")))?;
            records.push(self.parse_row(&row, &columns)?);
        }
        let unlabeled = records.iter().filter(|r| r.stratum.is_none()).count();
        debug!(
            source = %self.spec.name,
            rows = records.len(),
            unlabeled,
            "read dataset"
        );
        Ok(records)
    }
}

/// Reads and concatenates several sources in order.
pub fn read_all(sources: &[&dyn RecordSource]) -> Result<Vec<Record>, StrataError> {
    let mut records = Vec::new();
    for source in sources {
        records.extend(source.read()?);
    }
    Ok(records)
}
