use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use strata_core::errors::{ErrorInfo, StrataError};
use strata_core::{LabelSource, Position, Record, RecordId, StratumLabel};
use tempfile::{Builder, NamedTempFile, TempPath};
use tracing::warn;

const ID_COLUMN: &str = "id";
const X_COLUMN: &str = "x";
const Y_COLUMN: &str = "y";

fn output_error(code: &str, path: &Path, err: impl ToString) -> StrataError {
    StrataError::OutputWrite(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn reserve_error(code: &str, path: &Path, message: impl Into<String>) -> StrataError {
    StrataError::InputRead(
        ErrorInfo::new(code, message).with_context("path", path.display().to_string()),
    )
}

/// One selected site, trimmed to what the output file carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    /// Site identifier.
    pub id: RecordId,
    /// Stratum the site was drawn from.
    pub stratum: StratumLabel,
    /// Output-frame coordinates, when they are carried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl SampleRow {
    /// Trims a labeled record to an output row, dropping its coordinates.
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: record.id.clone(),
            stratum: record.stratum.clone()?,
            position: None,
        })
    }

    /// Keeps the given coordinates on the row.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Output fully written to a temporary sibling of its destination.
///
/// Nothing is visible at the destination until [`StagedOutput::commit`].
#[derive(Debug)]
pub struct StagedOutput {
    target: PathBuf,
    file: NamedTempFile,
}

impl StagedOutput {
    /// Destination the output will be moved to.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Moves the staged file onto its destination.
    ///
    /// Without `overwrite` an existing destination is left untouched and the
    /// commit fails.
    pub fn commit(self, overwrite: bool) -> Result<PathBuf, StrataError> {
        let target = self.target;
        let persisted = if overwrite {
            self.file.persist(&target)
        } else {
            self.file.persist_noclobber(&target)
        };
        persisted.map_err(|err| output_error("output_persist", &target, err.error))?;
        Ok(target)
    }

    /// Commits the file, first moving any file it replaces aside.
    fn commit_with_backup(self, overwrite: bool) -> Result<Committed, StrataError> {
        let backup = if overwrite && self.target.is_file() {
            let backup = Builder::new()
                .prefix(".backup")
                .tempfile_in(parent_dir(&self.target))
                .map_err(|err| output_error("output_backup", &self.target, err))?
                .into_temp_path();
            fs::rename(&self.target, &backup)
                .map_err(|err| output_error("output_backup", &self.target, err))?;
            Some(backup)
        } else {
            None
        };
        let target = self.target.clone();
        match self.commit(overwrite) {
            Ok(target) => Ok(Committed { target, backup }),
            Err(err) => {
                Committed { target, backup }.restore_backup();
                Err(err)
            }
        }
    }
}

/// Output moved into place, with the file it replaced.
struct Committed {
    target: PathBuf,
    backup: Option<TempPath>,
}

impl Committed {
    fn restore_backup(self) {
        if let Some(backup) = self.backup {
            if let Err(err) = backup.persist(&self.target) {
                warn!(
                    path = %self.target.display(),
                    error = %err.error,
                    "failed to restore output"
                );
            }
        }
    }

    fn roll_back(self) {
        if self.backup.is_none() {
            if let Err(err) = fs::remove_file(&self.target) {
                warn!(path = %self.target.display(), error = %err, "failed to remove output");
            }
            return;
        }
        self.restore_backup();
    }
}

/// Commits staged outputs as a unit.
///
/// When any commit fails, outputs already in place are removed and the files
/// they replaced are restored.
pub fn commit_all(staged: Vec<StagedOutput>, overwrite: bool) -> Result<(), StrataError> {
    let mut committed = Vec::with_capacity(staged.len());
    for output in staged {
        match output.commit_with_backup(overwrite) {
            Ok(done) => committed.push(done),
            Err(err) => {
                for done in committed.into_iter().rev() {
                    done.roll_back();
                }
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Fails when `path` is a directory, or exists and may not be replaced.
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<(), StrataError> {
    if path.is_dir() {
        return Err(StrataError::OutputWrite(
            ErrorInfo::new("output_is_dir", "destination is a directory")
                .with_context("path", path.display().to_string()),
        ));
    }
    if path.exists() && !overwrite {
        return Err(StrataError::OutputWrite(
            ErrorInfo::new("output_exists", "destination already exists")
                .with_context("path", path.display().to_string())
                .with_hint("remove the file or set `overwrite: true`"),
        ));
    }
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn staging_file(path: &Path) -> Result<NamedTempFile, StrataError> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|err| output_error("output_dir", parent, err))?;
    NamedTempFile::new_in(parent).map_err(|err| output_error("output_stage", path, err))
}

/// Stages raw bytes for `path`.
pub fn stage_bytes(path: &Path, bytes: &[u8]) -> Result<StagedOutput, StrataError> {
    let mut file = staging_file(path)?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|err| output_error("output_stage", path, err))?;
    Ok(StagedOutput {
        target: path.to_path_buf(),
        file,
    })
}

/// Stages the sample CSV for `path`.
///
/// The header is `id,<stratum_field>`, followed by `x,y` when any row carries
/// coordinates.
pub fn stage_sample(
    path: &Path,
    stratum_field: &str,
    rows: &[SampleRow],
) -> Result<StagedOutput, StrataError> {
    let mut file = staging_file(path)?;
    let with_coordinates = rows.iter().any(|row| row.position.is_some());
    {
        let mut writer = WriterBuilder::new().from_writer(file.as_file_mut());
        let mut header = vec![ID_COLUMN, stratum_field];
        if with_coordinates {
            header.extend([X_COLUMN, Y_COLUMN]);
        }
        writer
            .write_record(&header)
            .map_err(|err| output_error("output_header", path, err))?;
        for row in rows {
            let mut fields = vec![row.id.to_string(), row.stratum.to_string()];
            if with_coordinates {
                let (x, y) = match row.position {
                    Some(position) => (position.x.to_string(), position.y.to_string()),
                    None => (String::new(), String::new()),
                };
                fields.extend([x, y]);
            }
            writer
                .write_record(&fields)
                .map_err(|err| output_error("output_row", path, err))?;
        }
        writer
            .flush()
            .map_err(|err| output_error("output_flush", path, err))?;
    }
    Ok(StagedOutput {
        target: path.to_path_buf(),
        file,
    })
}

/// Writes the sample CSV in one step.
pub fn write_sample(
    path: &Path,
    stratum_field: &str,
    rows: &[SampleRow],
    overwrite: bool,
) -> Result<PathBuf, StrataError> {
    ensure_writable(path, overwrite)?;
    stage_sample(path, stratum_field, rows)?.commit(overwrite)
}

/// Reads a sample file written by a previous run.
///
/// Year-like stratum values such as `2016.0` are normalised to the label a
/// fresh draw would carry; anything else is kept verbatim.
pub fn read_sample(path: &Path, stratum_field: &str) -> Result<Vec<SampleRow>, StrataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|err| {
            reserve_error("reserve_open", path, format!("failed to open sample: {err}"))
        })?;
    let labels = LabelSource::year(stratum_field);
    let headers = reader
        .headers()
        .map_err(|err| reserve_error("reserve_header", path, err.to_string()))?
        .clone();
    let find = |name: &str| headers.iter().position(|header| header == name);
    let id_idx = find(ID_COLUMN)
        .ok_or_else(|| reserve_error("reserve_column", path, "sample has no `id` column"))?;
    let stratum_idx = find(stratum_field).ok_or_else(|| {
        reserve_error(
            "reserve_column",
            path,
            format!("sample has no `{stratum_field}` column"),
        )
    })?;
    let coordinates = find(X_COLUMN).zip(find(Y_COLUMN));

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|err| reserve_error("reserve_row", path, err.to_string()))?;
        let id = row.get(id_idx).unwrap_or_default();
        let stratum = row.get(stratum_idx).unwrap_or_default();
        if id.is_empty() || stratum.is_empty() {
            let line = row.position().map(|pos| pos.line()).unwrap_or_default();
            return Err(StrataError::InvalidInput(
                ErrorInfo::new("reserve_row", "sample row lacks an identifier or stratum")
                    .with_context("path", path.display().to_string())
                    .with_context("line", line.to_string()),
            ));
        }
        let position = coordinates.and_then(|(x_idx, y_idx)| {
            let x = row.get(x_idx)?.parse().ok()?;
            let y = row.get(y_idx)?.parse().ok()?;
            Some(Position::new(x, y))
        });
        rows.push(SampleRow {
            id: RecordId::new(id),
            stratum: labels
                .extract(Some(stratum))
                .unwrap_or_else(|| StratumLabel::new(stratum)),
            position,
        });
    }
    Ok(rows)
}

/// How a prior reserve sample is combined with a fresh draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReservePolicy {
    /// Keep the first occurrence of every identifier.
    #[default]
    DedupeById,
    /// Plain concatenation; repeated identifiers are kept.
    Append,
}

/// Fresh draw combined with a reserve sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSample {
    /// Rows in output order: fresh draw first, then the reserve.
    pub rows: Vec<SampleRow>,
    /// Rows taken from the fresh draw.
    pub drawn: usize,
    /// Rows taken from the reserve.
    pub reserve: usize,
    /// Identifiers that occurred more than once across both inputs.
    pub duplicate_ids: Vec<RecordId>,
    /// Rows removed by deduplication.
    pub duplicates_dropped: usize,
}

/// Concatenates the fresh draw and the reserve according to `policy`.
pub fn merge_reserve(
    drawn: Vec<SampleRow>,
    reserve: Vec<SampleRow>,
    policy: ReservePolicy,
) -> MergedSample {
    let drawn_len = drawn.len();
    let mut seen = HashSet::new();
    let mut repeated = HashSet::new();
    let mut duplicate_ids = Vec::new();
    let mut rows = Vec::with_capacity(drawn_len + reserve.len());
    let mut kept_drawn = 0;
    let mut kept_reserve = 0;
    let mut duplicates_dropped = 0;
    for (idx, row) in drawn.into_iter().chain(reserve).enumerate() {
        let first = seen.insert(row.id.clone());
        if !first {
            if repeated.insert(row.id.clone()) {
                duplicate_ids.push(row.id.clone());
            }
            if policy == ReservePolicy::DedupeById {
                duplicates_dropped += 1;
                continue;
            }
        }
        if idx < drawn_len {
            kept_drawn += 1;
        } else {
            kept_reserve += 1;
        }
        rows.push(row);
    }
    MergedSample {
        rows,
        drawn: kept_drawn,
        reserve: kept_reserve,
        duplicate_ids,
        duplicates_dropped,
    }
}
