#![deny(missing_docs)]
#![doc = "CSV record sources, sample output and reserve sample handling for strata runs."]

/// Sample file writing, reading and reserve merging.
pub mod output;
/// Input dataset readers.
pub mod source;

pub use output::{
    commit_all, ensure_writable, merge_reserve, read_sample, stage_bytes, stage_sample,
    write_sample, MergedSample, ReservePolicy, SampleRow, StagedOutput,
};
pub use source::{read_all, CsvSource, RecordSource, SourceSpec};
