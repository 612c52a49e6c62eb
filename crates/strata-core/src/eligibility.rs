use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, StrataError};
use crate::Record;

/// Allow-list deciding which source programs contribute to the population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityFilter {
    /// Accepted source/project tags. Empty accepts every record.
    #[serde(default)]
    pub allowed_sources: Vec<String>,
}

impl EligibilityFilter {
    /// Creates a filter accepting only the listed sources.
    pub fn allow<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when the source tag is on the allow-list.
    pub fn accepts_source(&self, source: Option<&str>) -> bool {
        if self.allowed_sources.is_empty() {
            return true;
        }
        match source.map(str::trim) {
            Some(tag) => self
                .allowed_sources
                .iter()
                .any(|allowed| allowed.trim() == tag),
            None => false,
        }
    }

    /// Splits records into the eligible population and rejection counts.
    pub fn partition(&self, records: Vec<Record>) -> Eligibility {
        let mut outcome = Eligibility::default();
        for record in records {
            if !self.accepts_source(record.source.as_deref()) {
                outcome.rejected_source += 1;
            } else if record.stratum.is_none() {
                outcome.missing_label += 1;
            } else {
                outcome.eligible.push(record);
            }
        }
        outcome
    }
}

/// Result of applying an [`EligibilityFilter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Eligibility {
    /// Records that passed every check.
    pub eligible: Vec<Record>,
    /// Records dropped because of their source tag.
    pub rejected_source: usize,
    /// Records dropped because no stratum label could be derived.
    pub missing_label: usize,
}

/// Fails with `InvalidInput` when an identifier occurs more than once.
pub fn ensure_unique_ids(records: &[Record]) -> Result<(), StrataError> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            duplicates.insert(record.id.as_str());
        }
    }
    if duplicates.is_empty() {
        return Ok(());
    }
    Err(StrataError::InvalidInput(
        ErrorInfo::new("duplicate_id", "identifiers occur more than once in the population")
            .with_context("count", duplicates.len().to_string())
            .with_ids("records", duplicates),
    ))
}
