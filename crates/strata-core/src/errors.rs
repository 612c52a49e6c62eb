//! Structured error types shared across strata crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of identifiers listed in a diagnostic context entry.
const MAX_LISTED_IDS: usize = 10;

/// Structured payload attached to every [`StrataError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, identifiers, counts).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the operator resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Adds a truncated, comma separated list of identifiers under `key`.
    pub fn with_ids<I, S>(self, key: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        let mut listed = ids
            .iter()
            .take(MAX_LISTED_IDS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if ids.len() > MAX_LISTED_IDS {
            listed.push_str(&format!(", ... ({} more)", ids.len() - MAX_LISTED_IDS));
        }
        self.with_context(key, listed)
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for a sampling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum StrataError {
    /// A source file or layer is missing or malformed.
    #[error("input read failure: {0}")]
    InputRead(ErrorInfo),
    /// Records lack required fields after filtering.
    #[error("invalid input: {0}")]
    InvalidInput(ErrorInfo),
    /// No stratum meets the minimum population threshold.
    #[error("empty population: {0}")]
    EmptyPopulation(ErrorInfo),
    /// The spatial sampler failed or returned an inconsistent sample.
    #[error("sampling failure: {0}")]
    Sampling(ErrorInfo),
    /// The destination could not be written or already exists.
    #[error("output write failure: {0}")]
    OutputWrite(ErrorInfo),
    /// The run configuration is malformed.
    #[error("config error: {0}")]
    Config(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl StrataError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            StrataError::InputRead(info)
            | StrataError::InvalidInput(info)
            | StrataError::EmptyPopulation(info)
            | StrataError::Sampling(info)
            | StrataError::OutputWrite(info)
            | StrataError::Config(info) => info,
        }
    }

    /// Returns the stable machine readable code of the payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }
}
