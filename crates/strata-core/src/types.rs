use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Unique identifier of a monitoring site record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates an identifier from its raw string form.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Label of the stratum a record belongs to, typically a survey year.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StratumLabel(String);

impl StratumLabel {
    /// Creates a label from an arbitrary string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Creates the canonical four digit label for a survey year.
    pub fn from_year(year: i32) -> Self {
        Self(format!("{year:04}"))
    }

    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the label back into a year when it holds one.
    pub fn year(&self) -> Option<i32> {
        self.0.parse().ok()
    }
}

impl Display for StratumLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two dimensional coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Easting or longitude.
    pub x: f64,
    /// Northing or latitude.
    pub y: f64,
}

impl Position {
    /// Creates a new position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true when both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A labeled point observation read from one of the input datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier of the site.
    pub id: RecordId,
    /// Stratum label derived from a year or visit date field.
    pub stratum: Option<StratumLabel>,
    /// Location of the site in the current reference frame.
    pub position: Position,
    /// Source program or project tag, when the input carries one.
    pub source: Option<String>,
}

impl Record {
    /// Creates an unlabeled record without a source tag.
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: RecordId::new(id),
            stratum: None,
            position,
            source: None,
        }
    }

    /// Sets the stratum label.
    pub fn with_stratum(mut self, stratum: StratumLabel) -> Self {
        self.stratum = Some(stratum);
        self
    }

    /// Sets the source tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
