use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::StratumLabel;

/// Date layouts tried when a date column has no explicit formats configured.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 9999;

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}

/// Where a dataset keeps the information its stratum label comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LabelSource {
    /// An explicit survey year column.
    Year {
        /// Column holding the year.
        column: String,
    },
    /// A visit date column whose year becomes the label.
    Date {
        /// Column holding the date.
        column: String,
        /// `chrono` format strings tried in order.
        #[serde(default = "default_date_formats")]
        formats: Vec<String>,
    },
}

impl LabelSource {
    /// Creates a date source using the default format list.
    pub fn date(column: impl Into<String>) -> Self {
        LabelSource::Date {
            column: column.into(),
            formats: default_date_formats(),
        }
    }

    /// Creates an explicit year source.
    pub fn year(column: impl Into<String>) -> Self {
        LabelSource::Year {
            column: column.into(),
        }
    }

    /// Returns the column the label is read from.
    pub fn column(&self) -> &str {
        match self {
            LabelSource::Year { column } | LabelSource::Date { column, .. } => column,
        }
    }

    /// Extracts the stratum label from a raw field value.
    ///
    /// Missing, blank and unparseable values, as well as years outside
    /// `1000..=9999`, yield `None`.
    pub fn extract(&self, raw: Option<&str>) -> Option<StratumLabel> {
        let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
        let year = match self {
            LabelSource::Year { .. } => parse_year(raw)?,
            LabelSource::Date { formats, .. } => parse_date(raw, formats)?.year(),
        };
        (MIN_YEAR..=MAX_YEAR)
            .contains(&year)
            .then(|| StratumLabel::from_year(year))
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    // Geodatabase exports frequently store integer fields as `2016.0`.
    let value: f64 = raw.parse().ok()?;
    (value.is_finite() && value.fract() == 0.0).then_some(value as i32)
}

fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    formats.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(raw, format)
            .map(|stamp| stamp.date())
            .or_else(|_| NaiveDate::parse_from_str(raw, format))
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_column_accepts_integers_and_integral_floats() {
        let source = LabelSource::year("YEAR");
        assert_eq!(source.extract(Some("2016")), Some(StratumLabel::from_year(2016)));
        assert_eq!(source.extract(Some(" 2018.0 ")), Some(StratumLabel::from_year(2018)));
        assert_eq!(source.extract(Some("2018.5")), None);
        assert_eq!(source.extract(Some("")), None);
        assert_eq!(source.extract(None), None);
        assert_eq!(source.extract(Some("16")), None);
    }

    #[test]
    fn date_column_uses_default_layouts() {
        let source = LabelSource::date("DATE_COL");
        for raw in [
            "2019-07-14",
            "07/14/2019",
            "2019/07/14",
            "14-Jul-2019",
            "2019-07-14T09:30:00",
            "2019-07-14 09:30:00",
        ] {
            assert_eq!(
                source.extract(Some(raw)),
                Some(StratumLabel::from_year(2019)),
                "layout {raw}"
            );
        }
        assert_eq!(source.extract(Some("not a date")), None);
        assert_eq!(source.extract(Some("NA")), None);
    }

    #[test]
    fn date_column_honours_explicit_formats() {
        let source = LabelSource::Date {
            column: "VISIT".into(),
            formats: vec!["%d.%m.%Y".into()],
        };
        assert_eq!(
            source.extract(Some("03.08.2021")),
            Some(StratumLabel::from_year(2021))
        );
        assert_eq!(source.extract(Some("2021-08-03")), None);
        assert_eq!(source.column(), "VISIT");
    }

    #[test]
    fn label_source_deserializes_from_yaml_shape() {
        let source: LabelSource =
            serde_json::from_str(r#"{"kind":"date","column":"DATE_COL"}"#).unwrap();
        assert_eq!(source, LabelSource::date("DATE_COL"));
        let source: LabelSource =
            serde_json::from_str(r#"{"kind":"year","column":"YEAR"}"#).unwrap();
        assert_eq!(source, LabelSource::year("YEAR"));
    }
}
