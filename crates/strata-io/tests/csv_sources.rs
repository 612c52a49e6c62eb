use std::fs;
use std::path::Path;

use strata_core::{LabelSource, StrataError, StratumLabel};
use strata_io::{read_all, CsvSource, RecordSource, SourceSpec};
use tempfile::tempdir;

fn spec(path: &Path, label: LabelSource) -> SourceSpec {
    SourceSpec {
        name: "nrsa".into(),
        path: path.to_path_buf(),
        id_column: "SITE_ID".into(),
        x_column: "LON_DD83".into(),
        y_column: "LAT_DD83".into(),
        label,
        source_column: Some("PROJECT".into()),
        source_value: None,
    }
}

#[test]
fn reads_selected_columns_and_derives_labels() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("sites.csv");
    fs::write(
        &path,
        "SITE_ID,DATE_COL,LON_DD83,LAT_DD83,PROJECT,EXTRA\n\
         OR-001,2016-07-01,-122.5,44.1,NRSA,x\n\
         OR-002, 08/15/2017 ,-121.0,45.0,,y\n\
         OR-003,unknown,-120.0,43.2,WSA,z\n",
    )
    .expect("write");
    let source = CsvSource::new(spec(&path, LabelSource::date("DATE_COL")));
    let records = source.read().expect("read");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id.as_str(), "OR-001");
    assert_eq!(records[0].stratum, Some(StratumLabel::from_year(2016)));
    assert_eq!(records[0].position.x, -122.5);
    assert_eq!(records[0].source.as_deref(), Some("NRSA"));
    assert_eq!(records[1].stratum, Some(StratumLabel::from_year(2017)));
    assert_eq!(records[1].source, None);
    assert_eq!(records[2].stratum, None);
    assert_eq!(source.name(), "nrsa");
}

#[test]
fn constant_source_tag_fills_blank_cells() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("sites.csv");
    fs::write(
        &path,
        "SITE_ID,YEAR,LON_DD83,LAT_DD83,PROJECT\n\
         A,2018,1.0,2.0,\n\
         B,2018.0,1.5,2.5,NRSA\n",
    )
    .expect("write");
    let mut spec = spec(&path, LabelSource::year("YEAR"));
    spec.source_value = Some("NRSA-HIST".into());
    let records = CsvSource::new(spec).read().expect("read");
    assert_eq!(records[0].source.as_deref(), Some("NRSA-HIST"));
    assert_eq!(records[1].source.as_deref(), Some("NRSA"));
    assert!(records
        .iter()
        .all(|r| r.stratum == Some(StratumLabel::from_year(2018))));
}

#[test]
fn missing_file_and_column_are_input_read_failures() {
    let dir = tempdir().expect("dir");
    let missing = CsvSource::new(spec(&dir.path().join("absent.csv"), LabelSource::year("YEAR")));
    assert!(matches!(missing.read(), Err(StrataError::InputRead(_))));

    let path = dir.path().join("sites.csv");
    fs::write(&path, "SITE_ID,YEAR,LON,LAT\nA,2018,1,2\n").expect("write");
    let err = CsvSource::new(spec(&path, LabelSource::year("YEAR")))
        .read()
        .unwrap_err();
    match err {
        StrataError::InputRead(info) => {
            assert_eq!(info.code, "source_column");
            assert_eq!(info.context["column"], "LON_DD83");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn bad_coordinates_name_the_row() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("sites.csv");
    fs::write(
        &path,
        "SITE_ID,YEAR,LON_DD83,LAT_DD83,PROJECT\nA,2018,1.0,2.0,NRSA\nB,2018,NA,2.0,NRSA\n",
    )
    .expect("write");
    let err = CsvSource::new(spec(&path, LabelSource::year("YEAR")))
        .read()
        .unwrap_err();
    match err {
        StrataError::InvalidInput(info) => {
            assert_eq!(info.code, "bad_coordinate");
            assert_eq!(info.context["id"], "B");
            assert_eq!(info.context["line"], "3");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn read_all_concatenates_in_order() {
    let dir = tempdir().expect("dir");
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    fs::write(&first, "SITE_ID,YEAR,LON_DD83,LAT_DD83,PROJECT\nA,2018,1,2,NRSA\n").expect("write");
    fs::write(&second, "SITE_ID,YEAR,LON_DD83,LAT_DD83,PROJECT\nB,2019,3,4,NRSA\n").expect("write");
    let a = CsvSource::new(spec(&first, LabelSource::year("YEAR")));
    let b = CsvSource::new(spec(&second, LabelSource::year("YEAR")));
    let records = read_all(&[&a, &b]).expect("read");
    let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}
