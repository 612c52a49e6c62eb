use std::fs;

use strata_core::{Position, RecordId, StrataError, StratumLabel};
use strata_io::{ensure_writable, read_sample, stage_sample, write_sample, SampleRow};
use tempfile::tempdir;

fn rows() -> Vec<SampleRow> {
    vec![
        SampleRow {
            id: RecordId::new("OR-001"),
            stratum: StratumLabel::from_year(2016),
            position: None,
        },
        SampleRow {
            id: RecordId::new("WA-017"),
            stratum: StratumLabel::from_year(2018),
            position: None,
        },
    ]
}

#[test]
fn written_sample_reads_back() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("nested").join("sample.csv");
    write_sample(&path, "year", &rows(), false).expect("write");
    let text = fs::read_to_string(&path).expect("read");
    assert_eq!(text, "id,year\nOR-001,2016\nWA-017,2018\n");
    assert_eq!(read_sample(&path, "year").expect("read back"), rows());
}

#[test]
fn coordinates_are_written_when_present() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("sample.csv");
    let mut rows = rows();
    rows[0] = rows[0].clone().with_position(Position::new(-122.5, 44.25));
    write_sample(&path, "year", &rows, false).expect("write");
    let text = fs::read_to_string(&path).expect("read");
    assert_eq!(text, "id,year,x,y\nOR-001,2016,-122.5,44.25\nWA-017,2018,,\n");
    let back = read_sample(&path, "year").expect("read back");
    assert_eq!(back[0].position, Some(Position::new(-122.5, 44.25)));
    assert_eq!(back[1].position, None);
}

#[test]
fn existing_output_is_not_replaced_without_overwrite() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("sample.csv");
    fs::write(&path, "keep me").expect("seed");
    let err = write_sample(&path, "year", &rows(), false).unwrap_err();
    assert!(matches!(err, StrataError::OutputWrite(_)));
    assert_eq!(err.code(), "output_exists");
    assert_eq!(fs::read_to_string(&path).expect("read"), "keep me");

    write_sample(&path, "year", &rows(), true).expect("overwrite");
    assert!(fs::read_to_string(&path).expect("read").starts_with("id,year\n"));
}

#[test]
fn staged_output_is_invisible_until_commit() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("sample.csv");
    ensure_writable(&path, false).expect("writable");
    let staged = stage_sample(&path, "year", &rows()).expect("stage");
    assert!(!path.exists());
    assert_eq!(staged.target(), path.as_path());
    drop(staged);
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0);
}

#[test]
fn reserve_without_stratum_column_is_rejected() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("prior.csv");
    fs::write(&path, "id,YEAR\nA,2016\n").expect("write");
    let err = read_sample(&path, "year").unwrap_err();
    assert!(matches!(err, StrataError::InputRead(_)));
}
