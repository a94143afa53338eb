//! Integration tests for the analysis path
//!
//! These run `Pipeline::analyze_file` on fixture files and check the
//! reported statistics end to end. None of them needs a database.

use sluice::config::AppConfig;
use sluice::error::SluiceError;
use sluice::ingest::report::ColumnStats;
use sluice::ingest::{InferencePolicyKind, Pipeline, ValueKind};
use std::io::Write as _;
use std::path::PathBuf;

fn pipeline() -> Pipeline {
    Pipeline::new(AppConfig::default())
}

#[test]
fn test_analyze_people_csv() {
    let report = pipeline()
        .analyze_file(&PathBuf::from("testdata/people.csv"))
        .expect("Analysis should succeed for people.csv");

    assert_eq!(report.file_name, "people.csv");
    assert_eq!(report.row_count, 4, "Should have 4 rows");
    assert_eq!(report.column_count, 5, "Should have 5 columns");
    assert_eq!(report.policy, "range-aware");

    let id = report.column("id").expect("id column");
    assert_eq!(id.storage_class, "int64");
    assert_eq!(id.sql_type, "TINYINT");
    assert_eq!(id.distinct, 4);

    let name = report.column("name").expect("name column");
    assert_eq!(name.sql_type, "VARCHAR(14)", "12 characters plus 20%");
    assert_eq!(name.nulls, 1);
    assert_eq!(name.distinct, 3);
    assert_eq!(name.count, 4, "count includes missing cells");

    let active = report.column("active").expect("active column");
    assert_eq!(active.storage_class, "bool");
    assert_eq!(active.sql_type, "BOOLEAN");
    match &active.stats {
        Some(ColumnStats::Boolean(stats)) => {
            assert_eq!(stats.true_count, 2);
            assert_eq!(stats.false_count, 2);
        }
        other => panic!("expected boolean stats, got {other:?}"),
    }

    let joined = report.column("joined").expect("joined column");
    assert_eq!(joined.kind, ValueKind::Timestamp);
    assert_eq!(joined.storage_class, "datetime64[ns]");
    assert_eq!(joined.sql_type, "DATETIME");
    assert_eq!(joined.nulls, 1);

    let score = report.column("score").expect("score column");
    assert_eq!(score.sql_type, "DOUBLE");
    assert_eq!(score.nulls, 1, "NA token is missing");
    match &score.stats {
        Some(ColumnStats::Numeric(stats)) => {
            assert!((stats.min - 7.25).abs() < 1e-9);
            assert!((stats.max - 9.5).abs() < 1e-9);
            assert!((stats.mean - 24.75 / 3.0).abs() < 1e-9);
        }
        other => panic!("expected numeric stats, got {other:?}"),
    }
}

#[test]
fn test_analyze_with_coarse_policy() {
    let mut config = AppConfig::default();
    config.inference.policy = InferencePolicyKind::Coarse;

    let report = Pipeline::new(config)
        .analyze_file(&PathBuf::from("testdata/people.csv"))
        .expect("Analysis should succeed");

    assert_eq!(report.policy, "coarse");
    let types: Vec<&str> = report.columns.iter().map(|c| c.sql_type.as_str()).collect();
    assert_eq!(
        types,
        vec!["INT", "VARCHAR(255)", "BOOLEAN", "DATETIME", "DOUBLE"]
    );
}

#[test]
fn test_analyze_json_records() {
    let report = pipeline()
        .analyze_file(&PathBuf::from("testdata/cities.json"))
        .expect("Analysis should succeed for cities.json");

    assert_eq!(report.row_count, 3);
    let city = report.column("city").expect("city column");
    assert_eq!(city.sql_type, "VARCHAR(7)");
    assert_eq!(city.nulls, 1);

    let population = report.column("population").expect("population column");
    assert_eq!(population.sql_type, "INT");
    assert_eq!(population.storage_class, "float64", "integers with a gap");
}

#[test]
fn test_txt_layouts_agree() {
    let tab = pipeline()
        .analyze_file(&PathBuf::from("testdata/readings_tab.txt"))
        .expect("Tab-separated text should parse");
    let spaced = pipeline()
        .analyze_file(&PathBuf::from("testdata/readings_spaced.txt"))
        .expect("Whitespace-separated text should parse");

    for report in [&tab, &spaced] {
        assert_eq!(report.row_count, 3);
        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["station", "reading", "ok"]);
        assert_eq!(report.column("reading").map(|c| c.nulls), Some(1));
    }

    let types = |r: &sluice::ingest::AnalysisReport| {
        r.columns.iter().map(|c| c.sql_type.clone()).collect::<Vec<_>>()
    };
    assert_eq!(types(&tab), types(&spaced));
}

#[test]
fn test_analyze_first_sheet_of_workbook() {
    let report = pipeline()
        .analyze_file(&PathBuf::from("testdata/staff.xlsx"))
        .expect("Analysis should succeed for staff.xlsx");

    assert_eq!(report.row_count, 3, "header row is not data");
    let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "name", "Unnamed: 2", "name.1", "score"],
        "second sheet is ignored"
    );

    let id = report.column("id").expect("id column");
    assert_eq!(id.kind, ValueKind::Integer, "whole-number cells are integers");
    assert_eq!(id.sql_type, "TINYINT");

    let unnamed = report.column("Unnamed: 2").expect("blank header column");
    assert_eq!(unnamed.kind, ValueKind::Text);
    assert_eq!(unnamed.nulls, 1);

    let second_name = report.column("name.1").expect("renamed duplicate");
    assert_eq!(second_name.sql_type, "VARCHAR(1)");
    assert_eq!(second_name.nulls, 0);

    let score = report.column("score").expect("score column");
    assert_eq!(score.kind, ValueKind::Float);
    assert_eq!(score.nulls, 1, "short row is padded with missing");
    assert_eq!(score.count, 3);
}

fn late_text_code(suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp file");
    writeln!(file, "code").expect("write header");
    for i in 0..=10_000 {
        writeln!(file, "{i}").expect("write row");
    }
    writeln!(file, "X-17").expect("write row");
    file
}

#[test]
fn test_late_text_value_widens_csv_column() {
    let file = late_text_code(".csv");
    let report = pipeline()
        .analyze_file(file.path())
        .expect("a text value after 10000 integers is still valid CSV");

    assert_eq!(report.row_count, 10_002);
    let code = report.column("code").expect("code column");
    assert_eq!(code.kind, ValueKind::Text);
    assert_eq!(code.sql_type, "VARCHAR(6)", "five characters plus 20%");
}

#[test]
fn test_late_text_value_widens_txt_column() {
    let file = late_text_code(".txt");
    let report = pipeline()
        .analyze_file(file.path())
        .expect("a text value after 10000 integers is still valid text");

    let code = report.column("code").expect("code column");
    assert_eq!(code.kind, ValueKind::Text);
    assert_eq!(code.sql_type, "VARCHAR(6)");
}

#[test]
fn test_ragged_txt_is_parse_error() {
    let err = pipeline()
        .analyze_file(&PathBuf::from("testdata/readings_ragged.txt"))
        .expect_err("Ragged rows should be rejected");
    assert!(matches!(err, SluiceError::Parse(_)), "got {err}");
    assert!(err.to_string().contains("Error reading file"));
}

#[test]
fn test_unsupported_extension_rejected_before_reading() {
    let err = pipeline()
        .analyze_file(&PathBuf::from("testdata/rows.xml"))
        .expect_err("xml is not on the allow-list");
    assert!(matches!(err, SluiceError::UnsupportedFormat(_)));

    // the file does not exist, so any read attempt would be an I/O error
    let err = pipeline()
        .analyze_file(&PathBuf::from("testdata/does-not-exist.parquet"))
        .expect_err("parquet is not on the allow-list");
    assert!(matches!(err, SluiceError::UnsupportedFormat(_)));
}

#[test]
fn test_oversized_upload_rejected() {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("temp file");
    writeln!(file, "id").expect("write header");
    for i in 0..100 {
        writeln!(file, "{i}").expect("write row");
    }

    let mut config = AppConfig::default();
    config.upload.max_upload_bytes = 64;

    let err = Pipeline::new(config)
        .analyze_file(file.path())
        .expect_err("file is larger than the limit");
    assert!(matches!(err, SluiceError::UploadTooLarge { limit: 64, .. }));
}
