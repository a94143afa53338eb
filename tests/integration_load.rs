//! Integration tests for the load path
//!
//! SQLite stands in for MySQL: it accepts the same backtick-quoted
//! identifiers and type names, and runs in memory or in a temp directory.

use sluice::config::{AppConfig, DbDriver};
use sluice::error::SluiceError;
use sluice::ingest::{ColumnType, LoadOutcome, LoadStage, Pipeline};
use sqlx::{AnyConnection, Connection as _};
use std::io::Write as _;
use std::path::{Path, PathBuf};

async fn memory_db() -> AnyConnection {
    sqlx::any::install_default_drivers();
    AnyConnection::connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite should open")
}

async fn count(conn: &mut AnyConnection, sql: &str) -> i64 {
    sqlx::query_scalar(sql)
        .fetch_one(conn)
        .await
        .expect("count query should succeed")
}

fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

#[tokio::test]
async fn test_round_trip_preserves_rows_and_nulls() {
    let mut conn = memory_db().await;
    let outcome = Pipeline::new(AppConfig::default())
        .load_into(&mut conn, &PathBuf::from("testdata/people.csv"), "people")
        .await
        .expect("people.csv should plan");

    assert_eq!(
        outcome.message(),
        "Success! Created table 'people' with 4 records."
    );

    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM `people`").await, 4);
    assert_eq!(
        count(&mut conn, "SELECT COUNT(*) FROM `people` WHERE `name` IS NULL").await,
        1
    );
    assert_eq!(
        count(&mut conn, "SELECT COUNT(*) FROM `people` WHERE `score` IS NULL").await,
        1
    );
    assert_eq!(
        count(&mut conn, "SELECT COUNT(*) FROM `people` WHERE `joined` IS NULL").await,
        1
    );

    // timestamps travel as text
    assert_eq!(
        count(
            &mut conn,
            "SELECT COUNT(*) FROM `people` WHERE `joined` = '2023-01-05 00:00:00'"
        )
        .await,
        1
    );
}

#[tokio::test]
async fn test_large_file_narrow_types() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut content = String::from("id,name,active\n");
    for i in 1..=100_000 {
        content.push_str(&format!("{i},user_{i:07},{}\n", i % 2 == 0));
    }
    let path = write_csv(dir.path(), "users.csv", &content);

    let pipeline = Pipeline::new(AppConfig::default());
    let plan = pipeline.plan(&path, "users").expect("users.csv should plan");
    let types: Vec<ColumnType> = plan.schema.columns().iter().map(|c| c.column_type).collect();
    assert_eq!(
        types,
        vec![ColumnType::Int, ColumnType::Varchar(14), ColumnType::Boolean],
        "100000 exceeds SMALLINT; 12-character names get 20% headroom"
    );

    let mut conn = memory_db().await;
    let outcome = pipeline
        .load_into(&mut conn, &path, "users")
        .await
        .expect("users.csv should plan");
    match outcome {
        LoadOutcome::Loaded { rows, .. } => assert_eq!(rows, 100_000),
        LoadOutcome::Failed { cause, .. } => panic!("load failed: {cause}"),
    }
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM `users`").await, 100_000);
}

#[tokio::test]
async fn test_failure_after_create_leaves_no_rows() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_csv(dir.path(), "dupes.csv", "id,label\n1,a\n2,b\n2,c\n");

    let mut conn = memory_db().await;
    sqlx::raw_sql("CREATE TABLE `dupes` (`id` TINYINT UNIQUE, `label` VARCHAR(1))")
        .execute(&mut conn)
        .await
        .expect("pre-create table");

    let outcome = Pipeline::new(AppConfig::default())
        .load_into(&mut conn, &path, "dupes")
        .await
        .expect("dupes.csv should plan");

    match outcome {
        LoadOutcome::Failed { stage, cause } => {
            assert_eq!(stage, LoadStage::AfterCreate);
            assert!(stage.table_may_exist());
            assert!(matches!(cause, SluiceError::Load(_)), "got {cause}");
            assert!(cause.to_string().contains("Rows 1-3"), "got {cause}");
        }
        LoadOutcome::Loaded { .. } => panic!("duplicate id should fail the load"),
    }
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM `dupes`").await, 0);
}

#[tokio::test]
async fn test_second_load_appends_to_existing_table() {
    let mut conn = memory_db().await;
    let pipeline = Pipeline::new(AppConfig::default());
    let path = PathBuf::from("testdata/cities.json");

    for _ in 0..2 {
        let outcome = pipeline
            .load_into(&mut conn, &path, "cities")
            .await
            .expect("cities.json should plan");
        assert!(outcome.is_success(), "{}", outcome.message());
    }
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM `cities`").await, 6);
}

#[tokio::test]
async fn test_load_file_provisions_sqlite_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("staging.db");

    let mut config = AppConfig::default();
    config.database.driver = DbDriver::Sqlite;
    config.database.database = db_path.display().to_string();

    let outcome = Pipeline::new(config)
        .load_file(&PathBuf::from("testdata/readings_spaced.txt"), "readings")
        .await
        .expect("readings should plan");
    assert_eq!(outcome.into_result().expect("load succeeds"), 3);
    assert!(db_path.exists());

    let url = format!("sqlite://{}", db_path.display());
    let mut conn = AnyConnection::connect(&url).await.expect("reopen database");
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM `readings`").await, 3);
}

#[tokio::test]
async fn test_parse_failure_never_reaches_database() {
    let mut conn = memory_db().await;
    let err = Pipeline::new(AppConfig::default())
        .load_into(
            &mut conn,
            &PathBuf::from("testdata/readings_ragged.txt"),
            "readings",
        )
        .await
        .expect_err("ragged rows should not plan");
    assert!(err.is_pre_database());

    assert_eq!(
        count(
            &mut conn,
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'"
        )
        .await,
        0
    );
}

#[tokio::test]
async fn test_missing_credentials_fail_before_connecting() {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("temp file");
    writeln!(file, "a\n1").expect("write");

    let err = Pipeline::new(AppConfig::default())
        .load_file(file.path(), "t")
        .await
        .expect_err("default settings have no user or database");
    assert!(matches!(err, SluiceError::Config(_)));
    assert!(err.to_string().contains("Please fill all required fields"));
}
