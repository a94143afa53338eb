//! Create-table and bulk insert.
//!
//! [`load_table`] issues `CREATE TABLE IF NOT EXISTS`, then inserts every row
//! inside one transaction as multi-row `INSERT ... VALUES (..), (..)`
//! statements of up to [`MAX_ROWS_PER_STATEMENT`] rows each. The create
//! statement runs outside that transaction (MySQL commits DDL implicitly),
//! so a failed insert can leave an empty table behind. The
//! [`LoadStage`] carried by a failure says whether that can have happened.

use super::inference::ColumnType;
use super::missing::is_missing;
use super::schema::TableSchema;
use super::table::{TIMESTAMP_FORMAT, Table, Value};
use crate::error::{Result, SluiceError};
use serde::Serialize;
use sqlx::query_builder::Separated;
use sqlx::{Any, AnyConnection, Connection as _, QueryBuilder};
use std::fmt;

/// Rows per `INSERT` statement.
pub const MAX_ROWS_PER_STATEMENT: usize = 1_000;

/// Bound parameters per statement. SQLite's default ceiling; MySQL allows 65 535.
pub const MAX_BIND_PARAMS: usize = 32_766;

/// How far a load got before failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LoadStage {
    /// Nothing was created. Covers connecting and provisioning too.
    BeforeCreate,
    /// The table exists, new or pre-existing; every inserted row was rolled back.
    AfterCreate,
}

impl LoadStage {
    pub fn table_may_exist(self) -> bool {
        self == Self::AfterCreate
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeCreate => f.write_str("no table created"),
            Self::AfterCreate => f.write_str("table exists, rows rolled back"),
        }
    }
}

/// Result of one load, reported once and never as an `Err`.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { table: String, rows: usize },
    Failed { stage: LoadStage, cause: SluiceError },
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    /// User-facing summary.
    pub fn message(&self) -> String {
        match self {
            Self::Loaded { table, rows } => {
                format!("Success! Created table '{table}' with {rows} records.")
            }
            Self::Failed { cause, .. } => {
                format!("Error creating table or inserting data: {cause}")
            }
        }
    }

    /// # Errors
    ///
    /// Returns the failure cause.
    pub fn into_result(self) -> Result<usize> {
        match self {
            Self::Loaded { rows, .. } => Ok(rows),
            Self::Failed { cause, .. } => Err(cause),
        }
    }
}

/// Database-neutral form of one cell, ready to bind.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlScalar {
    /// NULL typed after the target column.
    Null(ColumnType),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

/// Converts `value` for a column of type `column_type`.
///
/// Missing values of any kind become `NULL`. Text columns receive the
/// display form of whatever the cell held; timestamps go over the wire as
/// `YYYY-MM-DD HH:MM:SS[.ffffff]` strings.
pub fn to_scalar(value: &Value, column_type: ColumnType) -> SqlScalar {
    if is_missing(value) {
        return SqlScalar::Null(column_type);
    }

    match (column_type, value) {
        (ColumnType::Varchar(_), v) => SqlScalar::Text(v.to_string()),
        (_, Value::Integer(i)) if column_type.is_integer() => SqlScalar::Integer(*i),
        (ColumnType::Double, Value::Integer(i)) => SqlScalar::Float(*i as f64),
        (ColumnType::Double, Value::Float(f)) => SqlScalar::Float(*f),
        (ColumnType::Boolean, Value::Boolean(b)) => SqlScalar::Boolean(*b),
        (ColumnType::DateTime, Value::Timestamp(ts)) => {
            SqlScalar::Text(ts.format(TIMESTAMP_FORMAT).to_string())
        }
        // Schemas built by inference never mix kinds; let the database decide
        (_, v) => SqlScalar::Text(v.to_string()),
    }
}

fn push_scalar(row: &mut Separated<'_, '_, Any, &'static str>, scalar: SqlScalar) {
    match scalar {
        SqlScalar::Null(column_type) if column_type.is_integer() => row.push_bind(None::<i64>),
        SqlScalar::Null(ColumnType::Double) => row.push_bind(None::<f64>),
        SqlScalar::Null(ColumnType::Boolean) => row.push_bind(None::<bool>),
        SqlScalar::Null(_) => row.push_bind(None::<String>),
        SqlScalar::Integer(i) => row.push_bind(i),
        SqlScalar::Float(f) => row.push_bind(f),
        SqlScalar::Boolean(b) => row.push_bind(b),
        SqlScalar::Text(s) => row.push_bind(s),
    };
}

/// Rows per statement for a table `width` columns wide.
pub fn rows_per_statement(width: usize) -> usize {
    (MAX_BIND_PARAMS / width.max(1)).clamp(1, MAX_ROWS_PER_STATEMENT)
}

/// Creates the table if absent and inserts every row of `table`.
///
/// The connection is borrowed, not closed; `table` is only read.
pub async fn load_table(
    conn: &mut AnyConnection,
    schema: &TableSchema,
    table: &Table,
) -> LoadOutcome {
    let name = schema.table().to_string();

    if let Err(cause) = schema.ensure_matches(table) {
        tracing::error!("Load of '{name}' aborted, {}: {cause}", LoadStage::BeforeCreate);
        return LoadOutcome::Failed {
            stage: LoadStage::BeforeCreate,
            cause,
        };
    }

    let create_sql = schema.create_table_sql();
    tracing::debug!("{create_sql}");
    if let Err(e) = sqlx::raw_sql(&create_sql).execute(&mut *conn).await {
        let cause = SluiceError::Load(format!("Failed to create table '{name}': {e}"));
        tracing::error!("Load of '{name}' failed, {}: {cause}", LoadStage::BeforeCreate);
        return LoadOutcome::Failed {
            stage: LoadStage::BeforeCreate,
            cause,
        };
    }

    match insert_rows(conn, schema, table).await {
        Ok(rows) => {
            tracing::info!("Inserted {rows} rows into '{name}'");
            LoadOutcome::Loaded { table: name, rows }
        }
        Err(cause) => {
            tracing::warn!("Load of '{name}' failed, {}: {cause}", LoadStage::AfterCreate);
            LoadOutcome::Failed {
                stage: LoadStage::AfterCreate,
                cause,
            }
        }
    }
}

async fn insert_rows(conn: &mut AnyConnection, schema: &TableSchema, table: &Table) -> Result<usize> {
    let insert_prefix = schema.insert_prefix();
    let column_types: Vec<ColumnType> = schema.columns().iter().map(|c| c.column_type).collect();
    let height = table.row_count();
    let chunk_size = rows_per_statement(column_types.len());

    let mut tx = conn
        .begin()
        .await
        .map_err(|e| SluiceError::Load(format!("Failed to start transaction: {e}")))?;

    for start in (0..height).step_by(chunk_size) {
        let end = (start + chunk_size).min(height);
        let mut builder = QueryBuilder::<Any>::new(insert_prefix.as_str());
        builder.push_values(start..end, |mut row, row_index| {
            for (value, column_type) in table.row(row_index).zip(&column_types) {
                push_scalar(&mut row, to_scalar(value, *column_type));
            }
        });

        if let Err(e) = builder.build().execute(&mut *tx).await {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Rollback failed: {rollback_err}");
            }
            return Err(SluiceError::Load(format!(
                "Rows {}-{end} were rejected: {e}",
                start + 1
            )));
        }
        tracing::debug!("Inserted rows {}-{end} of {height}", start + 1);
    }

    tx.commit()
        .await
        .map_err(|e| SluiceError::Load(format!("Failed to commit: {e}")))?;

    Ok(table.row_count())
}
