//! Per-column descriptive statistics for the analysis path.
//!
//! Pure functions over a [`Table`]; nothing here opens a connection.
//! Storage-class labels use the names a pandas user would see for the same
//! column (`int64`, `float64`, `bool`, `datetime64[ns]`, `object`).

use super::inference::{ColumnProfile, InferencePolicy};
use super::missing::{count_missing, is_missing};
use super::table::{Table, TableColumn, Value, ValueKind};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub file_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub policy: &'static str,
    pub columns: Vec<ColumnReport>,
}

impl AnalysisReport {
    pub fn new(file_name: impl Into<String>, table: &Table, policy: &dyn InferencePolicy) -> Self {
        Self {
            file_name: file_name.into(),
            row_count: table.row_count(),
            column_count: table.width(),
            policy: policy.name(),
            columns: analyze_table(table, policy),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ColumnReport {
    pub name: String,
    pub storage_class: &'static str,
    pub kind: ValueKind,
    pub sql_type: String,
    /// Total rows, missing included.
    pub count: usize,
    /// Distinct non-missing values.
    pub distinct: usize,
    pub nulls: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ColumnStats>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ColumnStats {
    Numeric(NumericStats),
    Boolean(BooleanStats),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BooleanStats {
    pub true_count: usize,
    pub false_count: usize,
}

/// Hashable stand-in for a non-missing value.
#[derive(PartialEq, Eq, Hash)]
enum DistinctKey<'a> {
    Integer(i64),
    Float(u64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Text(&'a str),
}

fn float_key(f: f64) -> DistinctKey<'static> {
    // -0.0 == 0.0
    DistinctKey::Float(if f == 0.0 { 0 } else { f.to_bits() })
}

fn distinct_key(value: &Value, kind: ValueKind) -> Option<DistinctKey<'_>> {
    match (kind, value) {
        (_, Value::Missing) => None,
        // 1 and 1.0 are the same value in a float column
        (ValueKind::Float, Value::Integer(i)) => Some(float_key(*i as f64)),
        (_, Value::Float(f)) => Some(float_key(*f)),
        (_, Value::Integer(i)) => Some(DistinctKey::Integer(*i)),
        (_, Value::Boolean(b)) => Some(DistinctKey::Boolean(*b)),
        (_, Value::Timestamp(ts)) => Some(DistinctKey::Timestamp(*ts)),
        (_, Value::Text(s)) => Some(DistinctKey::Text(s)),
    }
}

fn storage_class(kind: ValueKind, has_missing: bool) -> &'static str {
    match kind {
        ValueKind::Integer if has_missing => "float64",
        ValueKind::Integer => "int64",
        ValueKind::Float => "float64",
        ValueKind::Boolean if has_missing => "object",
        ValueKind::Boolean => "bool",
        ValueKind::Timestamp => "datetime64[ns]",
        ValueKind::Text | ValueKind::AllMissing => "object",
    }
}

fn numeric_stats(values: &[Value]) -> Option<NumericStats> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut n = 0_usize;

    for f in values
        .iter()
        .filter(|v| !is_missing(v))
        .filter_map(Value::as_f64)
    {
        min = min.min(f);
        max = max.max(f);
        sum += f;
        n += 1;
    }

    (n > 0).then(|| NumericStats {
        min,
        max,
        mean: sum / n as f64,
    })
}

fn boolean_stats(values: &[Value]) -> BooleanStats {
    values
        .iter()
        .fold(BooleanStats::default(), |mut stats, value| {
            match value {
                Value::Boolean(true) => stats.true_count += 1,
                Value::Boolean(false) => stats.false_count += 1,
                _ => {}
            }
            stats
        })
}

pub fn analyze_column(column: &TableColumn, policy: &dyn InferencePolicy) -> ColumnReport {
    let values = column.values();
    let profile = ColumnProfile::from_values(values);
    let nulls = count_missing(values);

    let distinct = values
        .iter()
        .filter(|v| !is_missing(v))
        .filter_map(|v| distinct_key(v, profile.kind))
        .collect::<HashSet<_>>()
        .len();

    let stats = match profile.kind {
        kind if kind.is_numeric() => numeric_stats(values).map(ColumnStats::Numeric),
        ValueKind::Boolean => Some(ColumnStats::Boolean(boolean_stats(values))),
        _ => None,
    };

    ColumnReport {
        name: column.name().to_owned(),
        storage_class: storage_class(profile.kind, nulls > 0),
        kind: profile.kind,
        sql_type: policy.decide(&profile).to_string(),
        count: profile.count,
        distinct,
        nulls,
        stats,
    }
}

pub fn analyze_table(table: &Table, policy: &dyn InferencePolicy) -> Vec<ColumnReport> {
    table
        .columns()
        .iter()
        .map(|column| analyze_column(column, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used)]
    use super::*;
    use crate::ingest::inference::{CoarsePolicy, RangeAwarePolicy};

    #[test]
    fn test_sparse_text_column() {
        let column = TableColumn::new(
            "note",
            vec![Value::Missing, Value::Missing, Value::Text("x".to_owned())],
        );
        let report = analyze_column(&column, &RangeAwarePolicy);
        assert_eq!(report.sql_type, "VARCHAR(1)");
        assert_eq!(report.count, 3);
        assert_eq!(report.distinct, 1);
        assert_eq!(report.nulls, 2);
        assert_eq!(report.storage_class, "object");
        assert!(report.stats.is_none());
    }

    #[test]
    fn test_numeric_stats() {
        let column = TableColumn::new(
            "qty",
            vec![
                Value::Integer(2),
                Value::Integer(4),
                Value::Missing,
                Value::Integer(4),
            ],
        );
        let report = analyze_column(&column, &RangeAwarePolicy);
        assert_eq!(report.storage_class, "float64");
        assert_eq!(report.sql_type, "TINYINT");
        assert_eq!(report.distinct, 2);
        assert_eq!(report.nulls, 1);

        let Some(ColumnStats::Numeric(stats)) = report.stats else {
            panic!("expected numeric stats");
        };
        assert!((stats.min - 2.0).abs() < f64::EPSILON);
        assert!((stats.max - 4.0).abs() < f64::EPSILON);
        assert!((stats.mean - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_float_distinct_merges_integral_values() {
        let column = TableColumn::new(
            "price",
            vec![Value::Integer(1), Value::Float(1.0), Value::Float(-0.0), Value::Float(0.0)],
        );
        let report = analyze_column(&column, &CoarsePolicy);
        assert_eq!(report.distinct, 2);
        assert_eq!(report.storage_class, "float64");
        assert_eq!(report.sql_type, "DOUBLE");
    }

    #[test]
    fn test_boolean_counts() {
        let column = TableColumn::new(
            "active",
            vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(true)],
        );
        let report = analyze_column(&column, &RangeAwarePolicy);
        assert_eq!(report.storage_class, "bool");
        assert_eq!(
            report.stats,
            Some(ColumnStats::Boolean(BooleanStats {
                true_count: 2,
                false_count: 1,
            }))
        );
    }

    #[test]
    fn test_all_missing_column() {
        let column = TableColumn::new("empty", vec![Value::Missing, Value::Float(f64::NAN)]);
        let report = analyze_column(&column, &RangeAwarePolicy);
        assert_eq!(report.sql_type, "VARCHAR(1)");
        assert_eq!(report.distinct, 0);
        assert_eq!(report.nulls, 2);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let table = Table::new(vec![
            TableColumn::new("id", vec![Value::Integer(1), Value::Integer(2)]),
            TableColumn::new("name", vec![Value::Text("a".to_owned()), Value::Missing]),
        ])
        .unwrap();

        let report = AnalysisReport::new("people.csv", &table, &RangeAwarePolicy);
        assert_eq!(report.column("id").unwrap().storage_class, "int64");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["row_count"], 2);
        assert_eq!(json["policy"], "range-aware");
        assert_eq!(json["columns"][1]["nulls"], 1);
        assert!(json["columns"][1].get("stats").is_none());
    }
}
