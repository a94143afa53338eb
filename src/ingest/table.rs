//! In-memory tabular structure produced by the file readers.
//!
//! A [`Table`] is an ordered list of uniquely-named columns, each holding one
//! [`Value`] per row. Every column has the same length; [`Table::new`]
//! rejects anything else, so downstream code can index rows positionally.

use crate::error::{Result, SluiceError};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Format used whenever a timestamp is turned into text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One cell of a parsed file.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Missing,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Numeric view of integer and float cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Length of the stringified value in characters.
    pub fn char_len(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Missing => 0,
            other => other.to_string().chars().count(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Semantic kind of a whole column, decided once by scanning its values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
    AllMissing,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Timestamp => "Timestamp",
            Self::Text => "Text",
            Self::AllMissing => "AllMissing",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableColumn {
    name: String,
    values: Vec<Value>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    columns: Vec<TableColumn>,
    row_count: usize,
}

impl Table {
    /// Builds a table, checking that names are unique and lengths agree.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::Parse`] when the input has no columns, a
    /// duplicated column name, or columns of different lengths.
    pub fn new(columns: Vec<TableColumn>) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Err(SluiceError::Parse("File contains no columns".to_owned()));
        };
        let row_count = first.len();

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SluiceError::Parse(format!(
                    "Duplicate column name '{}'",
                    column.name
                )));
            }
            if column.len() != row_count {
                return Err(SluiceError::Parse(format!(
                    "Column '{}' has {} values but the table has {row_count} rows",
                    column.name,
                    column.len()
                )));
            }
        }

        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.columns.iter().filter_map(move |c| c.values.get(index))
    }
}
