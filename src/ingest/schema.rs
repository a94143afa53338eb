//! Table definitions built from inferred column types.
//!
//! Identifiers are trimmed, validated and backtick-quoted so reserved words
//! (`order`, `select`) and odd characters survive. Column order is the file's
//! column order: the loader binds row values positionally.

use super::inference::{ColumnType, InferencePolicy, infer_table};
use super::table::Table;
use crate::error::{Result, SluiceError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Longest identifier MySQL accepts for tables, columns and databases.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// A validated table, column or database name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier(String);

impl Identifier {
    /// # Errors
    ///
    /// Returns [`SluiceError::Schema`] when the trimmed name is empty, too
    /// long, or contains a NUL character.
    pub fn new(raw: &str) -> Result<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(SluiceError::Schema(format!(
                "Identifier '{raw}' is empty after trimming"
            )));
        }
        if name.chars().count() > MAX_IDENTIFIER_LENGTH {
            return Err(SluiceError::Schema(format!(
                "Identifier '{name}' is longer than {MAX_IDENTIFIER_LENGTH} characters"
            )));
        }
        if name.contains('\0') {
            return Err(SluiceError::Schema(format!(
                "Identifier '{}' contains a NUL character",
                name.escape_debug()
            )));
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form with embedded backticks doubled.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0.replace('`', "``"))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: Identifier,
    pub column_type: ColumnType,
}

impl ColumnDef {
    /// `identifier type[(length)]`
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.name.quoted(), self.column_type)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    table: Identifier,
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// # Errors
    ///
    /// Fails with [`SluiceError::Schema`] on an invalid identifier, on two
    /// columns that collide after trimming, or on an empty column list.
    pub fn new(table_name: &str, columns: Vec<(String, ColumnType)>) -> Result<Self> {
        let table = Identifier::new(table_name)?;
        if columns.is_empty() {
            return Err(SluiceError::Schema(format!(
                "Table '{table}' would have no columns"
            )));
        }

        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .map(|(name, column_type)| {
                let name = Identifier::new(&name)?;
                // MySQL column names are case-insensitive
                if !seen.insert(name.as_str().to_lowercase()) {
                    return Err(SluiceError::Schema(format!(
                        "Column '{name}' appears more than once"
                    )));
                }
                Ok(ColumnDef { name, column_type })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { table, columns })
    }

    /// Infers every column of `table` with `policy` and builds the schema.
    pub fn infer(table_name: &str, table: &Table, policy: &dyn InferencePolicy) -> Result<Self> {
        let schema = Self::new(table_name, infer_table(table, policy))?;
        schema.ensure_matches(table)?;
        Ok(schema)
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn create_table_sql(&self) -> String {
        let definitions = self
            .columns
            .iter()
            .map(ColumnDef::to_sql)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({definitions})",
            self.table.quoted()
        )
    }

    /// `INSERT INTO` with the column list; the `VALUES` tuples follow.
    pub fn insert_prefix(&self) -> String {
        let names = self
            .columns
            .iter()
            .map(|c| c.name.quoted())
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {} ({names}) ", self.table.quoted())
    }

    /// Checks that the schema lines up positionally with `table`.
    pub fn ensure_matches(&self, table: &Table) -> Result<()> {
        if self.columns.len() != table.width() {
            return Err(SluiceError::Schema(format!(
                "Schema has {} columns but the data has {}",
                self.columns.len(),
                table.width()
            )));
        }
        for (def, column) in self.columns.iter().zip(table.columns()) {
            if def.name.as_str() != column.name().trim() {
                return Err(SluiceError::Schema(format!(
                    "Schema column '{}' does not line up with data column '{}'",
                    def.name,
                    column.name()
                )));
            }
        }
        Ok(())
    }
}
