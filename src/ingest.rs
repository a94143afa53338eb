//! Schema inference and bulk loading.
//!
//! - [`reader`]: file bytes → [`Table`]
//! - [`inference`]: column values → [`ColumnType`]
//! - [`schema`]: column types → [`TableSchema`] and its SQL
//! - [`loader`]: create table, then insert every row in one transaction
//! - [`report`]: per-column statistics, no database
//! - [`pipeline`]: the two paths wired together

pub mod db;
pub mod inference;
pub mod loader;
pub mod missing;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod schema;
pub mod table;

pub use inference::{ColumnType, InferencePolicy, InferencePolicyKind};
pub use loader::{LoadOutcome, LoadStage};
pub use pipeline::Pipeline;
pub use reader::FileFormat;
pub use report::AnalysisReport;
pub use schema::TableSchema;
pub use table::{Table, TableColumn, Value, ValueKind};
