//! # Sluice - schema inference and bulk loading
//!
//! Sluice reads a tabular file (CSV, Excel, JSON or delimited text), infers a
//! relational schema from its contents, creates a matching table and loads
//! every row in one transaction. A read-only analysis path reports
//! per-column statistics without touching a database.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sluice::config::AppConfig;
//! use sluice::ingest::Pipeline;
//! use std::path::Path;
//!
//! # async fn example() -> sluice::error::Result<()> {
//! let pipeline = Pipeline::new(AppConfig::default());
//!
//! // No database involved
//! let report = pipeline.analyze_file(Path::new("people.csv"))?;
//! for column in &report.columns {
//!     println!("{}: {} ({} nulls)", column.name, column.sql_type, column.nulls);
//! }
//!
//! // Create the table and insert every row
//! let outcome = pipeline
//!     .load_file_with_url("sqlite://people.db?mode=rwc", Path::new("people.csv"), "people")
//!     .await?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`ingest`]: readers, type inference, schema building, loading, reports
//! - [`config`]: the immutable [`config::AppConfig`]
//! - [`error`]: [`error::SluiceError`] and the crate `Result`
//! - [`logging`]: console and rolling-file tracing setup
//!
//! ## Inference
//!
//! Each column is scanned once into a [`ingest::inference::ColumnProfile`].
//! The configured [`ingest::InferencePolicy`] turns the profile into a
//! [`ingest::ColumnType`]. The default range-aware policy picks the narrowest
//! integer type for the observed range and sizes `VARCHAR` from the longest
//! value plus 20%:
//!
//! ```
//! use sluice::ingest::inference::{infer_column, RangeAwarePolicy};
//! use sluice::ingest::{ColumnType, Value};
//!
//! let names = vec![
//!     Value::Text("Ada".to_owned()),
//!     Value::Missing,
//!     Value::Text("Grace Hopper".to_owned()),
//! ];
//! assert_eq!(infer_column(&names, &RangeAwarePolicy), ColumnType::Varchar(14));
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
