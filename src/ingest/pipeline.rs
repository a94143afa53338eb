//! Orchestration of the load and analysis paths.
//!
//! ```text
//! load:    read_source -> plan (infer + schema) -> connect -> load_table
//! analyze: read_source -> AnalysisReport
//! ```
//!
//! Everything up to and including `plan` runs without a database, and its
//! failures come back as `Err`. Once a connection is attempted the result is
//! always a [`LoadOutcome`].

use super::db::DbClient;
use super::inference::InferencePolicy;
use super::loader::{LoadOutcome, LoadStage, load_table};
use super::reader::{ALLOWED_EXTENSIONS, read_file};
use super::report::AnalysisReport;
use super::schema::TableSchema;
use super::table::Table;
use crate::config::AppConfig;
use crate::error::{Result, SluiceError};
use sqlx::AnyConnection;
use std::path::Path;

/// Parsed rows plus the schema they will be loaded with.
#[derive(Debug)]
pub struct LoadPlan {
    pub schema: TableSchema,
    pub table: Table,
}

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn policy(&self) -> &'static dyn InferencePolicy {
        self.config.inference.policy.policy()
    }

    /// Checks the extension and size of `path`, then parses it.
    ///
    /// # Errors
    ///
    /// [`SluiceError::UnsupportedFormat`] and [`SluiceError::UploadTooLarge`]
    /// are raised before the file content is read.
    pub fn read_source(&self, path: &Path) -> Result<Table> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !self.config.upload.allows(ext) {
            return Err(SluiceError::UnsupportedFormat(format!(
                "File type not allowed. Supported formats: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let size = std::fs::metadata(path)?.len();
        let limit = self.config.upload.max_upload_bytes;
        if size > limit {
            return Err(SluiceError::UploadTooLarge { size, limit });
        }

        let name = sanitize_file_name(&path.file_name().unwrap_or_default().to_string_lossy());
        tracing::info!("Reading {name} ({size} bytes)");
        let table = read_file(path, &self.config.parse)?;
        tracing::info!(
            "Parsed {name}: {} rows, {} columns",
            table.row_count(),
            table.width()
        );
        Ok(table)
    }

    /// Parses `path` and infers the schema of `table_name`.
    pub fn plan(&self, path: &Path, table_name: &str) -> Result<LoadPlan> {
        let table = self.read_source(path)?;
        let schema = TableSchema::infer(table_name, &table, self.policy())?;
        tracing::debug!("Planned {}", schema.create_table_sql());
        Ok(LoadPlan { schema, table })
    }

    /// Column statistics for `path`. Never connects to a database.
    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisReport> {
        let table = self.read_source(path)?;
        let name = sanitize_file_name(&path.file_name().unwrap_or_default().to_string_lossy());
        Ok(AnalysisReport::new(name, &table, self.policy()))
    }

    /// Loads `path` over a connection owned by the caller.
    pub async fn load_into(
        &self,
        conn: &mut AnyConnection,
        path: &Path,
        table_name: &str,
    ) -> Result<LoadOutcome> {
        let plan = self.plan(path, table_name)?;
        Ok(load_table(conn, &plan.schema, &plan.table).await)
    }

    /// Loads `path` into the database described by the configuration,
    /// creating the database first when needed.
    pub async fn load_file(&self, path: &Path, table_name: &str) -> Result<LoadOutcome> {
        self.config.database.validate()?;
        let plan = self.plan(path, table_name)?;

        match DbClient::provision(&self.config.database).await {
            Ok(client) => Ok(Self::run_plan(client, &plan).await),
            Err(cause) => Ok(connect_failure(cause)),
        }
    }

    /// Like [`Self::load_file`], but against an explicit URL and without
    /// provisioning.
    pub async fn load_file_with_url(
        &self,
        url: &str,
        path: &Path,
        table_name: &str,
    ) -> Result<LoadOutcome> {
        let plan = self.plan(path, table_name)?;

        match DbClient::connect(url).await {
            Ok(client) => Ok(Self::run_plan(client, &plan).await),
            Err(cause) => Ok(connect_failure(cause)),
        }
    }

    async fn run_plan(mut client: DbClient, plan: &LoadPlan) -> LoadOutcome {
        let outcome = load_table(client.connection(), &plan.schema, &plan.table).await;
        if let Err(e) = client.close().await {
            tracing::warn!("{e}");
        }
        outcome
    }
}

fn connect_failure(cause: SluiceError) -> LoadOutcome {
    tracing::error!("Load aborted, {}: {cause}", LoadStage::BeforeCreate);
    LoadOutcome::Failed {
        stage: LoadStage::BeforeCreate,
        cause,
    }
}

/// Deletes the uploaded source file, logging rather than failing.
pub fn remove_source(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) => tracing::warn!("Could not remove {}: {e}", path.display()),
    }
}

/// Reduces a client-supplied file name to `[A-Za-z0-9_.-]`, with path
/// separators and whitespace runs turned into `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let joined = name
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(['.', '_'])
        .to_owned()
}
