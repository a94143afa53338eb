use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sluice::config::{AppConfig, DbDriver, default_config_path, load_app_config};
use sluice::ingest::pipeline::{Pipeline, remove_source};
use sluice::ingest::InferencePolicyKind;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "sluice",
    about = "Infer a SQL schema from a data file and bulk-load it"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a table from a file and insert every row
    Load {
        /// CSV, Excel (xlsx/xls), JSON or TXT file to load
        #[arg(short, long)]
        file: PathBuf,

        /// Target table name
        #[arg(short, long)]
        table: String,

        /// Target database (a file path for SQLite); created if missing
        #[arg(short, long)]
        database: Option<String>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(short, long)]
        user: Option<String>,

        #[arg(long, env = "SLUICE_DB_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Database driver: mysql or sqlite
        #[arg(long)]
        driver: Option<DbDriver>,

        /// Inference policy: coarse or range-aware
        #[arg(long)]
        policy: Option<InferencePolicyKind>,

        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Connection URL used as-is; skips database creation
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        db_url: Option<String>,

        /// Delete the source file afterwards, whatever the outcome
        #[arg(long)]
        remove_source: bool,
    },
    /// Print per-column statistics as JSON without touching a database
    Analyze {
        #[arg(short, long)]
        file: PathBuf,

        /// Inference policy: coarse or range-aware
        #[arg(long)]
        policy: Option<InferencePolicyKind>,

        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Load {
            file,
            table,
            database,
            host,
            port,
            user,
            password,
            driver,
            policy,
            config,
            db_url,
            remove_source,
        } => {
            let mut app_config = read_config(config.as_deref())?;
            if let Some(policy) = policy {
                app_config.inference.policy = policy;
            }

            let db = &mut app_config.database;
            if let Some(driver) = driver {
                db.driver = driver;
            }
            if let Some(host) = host {
                db.host = host;
            }
            if let Some(port) = port {
                db.port = port;
            }
            if let Some(user) = user {
                db.user = user;
            }
            if let Some(password) = password {
                db.password = SecretString::new(password.into());
            }
            if let Some(database) = database {
                db.database = database;
            }

            handle_load(
                Pipeline::new(app_config),
                &file,
                &table,
                db_url.as_deref(),
                remove_source,
            )
            .await
        }
        Commands::Analyze {
            file,
            policy,
            config,
        } => {
            let mut app_config = read_config(config.as_deref())?;
            if let Some(policy) = policy {
                app_config.inference.policy = policy;
            }
            handle_analyze(&Pipeline::new(app_config), &file)
        }
    }
}

fn read_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map_or_else(default_config_path, Path::to_path_buf);
    load_app_config(&path).with_context(|| format!("Failed to load {}", path.display()))
}

async fn handle_load(
    pipeline: Pipeline,
    file: &Path,
    table: &str,
    db_url: Option<&str>,
    remove: bool,
) -> Result<()> {
    let result = match db_url {
        Some(url) => pipeline.load_file_with_url(url, file, table).await,
        None => pipeline.load_file(file, table).await,
    };

    if remove {
        remove_source(file);
    }

    let outcome = result?;
    println!("{}", outcome.message());
    if outcome.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Load of '{}' did not complete", file.display())
    }
}

fn handle_analyze(pipeline: &Pipeline, file: &Path) -> Result<()> {
    let report = pipeline.analyze_file(file)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    Ok(())
}
