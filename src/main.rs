//! # sluice command-line entry point
//!
//! ```text
//! main()
//!   ├─> logging::init()
//!   ├─> parse CLI arguments (clap)
//!   └─> create a Tokio runtime and block on the command
//! ```
//!
//! ```bash
//! sluice load --file people.csv --table people --user loader --database staging
//! sluice analyze --file people.csv
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // results go to stdout, logs to stderr

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    sluice::logging::init()?;

    let cli = cli::Cli::parse();

    // one request, one task; no background work
    tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli.command))
}
