//! # Playlake entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Initialize logging (console + rolling files)
//!   ├─> Create Tokio runtime
//!   └─> Run the requested command, `run` when none is given
//! ```
//!
//! ```bash
//! playlake                                   # dl.json, or defaults
//! playlake run --input testdata --output /tmp/lake --time-basis utc
//! playlake show-config
//! ```
//!
//! Any failure is logged and the process exits non-zero.

#![expect(clippy::print_stdout)] // run summaries go to stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;
use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    playlake::logging::init(cli.log_dir.clone())?;

    let result = tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli));
    if let Err(e) = &result {
        tracing::error!("{e:#}");
    }
    result
}
