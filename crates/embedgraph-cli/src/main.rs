//! embedgraph - document similarity graphs from a local model service
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use cli::{Cli, Commands};

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    handlers::init_tracing(cli.verbose);

    match cli.command {
        Commands::Process(args) => handlers::handle_process(args).await,
        Commands::Serve { db, port, bind } => handlers::handle_serve(db, port, bind).await,
    }
}
