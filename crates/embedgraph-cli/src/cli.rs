use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for embedgraph
#[derive(Parser, Debug)]
#[command(name = "embedgraph")]
#[command(
    about = "Embed a document paragraph by paragraph and serve its similarity graph",
    long_about = None,
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Log at debug level")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Chunk, embed and summarize a text file into a similarity database")]
    Process(ProcessArgs),

    #[command(about = "Serve the query API over a processed database")]
    Serve {
        #[arg(long, help = "Database produced by `process`")]
        db: PathBuf,

        #[arg(short, long, default_value_t = 8080, help = "Port to listen on")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1", help = "Address to bind to")]
        bind: IpAddr,
    },
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[arg(short, long, help = "Text file to process")]
    pub file: PathBuf,

    #[arg(short, long, help = "Directory for the database (overrides config)")]
    pub output: Option<PathBuf>,

    #[arg(short, long, help = "Concurrent embedding requests, 0 for one per CPU")]
    pub workers: Option<usize>,

    #[arg(long, help = "Concurrent summary requests, 0 for one per CPU")]
    pub summary_workers: Option<usize>,

    #[arg(long, help = "Model service address (overrides config and OLLAMA_HOST)")]
    pub host: Option<String>,

    #[arg(short, long, help = "Config file [default: ~/.embedgraph/config.toml]")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Pull missing models instead of failing")]
    pub pull: bool,

    #[arg(long, help = "Per-request timeout in seconds")]
    pub timeout: Option<u64>,
}
