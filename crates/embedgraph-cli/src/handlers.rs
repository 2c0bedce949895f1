//! Command handlers for CLI operations

use std::io::{Result as IoResult, stderr};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use console::{Term, style};
use embedgraph_cli::{Pipeline, PipelineStage, RunReport, StageProgress, serve};
use embedgraph_core::AppConfig;
use embedgraph_core::config::normalize_host;
use embedgraph_local::OllamaClient;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use crate::cli::ProcessArgs;

/// Install the stderr log subscriber.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "embedgraph_cli=debug,embedgraph_local=debug,embedgraph_store=debug,embedgraph_context=debug,embedgraph_core=debug"
    } else {
        "embedgraph_cli=info,embedgraph_local=info,embedgraph_store=info,embedgraph_context=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            fmt::layer()
                .with_writer(stderr)
                .with_target(false),
        )
        .init();
}

/// Resolve configuration and run the pipeline over one file.
///
/// # Errors
/// Returns an error if configuration cannot be loaded or any stage fails
pub async fn handle_process(args: ProcessArgs) -> Result<()> {
    let config = load_config(&args)?;

    let client = OllamaClient::new(config.model.clone())
        .context("Failed to create model client")?;
    let pipeline = Pipeline::new(Arc::new(client), config.pipeline).with_progress(progress_renderer());

    let report = match pipeline.run(&args.file).await {
        Ok(report) => report,
        Err(error) => {
            if let Some(hint) = error.hint() {
                Term::stderr().write_line(&format!("{} {hint}", style("hint:").yellow()))?;
            }
            return Err(error).with_context(|| format!("Failed to process {}", args.file.display()));
        }
    };

    print_report(&report)?;
    Ok(())
}

/// Serve the query API over an existing database.
///
/// # Errors
/// Returns an error if the database is missing or the address cannot be bound
pub async fn handle_serve(db: PathBuf, port: u16, bind: IpAddr) -> Result<()> {
    if !db.is_file() {
        bail!("Database not found: {}", db.display());
    }

    let address = SocketAddr::new(bind, port);
    serve(db, address)
        .await
        .with_context(|| format!("Failed to serve on {address}"))
}

fn load_config(args: &ProcessArgs) -> Result<AppConfig> {
    let base = match &args.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load_or_create().unwrap_or_else(|error| {
            tracing::warn!("Failed to load config from ~/.embedgraph/config.toml: {error}");
            tracing::warn!("Using default configuration");
            AppConfig::default()
        }),
    };

    let mut config = base.with_env_overrides();
    if let Some(host) = &args.host {
        config.model.host = normalize_host(host);
    }
    if let Some(workers) = args.workers {
        config.pipeline.embedding_workers = workers;
    }
    if let Some(workers) = args.summary_workers {
        config.pipeline.summary_workers = workers;
    }
    if let Some(output) = &args.output {
        config.pipeline.output_dir.clone_from(output);
    }
    if args.pull {
        config.model.pull_missing_models = true;
    }
    if args.timeout.is_some() {
        config.model.request_timeout_secs = args.timeout;
    }

    Ok(config)
}

/// Draw batch progress on the terminal when stderr is attended.
fn progress_renderer() -> StageProgress {
    let term = Term::stderr();
    Arc::new(move |stage, completed, total| {
        if !term.is_term() {
            return;
        }
        if let Err(err) = render_progress(&term, stage, completed, total) {
            tracing::debug!("Failed to draw progress: {err}");
        }
    })
}

fn render_progress(term: &Term, stage: PipelineStage, completed: usize, total: usize) -> IoResult<()> {
    term.clear_line()?;
    term.write_str(&format!(
        "{} {completed}/{total}",
        style(format!("{stage}:")).cyan()
    ))?;
    if completed == total {
        term.write_line("")?;
    }
    Ok(())
}

fn print_report(report: &RunReport) -> IoResult<()> {
    let term = Term::stdout();
    term.write_line(&format!(
        "{} Processed {} chunks and {} similarities in {:.1}s",
        style("✓").green(),
        report.chunk_count,
        report.similarity_count,
        report.elapsed.as_secs_f64()
    ))?;
    term.write_line(&format!("  Database: {}", report.database.display()))?;
    term.write_line(&format!(
        "  Run: {} (started {})",
        report.run_id,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ))?;
    term.write_line(&format!(
        "  Serve it with: embedgraph serve --db {}",
        report.database.display()
    ))?;
    Ok(())
}
