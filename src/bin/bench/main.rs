mod config;
mod runner;
mod stats;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use config::BenchConfig;
use runner::BenchRunner;
use stats::print_statistics;

#[derive(Parser, Debug)]
#[command(name = "bench")]
#[command(about = "Benchmark an MCP server over stdio", long_about = None)]
struct Args {
    /// Path to the benchmark configuration file (TOML)
    config_file: PathBuf,

    /// Number of times to replay the steps against the same server process
    #[arg(short = 'i', long, default_value = "1")]
    iterations: usize,

    /// Also append log output to this file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,

    /// Server command and arguments (after --)
    #[arg(last = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = BenchConfig::from_file(&args.config_file)
        .context("Failed to load benchmark configuration")?;

    if args.command.is_empty() {
        anyhow::bail!("No command specified. Use -- followed by the command to execute.");
    }

    let runner = BenchRunner::new(config, args.command, args.iterations.max(1));
    let results = runner.run().await?;
    print_statistics(&results);

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("Invalid log level '{}'", args.log_level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false);

    if let Some(log_file_path) = &args.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path)
            .context("Failed to open log file")?;
        tracing::subscriber::set_global_default(
            builder.with_writer(Mutex::new(file).and(std::io::stdout)).finish(),
        )
        .context("Failed to set tracing subscriber")?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())
            .context("Failed to set tracing subscriber")?;
    }
    Ok(())
}
