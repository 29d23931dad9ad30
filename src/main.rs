use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use mcp_datetime_server::config::{Args, Transport};
use mcp_datetime_server::format::{Clock, SystemClock};
use mcp_datetime_server::{logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match args.transport {
        Transport::Stdio => {
            server::serve_stdio(tokio::io::stdin(), tokio::io::stdout(), clock).await
        }
        Transport::Http => server::serve_http(args.bind, args.tls()?, clock).await,
    }
}
