use anyhow::Result;
use clap::Parser;

mod channel;
mod cli;
mod config;
mod contract;
mod error;
mod output;
mod pipeline;
mod upstream;
mod url;
mod util;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    cli::Args::parse().run().await
}
