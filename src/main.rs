use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use edge_analytics::config::Config;
use edge_analytics::report;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("edge_analytics=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::load(&path)?;
    tracing::info!(path = %path.display(), "config loaded");

    let report = report::build(&config).context("Failed to build report")?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}
