//! Ghost CLI binary.

use anyhow::Result;
use ghost::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the ghost CLI.
///
/// Uses tokio's current_thread runtime; commands are sequential and I/O bound.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Controlled via RUST_LOG, e.g. RUST_LOG=ghost=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghost=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting ghost CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Ghost CLI completed successfully");
    Ok(())
}
