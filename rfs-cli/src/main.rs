//! RFS CLI - Command line tool for synthesizing river hydrological data.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "rfs-cli",
    version,
    about = "River flow synthesizer: rainfall-driven flow and level time series"
)]
struct Cli {
    #[command(subcommand)]
    command: rfs_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("rfs-cli {}", env!("CARGO_PKG_VERSION"));
    rfs_cmd::run(cli.command).await
}
