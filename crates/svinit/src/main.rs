use anyhow::Context;
use svinit::{CONFIG_ENV, RosterConfig, Svinit, config_path, logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing()?;

    let path = config_path(std::env::args_os().nth(1), std::env::var_os(CONFIG_ENV))
        .with_context(|| format!("usage: svinit <roster.json> (or set {CONFIG_ENV})"))?;
    let config = RosterConfig::from_path(&path)
        .with_context(|| format!("Failed to load roster from {}", path.display()))?;

    let report = Svinit::from_config(&config)?.run().await?;

    info!(exit_code = report.exit_code, "svinit exiting");
    std::process::exit(report.exit_code)
}
