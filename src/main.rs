use std::path::PathBuf;

use clap::Parser;
use coastal_dashboard::{app, config::DashboardConfig};

#[derive(Parser)]
#[command(
    name = "coastal-dashboard",
    version,
    about = "Coastal water-quality map and chemical toxicity lookup"
)]
struct Cli {
    /// JSON config file; defaults apply to every key it leaves out
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:3000
    #[arg(long)]
    bind: Option<String>,

    /// Directory holding the concentration and toxicity spreadsheets
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Main entry point for the web application
///
/// Loads the configuration, applies command line overrides and serves the
/// dashboard until the process is stopped.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    log::info!(
        "serving {} with data from {}",
        config.title,
        config.data_dir.display()
    );
    app::run(config).await
}
