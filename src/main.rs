mod api;
mod app;
mod graph;
mod util;

use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the contract analysis backend.
    #[arg(long, default_value = "http://localhost:8000")]
    api_url: String,

    /// Maximum number of entities fetched per snapshot.
    #[arg(long, default_value_t = 120)]
    limit: usize,

    /// Seconds between statistics refreshes.
    #[arg(long, default_value_t = 10)]
    stats_interval_secs: u64,

    /// Initial window width in points.
    #[arg(long, default_value_t = 1440.0)]
    width: f32,

    /// Initial window height in points.
    #[arg(long, default_value_t = 920.0)]
    height: f32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = api::ApiClient::new(&args.api_url)?;
    let settings = app::AppSettings {
        node_limit: args.limit,
        stats_interval: Duration::from_secs(args.stats_interval_secs.max(1)),
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width, args.height])
            .with_title("Knowledge Graph"),
        ..Default::default()
    };

    eframe::run_native(
        "contract-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::ContractGraphApp::new(cc, client, settings)))),
    )
    .map_err(|error| anyhow!("failed to run the viewer: {error}"))
}
