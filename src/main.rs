use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tabrec::platform::{CapturePlatform, SimulatedConfig, SimulatedPlatform};
use tabrec::{
    create_router, AppState, CaptureBroker, Config, HeuristicSummarizer, PlaceholderTranscriber,
    RecordingSurface, ResultSink, StatusChannel,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "tabrec", about = "Tab audio recording service")]
struct Args {
    /// Path to the config file (without extension)
    #[arg(long, default_value = "config/tabrec")]
    config: String,

    /// Override the HTTP port from the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let platform = Arc::new(SimulatedPlatform::new(SimulatedConfig {
        sample_rate: cfg.capture.sample_rate,
        channels: cfg.capture.channels,
        frame_interval_ms: cfg.capture.frame_interval_ms,
    }));
    // The simulated platform stands in for a real host binding; seed it with
    // one audible tab so the API is usable out of the box.
    platform.register_tab(1, true);
    info!("Simulated capture platform ready (tab 1 has audio)");

    let dyn_platform: Arc<dyn CapturePlatform> = platform.clone();
    let broker = Arc::new(CaptureBroker::new(dyn_platform.clone()));
    let sink = Arc::new(ResultSink::new(
        cfg.storage.store_path.clone().into(),
        cfg.storage.downloads_dir.clone().into(),
    )?);
    let status = StatusChannel::default();

    let surface = RecordingSurface::spawn(
        broker,
        dyn_platform.clone(),
        sink.clone(),
        Arc::new(PlaceholderTranscriber::new()),
        Arc::new(HeuristicSummarizer::new()),
        status,
        cfg.capture.clone(),
    );

    let state = AppState::new(surface, sink, dyn_platform);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
