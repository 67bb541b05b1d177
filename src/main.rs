// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! camera-relay — multi-client MJPEG relay
//!
//! Usage:
//!   camera-relay --config config.toml

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use camera_relay::api::{self, AppState};
use camera_relay::config::Config;
use camera_relay::frame_source::GstOpener;
use camera_relay::inventory;
use camera_relay::manager::StreamManager;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "camera-relay", about = "Multi-client MJPEG camera relay", version)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let cfg = match Config::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    info!(
        cameras = cfg.cameras.len(),
        target_fps = cfg.stream.target_fps,
        port = cfg.api.port,
        "starting camera relay"
    );

    let manager = Arc::new(StreamManager::new(cfg.stream.clone(), Arc::new(GstOpener)));

    for (name, source) in inventory::load(&cfg) {
        manager.add(name, source);
    }

    let state = Arc::new(AppState {
        manager: Arc::clone(&manager),
        frame_timeout: cfg.stream.frame_timeout(),
    });

    let port = cfg.api.port;
    let server = tokio::spawn(async move {
        api::start_server(state, port).await;
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => error!(error = %e, "signal error"),
    }

    server.abort();
    manager.stop_all(SHUTDOWN_TIMEOUT).await;
}
