//! CamDeck - Person Detection Dashboard
//!
//! Main entry point for the dashboard application.

use camdeck::app::DashboardApp;
use camdeck::config::DashboardConfig;
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camdeck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CamDeck v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = DashboardConfig::from_env();
    tracing::info!(
        base_url = %config.base_url,
        channel_path = %config.channel_path,
        refresh_min_interval_ms = config.refresh_min_interval.as_millis() as u64,
        "Configuration loaded"
    );

    // HTTP side runs on its own runtime; the UI owns the main thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_title("CamDeck - Person Detection"),
        ..Default::default()
    };

    eframe::run_native(
        "camdeck",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(config, handle)?))),
    )
    .map_err(|e| anyhow::anyhow!("UI loop failed: {}", e))?;

    Ok(())
}
