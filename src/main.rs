// src/main.rs - printwatch daemon
use clap::Parser;
use printwatch::config;
use printwatch::device::AdbDevice;
use printwatch::mirror::CsvSheet;
use printwatch::Reconciler;

/// Mirror a printer fleet's print history from its companion app into a sheet.
#[derive(Debug, Parser)]
#[command(name = "printwatch", version)]
struct Cli {
    /// Configuration file
    #[arg(default_value = "printwatch.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Load configuration before logging starts so its level applies
    let loaded = config::load_config(&cli.config);
    let level = loaded
        .as_ref()
        .ok()
        .and_then(|c| c.logging.max_level().ok())
        .unwrap_or(tracing::Level::INFO);

    // Initialize logging
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!("Starting printwatch");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading configuration from: {}", cli.config);

    let config = loaded.map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", cli.config, e);
        tracing::error!("Please ensure the configuration file exists and is properly formatted");
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    tracing::info!(
        "Device: {} via {}",
        config.device.serial.as_deref().unwrap_or("default"),
        config.device.adb_path
    );
    tracing::info!("Mirror: {}", config.mirror.csv_path.display());
    tracing::info!("Poll interval: {}s", config.monitor.poll_interval_secs);

    let device = AdbDevice::new(&config.device);
    let sheet = CsvSheet::new(config.mirror.csv_path.clone());
    let mut reconciler = Reconciler::new(device, sheet, config.monitor.clone());

    loop {
        let delay = reconciler.drive_cycle().await.map_err(|e| {
            tracing::error!("Device unavailable, shutting down: {}", e);
            Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
        })?;
        tokio::time::sleep(delay).await;
    }
}
