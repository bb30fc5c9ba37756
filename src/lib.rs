// Module declarations for the application's core components
pub mod channels;      // Inter-component communication channels
pub mod command;       // UPS status commands
pub mod config;        // Configuration management
pub mod delta;         // Delta UPS serial protocol implementation
pub mod error;         // Error handling and types
pub mod mqtt;          // MQTT client and messaging
pub mod options;       // Command line options parsing
pub mod payload;       // Published payload shape
pub mod poller;        // One poll cycle against the UPS
pub mod prelude;       // Common imports and types
pub mod scheduler;     // Fixed interval polling

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::delta::SerialConnector;
use crate::mqtt::Mqtt;
use crate::poller::{PollStats, Poller};
use crate::scheduler::Scheduler;
use std::sync::{Arc, Mutex};

/// Initialise logging. Everything up to `trace` passes the filter unless
/// RUST_LOG says otherwise; the effective level is set afterwards from the
/// config via `apply_loglevel`.
pub fn init_logging() {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    match result {
        Ok(_) => apply_loglevel("info"),
        Err(e) => eprintln!("Failed to initialise logging: {}", e),
    }
}

/// Set the global log level unless RUST_LOG is in charge.
pub fn apply_loglevel(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }

    match level.parse::<log::LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => warn!("ignoring unknown loglevel {:?}", level),
    }
}

/// Signals every long running component to stop
pub fn stop(channels: &Channels) {
    info!("Stopping all components...");

    let _ = channels.to_scheduler.send(scheduler::ChannelData::Shutdown);
    let _ = channels.to_mqtt.send(mqtt::ChannelData::Shutdown);
}

/// Main application loop
///
/// Starts the MQTT publisher and the polling scheduler, then waits for a
/// shutdown signal and stops them in turn.
pub async fn app(
    mut shutdown_rx: broadcast::Receiver<()>,
    config: ConfigWrapper,
) -> Result<()> {
    info!("delta-ups-bridge {} starting", CARGO_PKG_VERSION);

    let channels = Channels::new();
    let shared_stats = Arc::new(Mutex::new(PollStats::default()));

    info!("  Creating MQTT client...");
    let mqtt = Mqtt::new(config.clone(), channels.clone(), shared_stats.clone());
    let mqtt_handle = tokio::spawn(async move {
        if let Err(e) = mqtt.start().await {
            error!("MQTT task failed: {}", e);
        }
    });

    info!("  Creating UPS client on {}...", config.ups().port());
    let client = UpsClient::new(SerialConnector::from_config(&config.ups()));
    let poller = Poller::new(config.clone(), channels.clone(), client, shared_stats.clone());

    info!("  Creating Scheduler...");
    let scheduler = Scheduler::new(config.clone(), channels.clone(), poller);
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler task failed: {}", e);
        }
    });

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping components...");
    stop(&channels);

    let (scheduler_result, mqtt_result) = futures::join!(scheduler_handle, mqtt_handle);
    if let Err(e) = scheduler_result {
        error!("Error waiting for scheduler task: {}", e);
    }
    if let Err(e) = mqtt_result {
        error!("Error waiting for MQTT task: {}", e);
    }

    if let Ok(stats) = shared_stats.lock() {
        stats.print_summary();
    }

    info!("Application shutdown complete");
    Ok(())
}

/// Poll the UPS once and return the payload as pretty JSON, without MQTT.
pub async fn once(config: ConfigWrapper) -> Result<String> {
    let client = UpsClient::new(SerialConnector::from_config(&config.ups()));
    let poller = Poller::new(
        config,
        Channels::new(),
        client,
        Arc::new(Mutex::new(PollStats::default())),
    );

    let snapshot = poller.snapshot().await?;
    Ok(serde_json::to_string_pretty(&payload::Payload::new(&snapshot))?)
}

/// Application entry point
///
/// Loads the configuration and runs until ctrl+c, or until `runtime` has
/// elapsed when one is given.
pub async fn run(options: Options) -> Result<()> {
    init_logging();

    let config = ConfigWrapper::new(options.config_file.clone())?;
    apply_loglevel(&config.loglevel());

    if options.once {
        println!("{}", once(config).await?);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Set up signal handlers for graceful shutdown
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
        let _ = shutdown_tx_clone.send(());
    });

    if let Some(secs) = options.runtime {
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
            info!("runtime limit of {}s reached", secs);
            let _ = shutdown_tx_clone.send(());
        });
    }

    app(shutdown_rx, config).await
}
