use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use triggerd::Config;
use triggerd::Host;
use triggerd::TriggersEngine;
use triggerd::TriggersHandle;
use triggerd::api;
use triggerd::config::LoggingConfig;
use triggerd::host::ConfigHandle;
use triggerd::integrations::mqtt::MqttConfig;

#[derive(Debug, Parser)]
#[command(version, about = "Camera trigger engine")]
struct Args {
    /// Path to the configuration file
    #[arg(default_value = "triggerd.toml")]
    config: PathBuf,
}

fn init_tracing(logging: &LoggingConfig) {
    let targets = Targets::new()
        .with_default(LevelFilter::from(logging.level))
        .with_targets(
            logging
                .overrides
                .iter()
                .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
        );

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(targets)
        .init();
}

#[cfg(feature = "integration_mqtt")]
fn spawn_mqtt(
    mqtt: Option<MqttConfig>,
    host: &Host,
    triggers: &TriggersHandle,
) -> Option<JoinHandle<()>> {
    use triggerd::integrations::mqtt::MqttEventSource;
    use triggerd::integrations::mqtt::RumqttcClient;

    let mqtt = mqtt?;
    let client = RumqttcClient::new(&mqtt);
    let mut source = MqttEventSource::new(client, mqtt, host.config.clone(), triggers.clone());

    Some(tokio::spawn(async move {
        if let Err(e) = source.run().await {
            tracing::error!("MQTT event source failed: {}", e);
        }
    }))
}

#[cfg(not(feature = "integration_mqtt"))]
fn spawn_mqtt(
    mqtt: Option<MqttConfig>,
    _host: &Host,
    _triggers: &TriggersHandle,
) -> Option<JoinHandle<()>> {
    if mqtt.is_some() {
        tracing::warn!("Built without MQTT support, ignoring [mqtt] section");
    }
    None
}

/// Re-read the config file on every SIGHUP.
///
/// A file that fails to load leaves the running configuration in place.
#[cfg(unix)]
async fn reload_on_hangup(path: PathBuf, config: Arc<ConfigHandle>) {
    use tokio::signal::unix::SignalKind;
    use tokio::signal::unix::signal;

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::warn!("Failed to listen for SIGHUP, config reload disabled: {}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        match Config::from_file(&path) {
            Ok(new_config) => {
                config.replace(new_config);
                tracing::info!("Reloaded config from: {}", path.display());
            }
            Err(e) => {
                tracing::error!("Config reload failed, keeping previous config: {}", e);
            }
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_path: PathBuf, _config: Arc<ConfigHandle>) {
    std::future::pending::<()>().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    init_tracing(&config.logging);

    tracing::info!("triggerd starting");
    tracing::info!("Loaded config from: {}", args.config.display());
    tracing::info!("{} cameras configured", config.cameras.len());

    let mqtt_config = config.mqtt.clone();
    let api_config = config.api.clone();

    let host = Host::new(config);
    let (engine, triggers) = TriggersEngine::new(host.capabilities());
    let engine_task = tokio::spawn(engine.run());

    let mqtt_task = spawn_mqtt(mqtt_config, &host, &triggers);
    let reload_task = tokio::spawn(reload_on_hangup(args.config.clone(), host.config.clone()));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let api_task = api_config.map(|api_config| {
        let state = api::AppState::new(triggers.clone(), host.clone());
        tokio::spawn(async move {
            if let Err(e) = api::serve(api_config.listen, api_config.port, state, shutdown_rx).await
            {
                tracing::error!("HTTP API server failed: {:#}", e);
            }
        })
    });

    tracing::info!("Press Ctrl+C to exit");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received shutdown signal");
        }
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    let _ = shutdown_tx.send(());
    if let Some(task) = api_task {
        let _ = task.await;
    }

    if let Some(task) = mqtt_task {
        task.abort();
        let _ = task.await;
    }
    reload_task.abort();

    // The engine stops once the last handle is gone.
    drop(triggers);
    let _ = engine_task.await;

    tracing::info!("triggerd shutdown complete");

    Ok(())
}
