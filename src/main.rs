use anyhow::{Context, Result};
use bosun::alerts::AlertEngine;
use bosun::api::{create_telemetry_router, AlertHistory, ScenarioClient, TelemetryAppState};
use bosun::config::{load_config, BosunConfig};
use bosun::signalk::SignalKClient;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bosun=info".into()),
        )
        .init();

    info!("Bosun starting...");

    let config = match std::env::var("BOSUN_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration");
            load_config(&path)?
        }
        Err(_) => BosunConfig::default(),
    }
    .apply_env();

    // SignalK client (reconnects forever in the background)
    let client = Arc::new(SignalKClient::new(config.signalk.clone()));
    tokio::spawn(Arc::clone(&client).run());

    // Alert history is the first alert subscriber
    let history = Arc::new(AlertHistory::new(config.telemetry.alert_buffer_size));
    let alerts = Arc::new(AlertEngine::new(Arc::clone(&client), config.alerts.clone()));
    alerts.subscribe(history.clone());
    tokio::spawn(Arc::clone(&alerts).run());

    let state = Arc::new(TelemetryAppState {
        client,
        history,
        scenarios: Arc::new(ScenarioClient::new(&config.telemetry.scenario_url)?),
        stream_interval: config.telemetry.stream_interval(),
        recent_alerts: config.telemetry.recent_alerts,
    });
    let app = create_telemetry_router(state);

    let listener = tokio::net::TcpListener::bind(&config.telemetry.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.telemetry.bind_addr))?;
    info!(addr = %config.telemetry.bind_addr, "Telemetry API listening");

    axum::serve(listener, app)
        .await
        .context("Telemetry server failed")?;

    Ok(())
}
