use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

// Re-export section types that live with their components
pub use crate::alerts::AlertConfig;
pub use crate::signalk::SignalKConfig;

/// Complete bosun configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BosunConfig {
    #[serde(default)]
    pub signalk: SignalKConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Telemetry distribution server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Alert history capacity
    #[serde(default = "default_alert_buffer_size")]
    pub alert_buffer_size: usize,
    /// Push interval for the live stream (milliseconds)
    #[serde(default = "default_stream_interval_ms")]
    pub stream_interval_ms: u64,
    /// Recent alerts included in every payload
    #[serde(default = "default_recent_alerts")]
    pub recent_alerts: usize,
    /// Base URL of the synthetic data source's scenario control
    #[serde(default = "default_scenario_url")]
    pub scenario_url: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3100".to_string()
}

fn default_alert_buffer_size() -> usize {
    50
}

fn default_stream_interval_ms() -> u64 {
    2000
}

fn default_recent_alerts() -> usize {
    10
}

fn default_scenario_url() -> String {
    "http://127.0.0.1:3858".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            alert_buffer_size: default_alert_buffer_size(),
            stream_interval_ms: default_stream_interval_ms(),
            recent_alerts: default_recent_alerts(),
            scenario_url: default_scenario_url(),
        }
    }
}

impl TelemetryConfig {
    /// Push period, never shorter than 1 ms
    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms.max(1))
    }
}

impl BosunConfig {
    /// Apply environment overrides (SIGNALK_HOST, SIGNALK_PORT, TELEMETRY_PORT)
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("SIGNALK_HOST") {
            self.signalk.host = host;
        }
        if let Some(port) = var("SIGNALK_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.signalk.port = port;
        }
        if let Some(port) = var("TELEMETRY_PORT").and_then(|v| v.parse::<u16>().ok()) {
            let host = self
                .telemetry
                .bind_addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "127.0.0.1".to_string());
            self.telemetry.bind_addr = format!("{}:{}", host, port);
        }
    }
}

impl BosunConfig {
    /// Reject settings the runtime cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.alerts.interval_ms == 0 {
            bail!("alerts.interval_ms must be greater than zero");
        }
        if self.telemetry.stream_interval_ms == 0 {
            bail!("telemetry.stream_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

/// Parse and validate TOML configuration
pub fn parse_config(contents: &str) -> Result<BosunConfig> {
    let config: BosunConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<BosunConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("Invalid config file {}", path))
}
