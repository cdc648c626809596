use serde::Deserialize;
use std::time::Duration;

/// Alert engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Evaluation interval (milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub batteries: BatteryThresholds,
    #[serde(default)]
    pub engines: EngineThresholds,
    #[serde(default)]
    pub safety: SafetyThresholds,
    #[serde(default)]
    pub tanks: TankThresholds,
}

fn default_interval_ms() -> u64 {
    5000
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            batteries: BatteryThresholds::default(),
            engines: EngineThresholds::default(),
            safety: SafetyThresholds::default(),
            tanks: TankThresholds::default(),
        }
    }
}

impl AlertConfig {
    /// Evaluation period, never shorter than 1 ms
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}


/// State-of-charge thresholds (percent)
#[derive(Debug, Clone, Deserialize)]
pub struct BatteryThresholds {
    #[serde(default = "default_soc_critical")]
    pub soc_critical: f64,
    #[serde(default = "default_soc_warning")]
    pub soc_warning: f64,
}

fn default_soc_critical() -> f64 {
    10.0
}

fn default_soc_warning() -> f64 {
    20.0
}

impl Default for BatteryThresholds {
    fn default() -> Self {
        Self {
            soc_critical: default_soc_critical(),
            soc_warning: default_soc_warning(),
        }
    }
}

/// Engine limits, checked only while the engine is running
#[derive(Debug, Clone, Deserialize)]
pub struct EngineThresholds {
    /// °C
    #[serde(default = "default_coolant_temp_max")]
    pub coolant_temp_max: f64,
    /// PSI
    #[serde(default = "default_oil_pressure_min")]
    pub oil_pressure_min: f64,
    /// °C
    #[serde(default = "default_exhaust_temp_max")]
    pub exhaust_temp_max: f64,
}

fn default_coolant_temp_max() -> f64 {
    95.0
}

fn default_oil_pressure_min() -> f64 {
    25.0
}

fn default_exhaust_temp_max() -> f64 {
    500.0
}

impl Default for EngineThresholds {
    fn default() -> Self {
        Self {
            coolant_temp_max: default_coolant_temp_max(),
            oil_pressure_min: default_oil_pressure_min(),
            exhaust_temp_max: default_exhaust_temp_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyThresholds {
    /// Metres under the transducer/keel
    #[serde(default = "default_depth_minimum")]
    pub depth_minimum: f64,
    /// Metres; used when the vessel does not publish its own anchor radius
    #[serde(default = "default_anchor_alarm_radius")]
    pub anchor_alarm_radius: f64,
    #[serde(default = "default_bilge_window_minutes")]
    pub bilge_window_minutes: i64,
    /// Activations tolerated inside the window
    #[serde(default = "default_bilge_cycles_max")]
    pub bilge_cycles_max: usize,
}

fn default_depth_minimum() -> f64 {
    2.5
}

fn default_anchor_alarm_radius() -> f64 {
    30.0
}

fn default_bilge_window_minutes() -> i64 {
    30
}

fn default_bilge_cycles_max() -> usize {
    6
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            depth_minimum: default_depth_minimum(),
            anchor_alarm_radius: default_anchor_alarm_radius(),
            bilge_window_minutes: default_bilge_window_minutes(),
            bilge_cycles_max: default_bilge_cycles_max(),
        }
    }
}

/// Low-level thresholds (percent). Waste water has none.
#[derive(Debug, Clone, Deserialize)]
pub struct TankThresholds {
    #[serde(default = "default_tank_low")]
    pub fuel_low: f64,
    #[serde(default = "default_tank_low")]
    pub water_low: f64,
}

fn default_tank_low() -> f64 {
    15.0
}

impl Default for TankThresholds {
    fn default() -> Self {
        Self {
            fuel_low: default_tank_low(),
            water_low: default_tank_low(),
        }
    }
}
