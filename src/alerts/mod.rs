// Threshold alerting over the live SignalK state

mod alert;
mod config;
mod engine;

pub use alert::{Alert, AlertSubscriber, Severity};
pub use config::{
    AlertConfig, BatteryThresholds, EngineThresholds, SafetyThresholds, TankThresholds,
};
pub use engine::{AlertEngine, ANCHOR_POSITION_PATH, ANCHOR_RADIUS_PATH, BILGE_PUMP_PATH};
