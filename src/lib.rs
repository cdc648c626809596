// Time source shared by the client and the alert engine
pub mod clock;

// Configuration
pub mod config;

// Great-circle distance
pub mod geo;

// SignalK client, unit conversion and discovery
pub mod signalk;

// Threshold alert engine
pub mod alerts;

// Telemetry distribution API
pub mod api;
