// Telemetry distribution API: push stream, pull snapshot, alert history and
// scenario proxy

pub mod history;
pub mod scenario;
pub mod telemetry;

pub use history::AlertHistory;
pub use scenario::{ProxyError, ScenarioClient};
pub use telemetry::{
    create_telemetry_router, payload_stream, LivePayload, TelemetryAppState, TelemetryPayload,
};
