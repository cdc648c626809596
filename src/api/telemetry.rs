use crate::alerts::Alert;
use crate::api::history::AlertHistory;
use crate::api::scenario::{ProxyError, ScenarioClient};
use crate::signalk::{SignalKClient, Snapshot};
use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

const MIN_STREAM_INTERVAL: Duration = Duration::from_millis(1);

/// Shared state for the telemetry API
pub struct TelemetryAppState {
    pub client: Arc<SignalKClient>,
    pub history: Arc<AlertHistory>,
    pub scenarios: Arc<ScenarioClient>,
    /// Push interval for /telemetry/live
    pub stream_interval: Duration,
    /// How many recent alerts ride along with each payload
    pub recent_alerts: usize,
}

/// Snapshot plus the most recent alerts (oldest first)
#[derive(Serialize)]
pub struct LivePayload {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(rename = "_alerts")]
    pub alerts: Vec<Alert>,
}

/// One push-stream tick, or one pull response
pub enum TelemetryPayload {
    Live(Box<LivePayload>),
    Disconnected,
}

impl TelemetryPayload {
    pub fn build(state: &TelemetryAppState) -> Self {
        if !state.client.is_connected() {
            return TelemetryPayload::Disconnected;
        }
        TelemetryPayload::Live(Box::new(LivePayload {
            snapshot: state.client.get_snapshot(),
            alerts: state.history.recent(state.recent_alerts),
        }))
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, TelemetryPayload::Live(_))
    }

    /// JSON body for the pull endpoint
    pub fn to_json(&self) -> Value {
        match self {
            TelemetryPayload::Live(payload) => {
                serde_json::to_value(payload).unwrap_or_else(|e| {
                    error!(error = %e, "Failed to serialize telemetry payload");
                    Value::Null
                })
            }
            TelemetryPayload::Disconnected => {
                json!({"_meta": {"connected": false}, "_alerts": []})
            }
        }
    }

    /// SSE event for the push stream. Disconnected ticks use the `status`
    /// event name so clients can tell them apart.
    pub fn to_event(&self) -> Event {
        match self {
            TelemetryPayload::Live(_) => Event::default().data(self.to_json().to_string()),
            TelemetryPayload::Disconnected => Event::default()
                .event("status")
                .data(json!({"connected": false}).to_string()),
        }
    }
}

/// Logs when a push-stream client goes away; dropped together with the
/// stream (and its timer).
struct StreamGuard;

impl Drop for StreamGuard {
    fn drop(&mut self) {
        info!("Telemetry stream client disconnected");
    }
}

/// One payload immediately, then one per `stream_interval` (at least 1 ms)
///
/// The interval lives inside the stream, so dropping the stream stops the
/// timer.
pub fn payload_stream(state: Arc<TelemetryAppState>) -> impl Stream<Item = TelemetryPayload> {
    let mut ticker = interval(state.stream_interval.max(MIN_STREAM_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let guard = StreamGuard;

    IntervalStream::new(ticker).map(move |_| {
        let _guard = &guard;
        TelemetryPayload::build(&state)
    })
}

/// Create telemetry API router
pub fn create_telemetry_router(state: Arc<TelemetryAppState>) -> Router {
    Router::new()
        .route("/telemetry/live", get(live))
        .route("/telemetry/latest", get(latest))
        .route("/telemetry/scenarios", get(list_scenarios))
        .route("/telemetry/scenario/:name", post(switch_scenario))
        .route("/telemetry/alerts", get(alerts))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /telemetry/live - SSE push stream
async fn live(
    State(state): State<Arc<TelemetryAppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Telemetry stream client connected");
    let events = payload_stream(state).map(|payload| Ok(payload.to_event()));
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// GET /telemetry/latest - pull snapshot
async fn latest(State(state): State<Arc<TelemetryAppState>>) -> Json<Value> {
    Json(TelemetryPayload::build(&state).to_json())
}

/// GET /telemetry/scenarios
async fn list_scenarios(
    State(state): State<Arc<TelemetryAppState>>,
) -> Result<Json<Value>, ProxyError> {
    state.scenarios.list_scenarios().await.map(Json)
}

/// POST /telemetry/scenario/:name
async fn switch_scenario(
    State(state): State<Arc<TelemetryAppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ProxyError> {
    let result = state.scenarios.switch_scenario(&name).await?;
    info!(scenario = %name, "Scenario switched");
    Ok(Json(result))
}

#[derive(Serialize)]
struct AlertsResponse {
    alerts: Vec<Alert>,
}

/// GET /telemetry/alerts - whole history, most recent first
async fn alerts(State(state): State<Arc<TelemetryAppState>>) -> Json<AlertsResponse> {
    Json(AlertsResponse {
        alerts: state.history.newest_first(),
    })
}
