// Integration tests for the /telemetry API
//
// The SignalK client is fed frames directly (no upstream socket), and the
// scenario source is a mockito server.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bosun::alerts::{AlertConfig, AlertEngine};
use bosun::api::{create_telemetry_router, AlertHistory, ScenarioClient, TelemetryAppState};
use bosun::clock::ManualClock;
use bosun::signalk::{SignalKClient, SignalKConfig};
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ── Test state & router ───────────────────────────────────────────────────────

struct TestApp {
    client: Arc<SignalKClient>,
    history: Arc<AlertHistory>,
    router: Router,
}

fn create_test_app(scenario_url: &str) -> TestApp {
    let client = Arc::new(SignalKClient::new(SignalKConfig::default()));
    let history = Arc::new(AlertHistory::new(50));
    let state = Arc::new(TelemetryAppState {
        client: client.clone(),
        history: history.clone(),
        scenarios: Arc::new(ScenarioClient::new(scenario_url).unwrap()),
        stream_interval: std::time::Duration::from_millis(2000),
        recent_alerts: 10,
    });

    TestApp {
        client,
        history,
        router: create_telemetry_router(state),
    }
}

fn frame(values: &[(&str, Value)]) -> String {
    let values: Vec<Value> = values
        .iter()
        .map(|(path, value)| json!({"path": path, "value": value}))
        .collect();
    json!({"updates": [{"values": values}]}).to_string()
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// Upstream down: pull endpoint reports disconnected with no alerts.
#[tokio::test]
async fn test_latest_when_disconnected() {
    let app = create_test_app("http://127.0.0.1:3858");

    let (status, body) = send(&app.router, "GET", "/telemetry/latest").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"_meta": {"connected": false}, "_alerts": []}));
}

/// Connected: pull endpoint returns the full snapshot.
#[tokio::test]
async fn test_latest_snapshot() {
    let app = create_test_app("http://127.0.0.1:3858");
    app.client.mark_connected();
    app.client.process_frame(&frame(&[
        ("navigation.speedOverGround", json!(2.5)),
        ("electrical.batteries.house.capacity.stateOfCharge", json!(0.9)),
        ("tanks.freshWater.bow.currentLevel", json!(0.66)),
    ]));

    let (status, body) = send(&app.router, "GET", "/telemetry/latest").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_meta"]["connected"], true);
    assert_eq!(body["_meta"]["pathCount"], 3);
    assert_eq!(body["navigation"]["sog"], json!(4.9));
    assert_eq!(body["batteries"]["house"]["soc"], json!(90.0));
    assert_eq!(body["tanks"]["freshWater_bow"]["level"], json!(66.0));
    assert_eq!(body["_alerts"], json!([]));
}

/// Alerts raised by the engine land in the history, newest first.
#[tokio::test]
async fn test_alert_history_from_engine() {
    let app = create_test_app("http://127.0.0.1:3858");
    let clock = Arc::new(ManualClock::default());
    let engine = AlertEngine::with_clock(app.client.clone(), AlertConfig::default(), clock.clone());
    engine.subscribe(app.history.clone());

    app.client.mark_connected();
    app.client.process_frame(&frame(&[(
        "environment.depth.belowTransducer",
        json!(1.5),
    )]));
    engine.tick();

    clock.advance(Duration::seconds(10));
    app.client.process_frame(&frame(&[(
        "electrical.batteries.house.capacity.stateOfCharge",
        json!(0.04),
    )]));
    engine.tick();

    let (status, body) = send(&app.router, "GET", "/telemetry/alerts").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["id"], "batt_crit_house");
    assert_eq!(alerts[0]["severity"], "critical");
    assert_eq!(alerts[1]["id"], "shallow");

    // The pull payload carries them oldest first
    let (_, latest) = send(&app.router, "GET", "/telemetry/latest").await;
    assert_eq!(latest["_alerts"][0]["id"], "shallow");
    assert_eq!(latest["_alerts"][1]["id"], "batt_crit_house");
}

/// The live endpoint answers with an event stream.
#[tokio::test]
async fn test_live_is_event_stream() {
    let app = create_test_app("http://127.0.0.1:3858");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/telemetry/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}

/// Scenario list is passed through from the data source.
#[tokio::test]
async fn test_scenarios_proxied() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/scenario")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"current":"sailing","available":{"sailing":"Under sail, engines off"}}"#)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let (status, body) = send(&app.router, "GET", "/telemetry/scenarios").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "sailing");
}

/// Unknown scenario: 400 listing the valid names.
#[tokio::test]
async fn test_unknown_scenario_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/scenario/typhoon")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Unknown","available":["atAnchor","motoring","sailing"]}"#)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let (status, body) = send(&app.router, "POST", "/telemetry/scenario/typhoon").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid input");
    assert_eq!(body["available"], json!(["atAnchor", "motoring", "sailing"]));
}

/// Encoded path separators in the scenario name stay inside /scenario/
#[tokio::test]
async fn test_scenario_name_cannot_escape_path() {
    let mut server = mockito::Server::new_async().await;
    let _list = server
        .mock("GET", "/scenario")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"current":"sailing","available":{"sailing":"Under sail","motoring":"Underway on engines"}}"#)
        .create_async()
        .await;
    let admin = server
        .mock("POST", "/admin")
        .expect(0)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let (status, body) = send(&app.router, "POST", "/telemetry/scenario/..%2F..%2Fadmin").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid input");
    assert_eq!(body["available"], json!(["sailing", "motoring"]));
    admin.assert_async().await;
}

/// Switching to motoring, then feeding the profile's deltas, shows a running
/// engine on the next pull.
#[tokio::test]
async fn test_switch_to_motoring() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/scenario/motoring")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"scenario":"motoring","description":"Underway on engines"}"#)
        .create_async()
        .await;

    let app = create_test_app(&server.url());
    let (status, body) = send(&app.router, "POST", "/telemetry/scenario/motoring").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenario"], "motoring");
    mock.assert_async().await;

    app.client.mark_connected();
    app.client.process_frame(&frame(&[
        ("propulsion.port.revolutions", json!(31.0)),
        ("propulsion.port.oilPressure", json!(320000.0)),
    ]));

    let (_, latest) = send(&app.router, "GET", "/telemetry/latest").await;
    let engine = &latest["engines"]["port"];
    assert!(engine["rpm"].as_f64().unwrap() > 0.0);
    assert!(engine["oilPressure"].as_f64().unwrap() > 0.0);
    assert_eq!(engine["running"], true);
}

/// Data source down: 502 with a distinct error, never a raw transport error.
#[tokio::test]
async fn test_scenario_source_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = create_test_app(&format!("http://{}", addr));
    let (status, body) = send(&app.router, "GET", "/telemetry/scenarios").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream unavailable");

    let (status, _) = send(&app.router, "POST", "/telemetry/scenario/sailing").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
