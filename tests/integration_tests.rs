//! Integration tests for WeatherLens against an in-process mock of the forecast API

use std::collections::HashMap;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use weatherlens::config::ApiConfig;
use weatherlens::models::{ExtremeKind, FORECAST_HOURS};
use weatherlens::{
    Coordinate, CountryIndex, CountryResolver, CsvExporter, CsvSource, ForecastService,
    ForecastSession, Pin, Provenance, WeatherApiClient, WeatherBackend, WeatherLensError,
};

#[derive(Clone, Default)]
struct MockState {
    fail: bool,
    weather_hits: Arc<AtomicUsize>,
    csv_hits: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<HashMap<String, String>>>>,
}

async fn health() -> &'static str {
    "ok"
}

async fn weather(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.weather_hits.fetch_add(1, Ordering::SeqCst);
    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    // Requests for latitude 10 are slow so a later request can overtake them.
    if params.get("latitude").map(String::as_str) == Some("10") {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    let latitude = params.get("latitude").cloned().unwrap_or_default();
    *state.last_query.lock().unwrap() = Some(params);
    Json(json!({
        "data": {
            "temperature": { "value": 17.4 },
            "precipitation": { "value": 0.5 },
            "humidity": { "value": 71 },
            "windspeed": { "value": "5.5" },
            "air_quality": { "value": 33 },
            "extreme_weather": { "heavy_rain_probability": 0.35, "typhoon_probability": 0 },
            "comfort_index": { "very_wet": 0.6 },
            "climate_description": format!("Mild and damp at latitude {latitude}.")
        }
    }))
    .into_response()
}

async fn history_csv(State(state): State<MockState>) -> Response {
    state.csv_hits.fetch_add(1, Ordering::SeqCst);
    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    "date,precip_mm\n2025-10-04,1.2\n".into_response()
}

async fn nasa(Json(body): Json<Value>) -> Json<Value> {
    let input = body["input"].as_str().unwrap_or_default();
    Json(json!({ "response": format!("You asked: {input}") }))
}

async fn countries() -> &'static str {
    include_str!("fixtures/countries.topo.json")
}

async fn spawn_mock(fail: bool) -> (String, MockState) {
    let state = MockState {
        fail,
        ..MockState::default()
    };
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/weather", get(weather))
        .route("/api/history.csv", get(history_csv))
        .route("/api/nasa", post(nasa))
        .route("/world-atlas/countries-110m.json", get(countries))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn client(base_url: &str) -> Arc<WeatherApiClient> {
    Arc::new(
        WeatherApiClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            ..ApiConfig::default()
        })
        .unwrap(),
    )
}

fn datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 5, 14, 0, 0).unwrap()
}

#[tokio::test]
async fn test_live_forecast() {
    let (base_url, state) = spawn_mock(false).await;
    let service = ForecastService::new(client(&base_url), Duration::ZERO);

    let outcome = service
        .fetch(Some(&Pin::new(35.0, -100.0)), datetime())
        .await
        .unwrap();

    assert!(outcome.advisory.is_none());
    let report = outcome.report;
    assert_eq!(report.provenance, Provenance::Live);
    assert_eq!(report.forecast.hours.len(), FORECAST_HOURS);
    assert_eq!(report.forecast.total, 4.0);
    assert_eq!(report.forecast.summary, "Mild and damp at latitude 35.");
    assert_eq!(report.model.metrics.windspeed, 5.5);
    assert_eq!(report.model.extremes.get(ExtremeKind::HeavyRain), Some(0.35));

    let query = state.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(query["latitude"], "35");
    assert_eq!(query["longitude"], "-100");
    assert_eq!(query["datetime"], "2025-10-05T14:00:00.000Z");
    assert_eq!(query["units"], "metric");
    assert_eq!(state.weather_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let (base_url, state) = spawn_mock(true).await;
    let service = ForecastService::new(client(&base_url), Duration::from_millis(50));

    let outcome = service
        .fetch(Some(&Pin::new(35.0, -100.0)), datetime())
        .await
        .unwrap();

    assert_eq!(outcome.report.provenance, Provenance::Synthetic);
    assert!(matches!(
        outcome.advisory,
        Some(WeatherLensError::Status { status: 500, .. })
    ));
    assert_eq!(state.weather_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_deterministic() {
    // Nothing listens on the discard port.
    let service = ForecastService::new(client("http://127.0.0.1:9"), Duration::ZERO);
    let pin = Pin::new(35.0, -100.0);

    let first = service.fetch(Some(&pin), datetime()).await.unwrap();
    let second = service.fetch(Some(&pin), datetime()).await.unwrap();

    let advisory = first.advisory.unwrap();
    assert!(advisory.is_transport());
    assert_eq!(advisory.user_message(), "API calling error");
    assert_eq!(first.report.forecast.hours.len(), 8);
    assert!(!first.report.forecast.summary.is_empty());
    assert_eq!(first.report, second.report);
}

#[tokio::test]
async fn test_missing_pin_sends_nothing() {
    let (base_url, state) = spawn_mock(false).await;
    let backend = client(&base_url);
    let service = ForecastService::new(backend.clone(), Duration::ZERO);
    let exporter = CsvExporter::new(backend);

    assert!(matches!(
        service.fetch(None, datetime()).await,
        Err(WeatherLensError::MissingInput { .. })
    ));
    assert!(matches!(
        exporter.export(None, None).await,
        Err(WeatherLensError::MissingInput { .. })
    ));
    assert_eq!(state.weather_hits.load(Ordering::SeqCst), 0);
    assert_eq!(state.csv_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_csv_export_remote() {
    let (base_url, _state) = spawn_mock(false).await;
    let exporter = CsvExporter::new(client(&base_url));
    let artifact = exporter
        .export(Some(&Pin::new(35.0, -100.0)), None)
        .await
        .unwrap();
    assert_eq!(artifact.source, CsvSource::Remote);
    assert_eq!(artifact.content, b"date,precip_mm\n2025-10-04,1.2\n");
    assert!(artifact.filename.starts_with("history_35_-100_"));
}

#[tokio::test]
async fn test_csv_export_falls_back_to_local() {
    let (base_url, state) = spawn_mock(true).await;
    let backend = client(&base_url);
    let service = ForecastService::new(backend.clone(), Duration::ZERO);
    let pin = Pin::new(35.0, -100.0);
    let mut report = service.fetch(Some(&pin), datetime()).await.unwrap().report;
    report.forecast.summary = "Say \"when\"".to_string();

    let artifact = CsvExporter::new(backend)
        .export(Some(&pin), Some(&report))
        .await
        .unwrap();
    assert_eq!(artifact.source, CsvSource::Local);
    assert!(artifact.filename.starts_with("forecast_"));
    assert_eq!(state.csv_hits.load(Ordering::SeqCst), 1);

    let csv = String::from_utf8(artifact.content.clone()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "\"time\",\"precip_mm\"");
    assert!(lines[1..=8].iter().all(|l| l.starts_with("\"2025-10-05T")));
    assert_eq!(lines[9], "\"\"");
    assert_eq!(lines[10], "\"metric\",\"value\"");
    assert!(csv.contains("\"summary\",\"Say \"\"when\"\"\""));

    let dir = tempfile::tempdir().unwrap();
    let path = artifact.write_to(dir.path()).await.unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), csv);
}

#[tokio::test]
async fn test_session_keeps_latest_pin() {
    let (base_url, state) = spawn_mock(false).await;
    let service = ForecastService::new(client(&base_url), Duration::ZERO);
    let mut session = ForecastSession::new(service);

    session.request(Some(Pin::new(10.0, 10.0)), datetime());
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.request(Some(Pin::new(35.0, -100.0)), datetime());
    assert!(session.wait().await);

    let report = session.report().unwrap();
    assert_eq!(report.coordinate.latitude, 35.0);
    assert_eq!(report.forecast.summary, "Mild and damp at latitude 35.");
    assert!(session.take_advisory().is_none());

    // The superseded request never lands, even after it would have finished.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(session.report().unwrap().coordinate.latitude, 35.0);
    assert!(state.weather_hits.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_health_and_ask() {
    let (base_url, _state) = spawn_mock(false).await;
    let backend = client(&base_url);
    assert_eq!(backend.health().await.unwrap(), "200 OK\nok");
    assert_eq!(
        backend.ask("Will it rain?").await.unwrap(),
        "You asked: Will it rain?"
    );
}

#[tokio::test]
async fn test_country_topology_from_url() {
    let (base_url, _state) = spawn_mock(false).await;
    let client = client(&base_url);

    let url = format!("{base_url}/world-atlas/countries-110m.json");
    let index = CountryIndex::open(&client, &url).await.unwrap();
    let resolver = CountryResolver::with_index(index);
    assert_eq!(resolver.resolve(Coordinate::new(0.0, 0.0)).name(), Some("Squareland"));
    assert_eq!(resolver.resolve(Coordinate::new(0.0, 30.0)).name(), Some("Eastland"));

    let missing = format!("{base_url}/world-atlas/missing.json");
    assert!(matches!(
        CountryIndex::open(&client, &missing).await,
        Err(WeatherLensError::Status { status: 404, .. })
    ));
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_weatherlens"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("weatherlens"));
    for command in ["health", "forecast", "export", "locate"] {
        assert!(stdout.contains(command), "missing {command}");
    }
}
