//! Bus Occupancy Status API
//!
//! Read-only HTTP view of the control loop: latest occupancy snapshot,
//! recent alerts and telemetry, and Prometheus metrics.

use axum::{extract::State, routing::get, Json, Router};
use bus_controller::OccupancySnapshot;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::TelemetryLog;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod routes;
pub mod settings;

pub use settings::{MonitorSettings, PanelSettings, SettingsError};

/// Snapshot age after which the control loop counts as stalled
const STALE_AFTER: Duration = Duration::from_secs(5);

/// Application state shared across handlers
pub struct AppState {
    /// Latest snapshot published by the control loop
    pub occupancy: watch::Receiver<OccupancySnapshot>,
    /// Recent telemetry records
    pub telemetry: Arc<TelemetryLog>,
    /// Prometheus renderer
    pub metrics: PrometheusHandle,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        occupancy: watch::Receiver<OccupancySnapshot>,
        telemetry: Arc<TelemetryLog>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            occupancy,
            telemetry,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub control_loop: ComponentHealth,
    pub telemetry: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub last_activity_ms: Option<u64>,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub telemetry_records: usize,
    pub alerts_fired: u64,
    pub daily_passengers: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/occupancy", get(routes::occupancy::get_occupancy))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/api/v1/telemetry", get(routes::telemetry::get_telemetry))
        .route(
            "/api/v1/telemetry/uploads.csv",
            get(routes::telemetry::get_uploads_csv),
        )
        .route("/metrics", get(routes::metrics::get_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = Utc::now();
    let (snapshot_age, alerts_fired, daily_passengers) = {
        let snapshot = state.occupancy.borrow();
        let age = (now - snapshot.timestamp).to_std().unwrap_or(Duration::ZERO);
        (age, snapshot.alerts_fired, snapshot.daily_passengers)
    };

    let loop_ok = snapshot_age < STALE_AFTER;
    let response = HealthResponse {
        status: if loop_ok { "healthy" } else { "degraded" }.to_string(),
        timestamp: now,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            control_loop: ComponentHealth {
                status: if loop_ok { "ok" } else { "stale" }.to_string(),
                last_activity_ms: Some(snapshot_age.as_millis() as u64),
            },
            telemetry: ComponentHealth {
                status: "ok".to_string(),
                last_activity_ms: None,
            },
        },
        metrics: SystemMetrics {
            telemetry_records: state.telemetry.len(),
            alerts_fired,
            daily_passengers,
        },
    };

    Json(response)
}

/// Initialize logging
pub fn init_logging(level: &str, json: bool) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .expect("Failed to set tracing subscriber");
}

/// Run the server until `shutdown` resolves
pub async fn run_server(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use occupancy_status::StatusTier;
    use sensor_fusion::MismatchLevel;
    use stop_tracker::LegTally;

    pub fn snapshot(validated: u32) -> OccupancySnapshot {
        OccupancySnapshot {
            bus_id: "BUS-138-CMB".to_string(),
            route: "138 Colombo-Nugegoda".to_string(),
            timestamp: Utc::now(),
            validated,
            capacity: 50,
            occupancy_percent: f64::from(validated) * 2.0,
            status: StatusTier::Normal,
            ir_count: validated,
            camera_count: validated,
            mismatch: MismatchLevel::None,
            current_stop: "Pettah".to_string(),
            next_stop: "Maradana".to_string(),
            at_stop: true,
            lat: 6.9356,
            lon: 79.8487,
            daily_passengers: 40,
            leg: LegTally::default(),
            alerts_fired: 1,
        }
    }

    /// State plus the sender side of the snapshot channel
    pub fn state(validated: u32) -> (Arc<AppState>, watch::Sender<OccupancySnapshot>) {
        let (tx, rx) = watch::channel(snapshot(validated));
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::new(rx, Arc::new(TelemetryLog::new(100)), handle);
        (Arc::new(state), tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_fresh_loop() {
        let (state, _tx) = test_support::state(12);
        let response = create_router(state)
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"]["control_loop"]["status"], "ok");
        assert_eq!(json["metrics"]["alerts_fired"], 1);
    }

    #[tokio::test]
    async fn test_health_flags_stale_snapshot() {
        let (state, tx) = test_support::state(12);
        tx.send_modify(|snapshot| snapshot.timestamp = Utc::now() - chrono::Duration::seconds(30));

        let response = create_router(state)
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["components"]["control_loop"]["status"], "stale");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (state, _tx) = test_support::state(0);
        let response = create_router(state)
            .oneshot(Request::get("/api/v1/sensors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
