//! Alert Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::AlertRecord;
use tracing::warn;

use crate::AppState;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<AlertRecord>,
    pub count: usize,
    /// Alerts raised since start, including ones no longer retained
    pub fired_total: u64,
}

/// Get recent overcrowding alerts, newest first
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Json<AlertResponse> {
    let limit = params.limit.min(1000);
    let alerts = state.telemetry.alerts(limit).unwrap_or_else(|e| {
        warn!("Failed to read alerts: {}", e);
        Vec::new()
    });
    let fired_total = state.occupancy.borrow().alerts_fired;

    Json(AlertResponse {
        count: alerts.len(),
        fired_total,
        data: alerts,
    })
}

#[cfg(test)]
mod tests {
    use crate::{create_router, test_support};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use occupancy_status::StatusTier;
    use telemetry::{AlertRecord, TelemetryRecord};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn alert(count: u32) -> TelemetryRecord {
        TelemetryRecord::Alert(AlertRecord {
            id: Uuid::new_v4(),
            alert_type: StatusTier::Overcrowded,
            bus_id: "BUS-138-CMB".to_string(),
            passenger_count: count,
            occupancy_percent: f64::from(count) * 2.0,
            location: "Borella".to_string(),
            lat: 6.9146,
            lon: 79.8779,
            timestamp: Utc::now(),
            action_required: "Deploy additional bus".to_string(),
        })
    }

    #[tokio::test]
    async fn test_alerts_respect_limit() {
        let (state, _tx) = test_support::state(45);
        for count in [40, 42, 45] {
            state.telemetry.record(alert(count)).unwrap();
        }

        let response = create_router(state)
            .oneshot(
                Request::get("/api/v1/alerts?limit=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["count"], 2);
        assert_eq!(json["fired_total"], 1);
        assert_eq!(json["data"][0]["passenger_count"], 45);
        assert_eq!(json["data"][0]["alert_type"], "OVERCROWDED");
        assert_eq!(json["data"][0]["action_required"], "Deploy additional bus");
    }
}
