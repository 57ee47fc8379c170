//! Occupancy Routes

use axum::{extract::State, Json};
use bus_controller::OccupancySnapshot;
use std::sync::Arc;

use crate::AppState;

/// Latest snapshot published by the control loop
pub async fn get_occupancy(State(state): State<Arc<AppState>>) -> Json<OccupancySnapshot> {
    Json(state.occupancy.borrow().clone())
}

#[cfg(test)]
mod tests {
    use crate::{create_router, test_support};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn fetch(router: axum::Router) -> serde_json::Value {
        let response = router
            .oneshot(Request::get("/api/v1/occupancy").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_returns_latest_snapshot() {
        let (state, tx) = test_support::state(12);
        let router = create_router(state);

        let json = fetch(router.clone()).await;
        assert_eq!(json["validated"], 12);
        assert_eq!(json["status"], "NORMAL");
        assert_eq!(json["mismatch"], "none");
        assert_eq!(json["current_stop"], "Pettah");

        tx.send_modify(|snapshot| snapshot.validated = 13);
        let json = fetch(router).await;
        assert_eq!(json["validated"], 13);
    }
}
