//! REST handlers for the summary query endpoint and operational probes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use yatri_aggregator::Aggregator;
use yatri_cache::SummaryCache;
use yatri_core::types::{Summary, Window};
use yatri_core::YatriError;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SummaryCache<Aggregator>>,
    pub node_id: String,
    pub start_time: Instant,
}

/// Query parameters for `GET /summary`. Bounds are RFC 3339 timestamps.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    pub window_start: Option<String>,
    pub window_end: Option<String>,
}

fn parse_bound(raw: Option<&str>, name: &str) -> Result<DateTime<Utc>, YatriError> {
    let raw = raw.ok_or_else(|| YatriError::NotFound(format!("missing '{name}' parameter")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| YatriError::NotFound(format!("malformed '{name}': {e}")))
}

/// Validate the window parameter at the API boundary.
fn parse_window(params: &SummaryParams) -> Result<Window, YatriError> {
    let start = parse_bound(params.window_start.as_deref(), "windowStart")?;
    let end = parse_bound(params.window_end.as_deref(), "windowEnd")?;
    Window::new(start, end)
}

fn error_response(error: &YatriError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match error {
        YatriError::NotFound(_) => (StatusCode::NOT_FOUND, "window_not_found"),
        YatriError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "summary_unavailable"),
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: error.to_string(),
        }),
    )
}

/// GET /summary — cached summary for the requested window.
pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Summary>, (StatusCode, Json<ErrorResponse>)> {
    let window = match parse_window(&params) {
        Ok(window) => window,
        Err(e) => {
            warn!(error = %e, "Summary request with malformed window");
            metrics::counter!("api.malformed_windows").increment(1);
            return Err(error_response(&e));
        }
    };

    match state.cache.get(window).await {
        Ok(summary) => Ok(Json(summary.as_ref().clone())),
        Err(e) => {
            error!(error = %e, %window, "Summary lookup failed");
            metrics::counter!("api.errors").increment(1);
            Err(error_response(&e))
        }
    }
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use yatri_core::types::{RideEventDraft, RideOutcome};
    use yatri_store::EventStore;

    fn test_state(store: Arc<EventStore>) -> AppState {
        let aggregator = Arc::new(Aggregator::new(store));
        AppState {
            cache: Arc::new(SummaryCache::with_ttl(
                aggregator,
                std::time::Duration::from_secs(60),
                std::time::Duration::from_secs(600),
            )),
            node_id: "test-node".to_string(),
            start_time: Instant::now(),
        }
    }

    fn seed_worked_example(store: &EventStore) {
        let ts = "2024-03-11T08:30:00Z".parse().unwrap();
        store
            .append(RideEventDraft {
                timestamp: Some(ts),
                zone: "Whitefield".to_string(),
                fare: 200.0,
                outcome: RideOutcome::Completed,
            })
            .unwrap();
        store
            .append(RideEventDraft {
                timestamp: Some(ts),
                zone: "Whitefield".to_string(),
                fare: 150.0,
                outcome: RideOutcome::Cancelled,
            })
            .unwrap();
    }

    async fn get(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_summary_happy_path() {
        let store = Arc::new(EventStore::new());
        seed_worked_example(&store);
        let router = build_router(test_state(store));

        let (status, json) = get(
            router,
            "/summary?windowStart=2024-03-11T00:00:00Z&windowEnd=2024-03-12T00:00:00Z",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalRides"], 2);
        assert_eq!(json["completionRate"], 50.0);
        assert_eq!(json["totalRevenue"], 200.0);
        assert_eq!(json["peakHours"][0]["hour"], 8);
        assert_eq!(json["zoneRevenue"][0]["zone"], "Whitefield");
        assert_eq!(json["cancellationByHour"][0]["rate"], 50.0);
    }

    #[tokio::test]
    async fn test_summary_rejects_inverted_window() {
        let store = Arc::new(EventStore::new());
        let router = build_router(test_state(store));

        let (status, json) = get(
            router,
            "/summary?windowStart=2024-03-12T00:00:00Z&windowEnd=2024-03-11T00:00:00Z",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "window_not_found");
    }

    #[tokio::test]
    async fn test_summary_rejects_missing_bound() {
        let store = Arc::new(EventStore::new());
        let router = build_router(test_state(store));

        let (status, json) = get(router, "/summary?windowStart=2024-03-11T00:00:00Z").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "window_not_found");
    }

    #[tokio::test]
    async fn test_summary_rejects_unparseable_bound() {
        let store = Arc::new(EventStore::new());
        let router = build_router(test_state(store));

        let (status, _) = get(
            router,
            "/summary?windowStart=yesterday&windowEnd=2024-03-11T00:00:00Z",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_window_returns_zero_summary() {
        let store = Arc::new(EventStore::new());
        let router = build_router(test_state(store));

        let (status, json) = get(
            router,
            "/summary?windowStart=2024-03-11T00:00:00Z&windowEnd=2024-03-12T00:00:00Z",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalRides"], 0);
        assert_eq!(json["peakHours"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let store = Arc::new(EventStore::new());
        let router = build_router(test_state(store));

        let (status, json) = get(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["node_id"], "test-node");
    }
}
