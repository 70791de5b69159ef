//! Integration test for the full summary query flow:
//! event store -> aggregator -> summary cache -> HTTP router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;
use yatri_aggregator::Aggregator;
use yatri_api::rest::AppState;
use yatri_api::server::build_router;
use yatri_cache::SummaryCache;
use yatri_core::types::{RideEventDraft, RideOutcome};
use yatri_store::EventStore;

fn sample_ride(ts: &str, zone: &str, fare: f64, outcome: RideOutcome) -> RideEventDraft {
    RideEventDraft {
        timestamp: Some(ts.parse().expect("valid RFC 3339 timestamp")),
        zone: zone.to_string(),
        fare,
        outcome,
    }
}

fn build_app(store: Arc<EventStore>) -> axum::Router {
    let aggregator = Arc::new(Aggregator::new(store));
    let cache = Arc::new(SummaryCache::with_ttl(
        aggregator,
        Duration::from_secs(60),
        Duration::from_secs(600),
    ));
    build_router(AppState {
        cache,
        node_id: "itest-node".to_string(),
        start_time: Instant::now(),
    })
}

async fn get_json(router: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("body reads");
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

const DAY: &str = "windowStart=2024-03-11T00:00:00Z&windowEnd=2024-03-12T00:00:00Z";

#[tokio::test]
async fn test_summary_flow_end_to_end() {
    let store = Arc::new(EventStore::new());
    store
        .append(sample_ride(
            "2024-03-11T08:10:00Z",
            "Whitefield",
            200.0,
            RideOutcome::Completed,
        ))
        .unwrap();
    store
        .append(sample_ride(
            "2024-03-11T08:40:00Z",
            "Koramangala",
            100.0,
            RideOutcome::Completed,
        ))
        .unwrap();
    store
        .append(sample_ride(
            "2024-03-11T18:05:00Z",
            "Indiranagar",
            100.0,
            RideOutcome::Cancelled,
        ))
        .unwrap();

    let router = build_app(store.clone());

    let (status, json) = get_json(&router, &format!("/summary?{DAY}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalRides"], 3);
    assert_eq!(json["totalRevenue"], 300.0);
    // Hour 8 has two rides, hour 18 one.
    assert_eq!(json["peakHours"][0]["hour"], 8);
    assert_eq!(json["peakHours"][0]["rides"], 2);
    assert_eq!(json["peakHours"][1]["hour"], 18);
    // Zones tie at 100 vs 200: Whitefield leads, then the tied pair in
    // lexicographic order would apply; here Koramangala is alone at 100.
    assert_eq!(json["zoneRevenue"][0]["zone"], "Whitefield");
    assert_eq!(json["zoneRevenue"][1]["zone"], "Koramangala");
    // Cancelled Indiranagar ride earned nothing, so it is not ranked.
    assert_eq!(json["zoneRevenue"].as_array().unwrap().len(), 2);

    let first_version = json["version"].as_u64().unwrap();

    // Unchanged store: the cached snapshot is served as-is.
    let (_, cached) = get_json(&router, &format!("/summary?{DAY}")).await;
    assert_eq!(cached["version"].as_u64().unwrap(), first_version);

    // A new append invalidates the cache and a fresh snapshot appears.
    store
        .append(sample_ride(
            "2024-03-11T09:00:00Z",
            "Hebbal",
            80.0,
            RideOutcome::Completed,
        ))
        .unwrap();

    let (status, refreshed) = get_json(&router, &format!("/summary?{DAY}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["totalRides"], 4);
    assert!(refreshed["version"].as_u64().unwrap() > first_version);
}

#[tokio::test]
async fn test_summary_flow_malformed_window() {
    let store = Arc::new(EventStore::new());
    let router = build_app(store);

    let (status, json) = get_json(
        &router,
        "/summary?windowStart=2024-03-12T00:00:00Z&windowEnd=2024-03-11T00:00:00Z",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "window_not_found");
    assert!(json["message"].as_str().unwrap().contains("before start"));
}

#[tokio::test]
async fn test_probes_respond() {
    let store = Arc::new(EventStore::new());
    let router = build_app(store);

    let (health, _) = get_json(&router, "/health").await;
    assert_eq!(health, StatusCode::OK);
    let (live, _) = get_json(&router, "/live").await;
    assert_eq!(live, StatusCode::OK);
}
