// tests/status_api.rs
mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use http::{Request, StatusCode};
use seismic_alert::api::{create_router, AppState};
use seismic_alert::store::MemoryStore;
use tower::ServiceExt; // for `oneshot`

use common::{channels, cycle_with, event, FakeFeed, RecordingSender};

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn health_and_status_reflect_last_cycle() {
    let cycle = Arc::new(cycle_with(
        FakeFeed::with(vec![
            event(Some("a"), 6.2),
            event(None, 6.0),
            event(Some("a"), 6.2),
        ]),
        Arc::new(MemoryStore::new()),
        RecordingSender::new(),
        channels(&[1, 2]),
    ));
    let app = create_router(AppState {
        cycle: cycle.clone(),
    });

    let (status, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = get(app.clone(), "/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    cycle.run_cycle().await;

    let (status, body) = get(app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["outcome"], "completed");
    assert_eq!(v["fetched"], 3);
    assert_eq!(v["already_announced"], 0);
    assert_eq!(v["duplicates_in_batch"], 1);
    assert_eq!(v["dispatched"], 2);
    assert_eq!(v["unidentified"], 1);
    assert_eq!(v["send_attempts"], 4);
    assert_eq!(v["saved"], true);
}
