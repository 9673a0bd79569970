//! Integration tests for TeamAvail

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use teamavail::api::{AppState, FAILED_STORE_HEADER, create_router};
use teamavail::availability::{AvailabilityService, SubmitError};
use teamavail::cache::{KeyValueStore, MemoryStore, SnapshotCache};
use teamavail::config::{CacheBackend, CacheConfig, Config};
use teamavail::history::HistoryFile;
use teamavail::snapshot::{KeySpace, Snapshot};

fn service(root: &std::path::Path, store: Arc<MemoryStore>, ttl: Duration) -> AvailabilityService {
    AvailabilityService::new(
        HistoryFile::new(root.join("output").join("history.json")),
        SnapshotCache::new(store, KeySpace::default(), ttl),
    )
}

#[tokio::test]
async fn test_history_file_and_latest_pointer_agree() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let svc = service(dir.path(), store.clone(), Duration::from_secs(3600));

    let snapshots = [
        json!({"team": "A", "available": true}),
        json!([1, "two", null, {"three": 3.5}]),
        json!("just a string"),
        json!({"nested": {"deep": {"deeper": [true, false]}}}),
    ];

    for value in snapshots {
        let snapshot = Snapshot::new(value);
        svc.submit(&snapshot).await.unwrap();

        let from_cache = svc.latest().await.unwrap().unwrap();
        let raw_file = std::fs::read_to_string(svc.history().path()).unwrap();
        let from_file: Value = serde_json::from_str(&raw_file).unwrap();
        let raw_latest = store.get("availability:latest").await.unwrap().unwrap();

        assert_eq!(from_cache, snapshot);
        assert_eq!(&from_file, snapshot.as_value());
        assert_eq!(serde_json::from_str::<Value>(&raw_latest).unwrap(), from_file);
    }
}

#[tokio::test]
async fn test_snapshot_key_lifetime_is_independent_of_latest() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let svc = service(dir.path(), store, Duration::from_millis(80));

    let first = Snapshot::new(json!({"n": 1}));
    let receipt = svc.submit(&first).await.unwrap();
    assert_eq!(svc.cache().fetch(&receipt.key).await.unwrap(), Some(first.clone()));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(svc.cache().fetch(&receipt.key).await.unwrap().is_none());
    assert_eq!(svc.latest().await.unwrap(), Some(first));
}

#[tokio::test]
async fn test_flushed_store_reads_as_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let svc = service(dir.path(), store.clone(), Duration::from_secs(3600));

    svc.submit(&Snapshot::new(json!({"team": "A"}))).await.unwrap();
    store.clear();

    assert!(svc.latest().await.unwrap().is_none());
    // The history file is untouched by a cache flush
    assert!(svc.history().load().await.unwrap().is_some());
}

#[tokio::test]
async fn test_history_failure_is_distinct_and_leaves_cache_alone() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("output"), "").unwrap();
    let store = Arc::new(MemoryStore::new());
    let svc = service(dir.path(), store.clone(), Duration::from_secs(3600));

    let err = svc
        .submit(&Snapshot::new(json!({"team": "A"})))
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::History(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_http_scenario_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.history.output_dir = dir.path().join("output");
    config.static_files.enabled = false;
    config.cache = CacheConfig {
        backend: CacheBackend::Memory,
        ..CacheConfig::default()
    };

    let store = teamavail::cache::open_store(&config.cache).await.unwrap();
    let svc = AvailabilityService::new(
        HistoryFile::from_config(&config.history),
        SnapshotCache::from_config(store, &config.cache),
    );
    let app = create_router(Arc::new(AppState { service: svc }), &config);

    let latest = || {
        Request::builder()
            .uri("/api/latest-availability")
            .body(Body::empty())
            .unwrap()
    };

    // Fresh store
    let response = app.clone().oneshot(latest()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        serde_json::from_slice::<Value>(&bytes).unwrap(),
        json!({"message": "No data found"})
    );

    // Two submits, last one wins
    for body in [r#"{"team":"A","available":true}"#, r#"{"team":"B","available":false}"#] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/save-history")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(FAILED_STORE_HEADER).is_none());
    }

    let response = app.oneshot(latest()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        serde_json::from_slice::<Value>(&bytes).unwrap(),
        json!({"team": "B", "available": false})
    );

    let on_disk = std::fs::read_to_string(config.history.path()).unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(&on_disk).unwrap(),
        json!({"team": "B", "available": false})
    );
}
