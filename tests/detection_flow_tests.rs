//! End-to-end detection flow tests against a mocked directory API

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tower::util::ServiceExt;

use postura::Config;
use postura::application::{DetectionService, DetectionServiceImpl};
use postura::config::DirectoryConfig;
use postura::domain::Category;
use postura::infrastructure::{
    AdminSprawlDetector, DetectorRegistry, DirectoryApi, DirectoryClient, FileTableStore,
    PersistentCache, StaleAccountsDetector, TableStore, TenantDataService, UnusedLicensesDetector,
    cache::CacheSettings,
};
use postura::presentation::{AppState, create_router};

fn directory_config(base_url: String) -> DirectoryConfig {
    DirectoryConfig {
        base_url,
        token: Some("test-token".to_string()),
        timeout_seconds: 5,
        max_retries: 2,
        retry_base_delay_ms: 10,
    }
}

fn users_body() -> serde_json::Value {
    json!({
        "value": [
            {
                "id": "u1",
                "displayName": "Alex Chen",
                "userPrincipalName": "alex@contoso.example",
                "accountEnabled": true,
                "lastSignInAt": "2020-01-01T00:00:00Z"
            },
            {
                "id": "u2",
                "displayName": "Robin Patel",
                "userPrincipalName": "robin@contoso.example",
                "accountEnabled": true
            }
        ]
    })
}

fn licenses_body() -> serde_json::Value {
    json!({
        "value": [
            {
                "skuId": "sku-1",
                "skuPartNumber": "ENTERPRISEPACK",
                "consumedUnits": 60,
                "prepaidUnits": 100
            }
        ]
    })
}

fn roles_body() -> serde_json::Value {
    json!({
        "value": [
            {
                "id": "r1",
                "displayName": "Global Administrator",
                "isPrivileged": true,
                "members": [
                    { "id": "u1", "displayName": "Alex Chen" },
                    { "id": "u2", "displayName": "Robin Patel" },
                    { "id": "u4", "displayName": "Jo Park" }
                ]
            }
        ]
    })
}

fn organization_body() -> serde_json::Value {
    json!({
        "id": "org-1",
        "displayName": "Contoso",
        "countryLetterCode": "US"
    })
}

async fn mock_directory(server: &mut mockito::ServerGuard) {
    for (path, body) in [
        ("/users", users_body()),
        ("/licenses", licenses_body()),
        ("/directoryRoles", roles_body()),
        ("/organization", organization_body()),
    ] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
    }
}

/// Build the full service stack against a mocked directory API
fn build_state(dir: &tempfile::TempDir, base_url: String) -> AppState {
    let store: Arc<dyn TableStore> = Arc::new(FileTableStore::new(dir.path().to_path_buf()));
    let cache = Arc::new(PersistentCache::open(
        store.clone(),
        CacheSettings {
            refresh_delay: Duration::from_millis(5),
            ..CacheSettings::default()
        },
    ));

    let client: Arc<dyn DirectoryApi> =
        Arc::new(DirectoryClient::new(&directory_config(base_url)));
    let tenant_data = Arc::new(TenantDataService::new(cache.clone(), client));

    let mut registry = DetectorRegistry::new();
    registry.add(Arc::new(StaleAccountsDetector::new(tenant_data.clone(), 90)));
    registry.add(Arc::new(UnusedLicensesDetector::new(tenant_data.clone())));
    registry.add(Arc::new(AdminSprawlDetector::new(tenant_data.clone(), 2)));

    let detection_service: Arc<dyn DetectionService> = Arc::new(DetectionServiceImpl::new(
        Arc::new(registry),
        store,
        Duration::from_secs(30),
    ));

    AppState {
        detection_service,
        tenant_data,
        cache,
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.enable_docs = false;
    config
}

#[tokio::test]
async fn full_run_aggregates_findings_from_all_detectors() {
    let mut server = mockito::Server::new_async().await;
    mock_directory(&mut server).await;

    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir, server.url());

    let report = state.detection_service.run_all().await.unwrap();

    // stale_accounts: one aggregated finding for u1 (old sign-in) + u2 (never)
    // unused_licenses: one finding for ENTERPRISEPACK
    // admin_sprawl: Global Administrator has 3 members over a ceiling of 2
    assert_eq!(report.records.len(), 3);
    assert!(report.failed_categories.is_empty());

    let categories: Vec<&str> = report
        .records
        .iter()
        .map(|r| r.category.as_str())
        .collect();
    assert!(categories.contains(&"stale_accounts"));
    assert!(categories.contains(&"unused_licenses"));
    assert!(categories.contains(&"admin_sprawl"));

    // admin_sprawl is high severity and therefore ranked first
    assert_eq!(report.records[0].category.as_str(), "admin_sprawl");

    // A second run upserts the same ids without duplicating rows
    let report = state.detection_service.run_all().await.unwrap();
    assert_eq!(report.records.len(), 3);
    assert_eq!(state.detection_service.get_all(true).await.unwrap().len(), 3);
}

#[tokio::test]
async fn read_api_serves_runs_over_http() {
    let mut server = mockito::Server::new_async().await;
    mock_directory(&mut server).await;

    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir, server.url());
    let router = create_router(state, &test_config());

    // Trigger a run through the HTTP surface
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/detections/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let run: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(run["total"], 3);
    assert_eq!(run["failed_categories"], json!([]));

    // List, filtered by category
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/detections?category=unused_licenses")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["records"][0]["id"], "unused_license:ENTERPRISEPACK");

    // Summary groups by category
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/detections/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["categories"].as_array().unwrap().len(), 3);

    // An invalid category is a client error
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/detections?category=Not%20A%20Category")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Tenant overview is served from the cache
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/tenant")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let overview: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(overview["organization"]["display_name"], "Contoso");
    assert_eq!(overview["total_users"], 2);

    // Cache stats and invalidation round-trip
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/cache/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/cache/invalidate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"entry_type": "users"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let invalidated: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(invalidated["entries_invalidated"], 1);

    // Health endpoints
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn repeated_runs_reuse_cached_tenant_state() {
    let mut server = mockito::Server::new_async().await;
    let users_mock = server
        .mock("GET", "/users")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(users_body().to_string())
        .expect(1)
        .create_async()
        .await;
    for (path, body) in [
        ("/licenses", licenses_body()),
        ("/directoryRoles", roles_body()),
    ] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir, server.url());

    state.detection_service.run_all().await.unwrap();
    state.detection_service.run_all().await.unwrap();

    // Both runs hit the directory only once for users
    users_mock.assert_async().await;
}

#[tokio::test]
async fn authorization_failures_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users")
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let client = DirectoryClient::new(&directory_config(server.url()));
    let result = client.get("/users", &[]).await;

    assert!(result.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_retried_with_backoff() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users")
        .with_status(503)
        // One initial attempt plus max_retries retries
        .expect(3)
        .create_async()
        .await;

    let client = DirectoryClient::new(&directory_config(server.url()));
    let result = client.get("/users", &[]).await;

    assert!(result.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_limit_retry_after_is_parsed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/users")
        .with_status(429)
        .with_header("Retry-After", "1")
        .create_async()
        .await;

    // No retries, so the classified error surfaces directly
    let mut config = directory_config(server.url());
    config.max_retries = 0;
    let client = DirectoryClient::new(&config);

    let error = client.get("/users", &[]).await.unwrap_err();
    match error {
        postura::application::DirectoryError::Api(
            postura::application::ApiError::RateLimited { retry_after },
        ) => {
            assert_eq!(retry_after, Some(Duration::from_secs(1)));
        }
        other => panic!("expected rate-limited error, got {other}"),
    }

    // A failing detector run degrades gracefully instead of erroring the
    // whole orchestrator
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir, server.url());
    let report = state.detection_service.run_all().await.unwrap();
    assert_eq!(report.records.len(), 0);
    assert_eq!(report.failed_categories.len(), 3);
}

#[tokio::test]
async fn detector_failure_is_isolated_in_a_real_run() {
    let mut server = mockito::Server::new_async().await;
    // Users and licenses respond; directoryRoles is broken
    for (path, body) in [("/users", users_body()), ("/licenses", licenses_body())] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
    }
    server
        .mock("GET", "/directoryRoles")
        .with_status(400)
        .with_body("bad request")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir, server.url());

    let report = state.detection_service.run_all().await.unwrap();

    // stale_accounts and unused_licenses still contribute
    assert_eq!(report.records.len(), 2);
    assert_eq!(
        report.failed_categories,
        vec![Category::new("admin_sprawl").unwrap()]
    );
}
