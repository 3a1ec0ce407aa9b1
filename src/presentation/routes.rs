//! Route definitions and server setup

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::Config;
use crate::presentation::{
    controllers::{
        cache::{get_cache_stats, invalidate_cache},
        detections::{AppState, get_detection_summary, list_detections, run_detections},
        health::{detailed_health_check, health_check},
        tenant::get_tenant_overview,
    },
    middleware::logging_middleware,
    models::*,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::detections::run_detections,
        crate::presentation::controllers::detections::list_detections,
        crate::presentation::controllers::detections::get_detection_summary,
        crate::presentation::controllers::tenant::get_tenant_overview,
        crate::presentation::controllers::cache::get_cache_stats,
        crate::presentation::controllers::cache::invalidate_cache,
        crate::presentation::controllers::health::health_check,
        crate::presentation::controllers::health::detailed_health_check
    ),
    components(
        schemas(
            DetectionRunResponse,
            DetectionListResponse,
            DetectionRecordDto,
            AffectedResourceDto,
            SummaryResponse,
            CategorySummaryDto,
            TenantOverviewResponse,
            OrganizationDto,
            LicenseUsageDto,
            CacheStatsResponse,
            CacheInvalidationRequest,
            CacheInvalidationResponse,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "detections", description = "Detection runs and aggregated findings"),
        (name = "tenant", description = "Cached tenant state overview"),
        (name = "cache", description = "Cache statistics and invalidation"),
        (name = "health", description = "System health monitoring endpoints")
    ),
    info(
        title = "Postura API",
        version = "0.1.0",
        description = "Tenant directory configuration posture analysis API. Polls a remote \
                       directory API, caches tenant state durably, and serves aggregated \
                       detector findings."
    )
)]
pub struct ApiDoc;

/// Create the application router with the middleware stack
pub fn create_router(app_state: AppState, config: &Config) -> Router {
    let api_routes = Router::new()
        .route("/detections/run", post(run_detections))
        .route("/detections", get(list_detections))
        .route("/detections/summary", get(get_detection_summary))
        .route("/tenant", get(get_tenant_overview))
        .route("/cache/stats", get(get_cache_stats))
        .route("/cache/invalidate", post(invalidate_cache));

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check));

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes);

    if config.server.enable_docs {
        router =
            router.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
        .layer(
            ServiceBuilder::new()
                // HTTP tracing
                .layer(TraceLayer::new_for_http())
                // CORS handling
                .layer(cors_layer)
                // Request timeout
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_seconds,
                )))
                // Custom logging middleware
                .layer(middleware::from_fn(logging_middleware)),
        )
        .with_state(app_state)
}
