//! Postura - Main application entry point

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};

use postura::{
    Config,
    application::{DetectionService, DetectionServiceImpl},
    infrastructure::{
        AdminSprawlDetector, DetectorRegistry, DirectoryApi, DirectoryClient, FileTableStore,
        PersistentCache, StaleAccountsDetector, TableStore, TenantDataService,
        UnusedLicensesDetector, cache::CacheSettings,
    },
    init_tracing,
    presentation::{AppState, create_router},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|_| {
        eprintln!("Failed to load configuration, using defaults");
        Config::default()
    });

    // Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting Postura server...");
    tracing::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    // Initialize infrastructure services
    let store: Arc<dyn TableStore> =
        Arc::new(FileTableStore::new(config.storage.directory.clone()));
    let cache = Arc::new(PersistentCache::open(
        store.clone(),
        CacheSettings::from_config(&config.cache),
    ));

    if config.directory.token.as_deref().unwrap_or("").is_empty() {
        tracing::info!(
            "Directory API token not provided; requests will be sent unauthenticated unless one is supplied via environment."
        );
    }
    let directory_client: Arc<dyn DirectoryApi> = Arc::new(DirectoryClient::new(&config.directory));
    let tenant_data = Arc::new(TenantDataService::new(cache.clone(), directory_client));

    // Register the bundled detectors
    let mut registry = DetectorRegistry::new();
    registry.add(Arc::new(StaleAccountsDetector::new(
        tenant_data.clone(),
        config.detection.stale_account_days,
    )));
    registry.add(Arc::new(UnusedLicensesDetector::new(tenant_data.clone())));
    registry.add(Arc::new(AdminSprawlDetector::new(
        tenant_data.clone(),
        config.detection.privileged_role_ceiling,
    )));
    tracing::info!("Registered {} detectors", registry.len());

    let detection_service: Arc<dyn DetectionService> = Arc::new(DetectionServiceImpl::new(
        Arc::new(registry),
        store,
        Duration::from_secs(config.detection.list_cache_ttl_seconds),
    ));

    // Create application state
    let app_state = AppState {
        detection_service,
        tenant_data,
        cache: cache.clone(),
    };

    // Create router
    let app = create_router(app_state, &config);

    // Create server address
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    tracing::info!("Server listening on {}", addr);
    if config.server.enable_docs {
        tracing::info!("API documentation available at http://{}/docs", addr);
    } else {
        tracing::info!("API documentation disabled (enable_docs=false)");
    }

    // Start server with graceful shutdown
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.close();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
