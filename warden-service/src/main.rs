use std::net::SocketAddr;
use tokio::signal;
use warden_service::{
    build_router,
    config::WardenConfig,
    db,
    services::{provider_from_config, AccountService, Database, RequestService, RoleService},
    AppState,
};

use service_core::error::AppError;
use service_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = WardenConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting IAM service"
    );

    // Initialize database connection
    tracing::info!("Initializing database connection");
    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(anyhow::anyhow!(e)))?;
    let database = Database::new(pool);
    tracing::info!("Database initialized successfully");

    // One shared HTTP client, injected into the OAuth2 provider.
    let http = reqwest::Client::new();
    let provider = provider_from_config(&config, http, database.clone());
    tracing::info!(provider = ?config.oauth2.provider, "OAuth2 provider initialized");

    // Initialize services
    let accounts = AccountService::new(database.clone(), provider.clone());
    let roles = RoleService::new(database.clone());
    let requests = RequestService::new(database.clone());

    // Create application state
    let state = AppState {
        config: config.clone(),
        db: database,
        accounts,
        roles,
        requests,
        provider,
    };

    // Build application router
    let app = build_router(state).await?;

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

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
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
