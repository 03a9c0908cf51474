use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::{
    AppState, env,
    jwt::JwtConfig,
    repositories::PgCredentialStore,
    routes::{self, CookieConfig},
    session::SessionManager,
    verification_cache::VerificationCacheConfig,
};
use common::database;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    let jwt_config = JwtConfig::from_env()?;
    let cache_config = VerificationCacheConfig::from_env()?;
    let store = Arc::new(PgCredentialStore::new(pool));
    let sessions = SessionManager::new(store, &jwt_config, cache_config)?;

    let app_state = AppState {
        sessions,
        cookies: CookieConfig::from_env()?,
    };

    info!("Authentication service initialized successfully");

    let app = routes::create_router(app_state);

    let bind_addr = env::string("AUTH_BIND_ADDR", "0.0.0.0:3000");
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Authentication service listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down authentication service");
}
