use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod llm;
mod models;
mod repositories;
mod routes;
mod state;

use auth::{
    jwt::JwtConfig, repositories::PgCredentialStore, session::SessionManager,
    verification_cache::VerificationCacheConfig,
};
use common::database::{self, DatabaseConfig, init_pool};

use crate::{
    llm::{CompletionClient, CompletionConfig},
    repositories::{CollectionRepository, TranslationRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    // Access tokens are verified with the same secrets the auth service signs with
    let jwt_config = JwtConfig::from_env()?;
    let sessions = SessionManager::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        &jwt_config,
        VerificationCacheConfig::default(),
    )?;

    let completions = CompletionClient::new(CompletionConfig::from_env()?)?;

    let app_state = AppState {
        sessions,
        translation_repository: TranslationRepository::new(pool.clone()),
        collection_repository: CollectionRepository::new(pool),
        completions,
    };

    info!("API service initialized successfully");

    let app = routes::create_router(app_state);

    let bind_addr = auth::env::string("API_BIND_ADDR", "0.0.0.0:3001");
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("API service listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down API service");
        })
        .await?;

    Ok(())
}
