//! Integration tests for the infrastructure components
//!
//! These tests need a reachable PostgreSQL instance (`DATABASE_URL`) and are
//! ignored by default. Run them with `cargo test -- --ignored`.

use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use sqlx::Row;

/// The pool connects, answers the health check and the schema is in place
#[tokio::test]
#[ignore]
async fn test_database_pool_and_schema() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;

    for table in ["users", "translations", "collections", "collection_translations"] {
        let row = sqlx::query("SELECT to_regclass($1) IS NOT NULL AS present")
            .bind(format!("public.{table}"))
            .fetch_one(&pool)
            .await?;
        let present: bool = row.get("present");
        assert!(present, "table {table} is missing");
    }

    Ok(())
}
