// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use tracing::{info, warn};

use super::config::env_flag;

/// Run all database migrations
///
/// Tables are created if missing. Existing data is only dropped when
/// `RESET_DB=true`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if env_flag("RESET_DB") {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    create_schema(pool).await?;

    info!("✅ Database migration completed successfully!");
    Ok(())
}

/// Creates every table and index. Safe to call repeatedly.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_auth_tables(pool).await?;
    create_restaurant_tables(pool).await?;
    create_indexes(pool).await?;

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // children first
    for table in ["restaurants", "sessions", "oauth_accounts", "users"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn create_auth_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS oauth_accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            provider TEXT NOT NULL,
            provider_user_id TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (provider, provider_user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // created_at / expires_at are unix seconds so expiry is a plain integer compare
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_restaurant_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS restaurants (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            address TEXT,
            latitude REAL CHECK (latitude IS NULL OR (latitude >= -90 AND latitude <= 90)),
            longitude REAL CHECK (longitude IS NULL OR (longitude >= -180 AND longitude <= 180)),
            rating_half_points INTEGER CHECK (rating_half_points IS NULL OR (rating_half_points >= 0 AND rating_half_points <= 20)),
            price_range INTEGER CHECK (price_range IS NULL OR (price_range >= 1 AND price_range <= 5)),
            descriptors TEXT NOT NULL DEFAULT '[]',
            menu_items TEXT NOT NULL DEFAULT '[]',
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK ((latitude IS NULL) = (longitude IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_oauth_accounts_user ON oauth_accounts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)",
        "CREATE INDEX IF NOT EXISTS idx_restaurants_user ON restaurants(user_id)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
