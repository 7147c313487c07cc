pub mod user_auth_tokens;
pub mod users;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;

pub type DbPool = SqlitePool;

/// Initialize the SQLite database
pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    // An in-memory database lives as long as its single connection
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(20)
            .idle_timeout(Duration::from_secs(60))
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?
    };

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Create tables and indexes
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            org_id INTEGER NOT NULL,
            org_name TEXT NOT NULL,
            org_role TEXT NOT NULL DEFAULT 'Viewer',
            login TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            is_admin INTEGER NOT NULL DEFAULT 0,
            help_flags1 INTEGER NOT NULL DEFAULT 0,
            last_seen_at INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_auth_token (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            auth_token TEXT NOT NULL UNIQUE,
            prev_auth_token TEXT NOT NULL DEFAULT '',
            user_agent TEXT NOT NULL DEFAULT '',
            client_ip TEXT NOT NULL DEFAULT '',
            auth_token_seen INTEGER NOT NULL DEFAULT 0,
            seen_at INTEGER NOT NULL DEFAULT 0,
            rotated_at INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_user_auth_token_prev ON user_auth_token(prev_auth_token);
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_user_auth_token_user ON user_auth_token(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Cheap liveness probe for the health endpoint
pub async fn ping(pool: &DbPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
