//! Database initialization
//!
//! Creates the database file and schema on first run; reopening an existing
//! database is a no-op thanks to `CREATE TABLE IF NOT EXISTS`.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current records schema: three-way result {left, right, same}
const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while an answer insert is in flight
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema_version_table(&pool).await?;
    create_records_table(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the records table
///
/// One row per recorded judgment, append-only. `result` carries the
/// three-way schema; `n_trials` is the 0-based session trial index.
async fn create_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            language TEXT NOT NULL CHECK (language IN ('en', 'fr')),
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            option_left TEXT NOT NULL,
            option_right TEXT NOT NULL,
            n_trials INTEGER NOT NULL,
            result TEXT NOT NULL CHECK (result IN ('left', 'right', 'same')),
            source TEXT,
            created_at TEXT NOT NULL,
            CHECK (n_trials >= 0),
            CHECK (option_left <> option_right)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Resume filtering looks records up by respondent email
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_email ON records(email)")
        .execute(pool)
        .await?;

    Ok(())
}
