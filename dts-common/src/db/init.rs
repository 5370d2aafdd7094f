//! Database initialization
//!
//! Opens (or creates) the SQLite database, creates every table idempotently,
//! then runs versioned migrations from [`crate::db::migrations`].

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Foreign keys must be on for every connection, not just the first,
    // otherwise record deletion would not cascade to effect rows.
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Single connection: every `sqlite::memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_tenant_settings_table(pool).await?;

    // Taxonomy and geography (referenced by disaster records)
    create_hip_tables(pool).await?;
    create_divisions_table(pool).await?;

    create_disaster_records_table(pool).await?;

    // Human effects
    create_human_effect_rows_table(pool).await?;
    create_category_presence_table(pool).await?;

    Ok(())
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

    Ok(())
}

async fn create_tenant_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenant_settings (
            country_accounts_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (country_accounts_id, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_hip_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hip_types (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hip_clusters (
            id TEXT PRIMARY KEY,
            type_id TEXT NOT NULL REFERENCES hip_types(id),
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hip_hazards (
            id TEXT PRIMARY KEY,
            cluster_id TEXT NOT NULL REFERENCES hip_clusters(id),
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_divisions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS divisions (
            id TEXT PRIMARY KEY,
            country_accounts_id TEXT NOT NULL,
            parent_id TEXT,
            name TEXT NOT NULL,
            level INTEGER NOT NULL DEFAULT 1,
            geojson TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_disaster_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS disaster_records (
            id TEXT PRIMARY KEY,
            country_accounts_id TEXT NOT NULL,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            hip_hazard_id TEXT REFERENCES hip_hazards(id),
            division_id TEXT REFERENCES divisions(id),
            start_date TEXT,
            total_damages REAL,
            total_losses REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per (record, table, dimension tuple)
///
/// `dimension_key` is the canonical JSON of the set dimension values; the
/// grand-total row has key `{}`. The UNIQUE constraint is the only guard
/// against two concurrent editors creating the same tuple.
async fn create_human_effect_rows_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS human_effect_rows (
            id TEXT PRIMARY KEY,
            record_id TEXT NOT NULL REFERENCES disaster_records(id) ON DELETE CASCADE,
            table_id TEXT NOT NULL,
            dimension_key TEXT NOT NULL,
            dimensions TEXT NOT NULL DEFAULT '{}',
            metrics TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (record_id, table_id, dimension_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_category_presence_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS human_category_presence (
            record_id TEXT NOT NULL REFERENCES disaster_records(id) ON DELETE CASCADE,
            table_id TEXT NOT NULL,
            dimension TEXT NOT NULL,
            present INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (record_id, table_id, dimension)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
