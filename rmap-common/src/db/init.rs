//! Database initialization
//!
//! Creates the database file on first run and every table the services
//! need. Safe to call on every startup.

use crate::db::geocoding::CREATE_GEOCODING_TABLE;
use crate::db::meta::CREATE_META_TABLE;
use crate::db::table_schemas::{create_listing_table_sql, sync_listing_table, ListingTable};
use crate::schema::LISTING_SCHEMA_VERSION;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL: the public API reads while the admin service writes
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema_version_table(&pool).await?;
    create_listing_tables(&pool).await?;
    sqlx::query(CREATE_GEOCODING_TABLE).execute(&pool).await?;
    sqlx::query(CREATE_META_TABLE).execute(&pool).await?;

    // Add any columns introduced since the tables were created
    sync_listing_table(&pool, ListingTable::Production).await?;
    sync_listing_table(&pool, ListingTable::Staging).await?;

    record_schema_version(&pool).await?;

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

    Ok(())
}

async fn create_listing_tables(pool: &SqlitePool) -> Result<()> {
    for table in [ListingTable::Production, ListingTable::Staging] {
        sqlx::query(&create_listing_table_sql(table.name(), true))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn record_schema_version(pool: &SqlitePool) -> Result<()> {
    let inserted = sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(LISTING_SCHEMA_VERSION)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Listing schema version {} recorded", LISTING_SCHEMA_VERSION);
    }
    Ok(())
}

/// Highest listing schema version applied to this database
pub async fn current_schema_version(pool: &SqlitePool) -> Result<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}
