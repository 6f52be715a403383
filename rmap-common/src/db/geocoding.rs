//! Geocode cache
//!
//! Derived from production listings after every promotion; only consulted
//! to avoid re-geocoding unchanged addresses.

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;

pub const GEOCODING_TABLE: &str = "geocoding";

/// Previously resolved coordinates for one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GeocodeCacheEntry {
    pub guid: i64,
    pub full_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub(crate) const CREATE_GEOCODING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS geocoding (
        guid INTEGER PRIMARY KEY,
        full_address TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL
    )
"#;

/// Load the whole cache keyed by listing identifier
pub async fn load_geocode_cache(pool: &SqlitePool) -> Result<HashMap<i64, GeocodeCacheEntry>> {
    let entries: Vec<GeocodeCacheEntry> = sqlx::query_as(
        "SELECT guid, full_address, latitude, longitude FROM geocoding",
    )
    .fetch_all(pool)
    .await?;

    Ok(entries.into_iter().map(|e| (e.guid, e)).collect())
}

/// Rebuild the cache from production listings
///
/// Only rows carrying an address and both coordinates are cached.
/// Returns the number of cached rows.
pub async fn rebuild_geocode_cache(conn: &mut SqliteConnection) -> Result<u64> {
    sqlx::query("DROP TABLE IF EXISTS geocoding")
        .execute(&mut *conn)
        .await?;
    sqlx::query(CREATE_GEOCODING_TABLE)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query(
        r#"
        INSERT INTO geocoding (guid, full_address, latitude, longitude)
        SELECT guid, full_address, latitude, longitude
        FROM listings
        WHERE full_address IS NOT NULL
          AND latitude IS NOT NULL
          AND longitude IS NOT NULL
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
