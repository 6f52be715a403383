//! Promotion audit log

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

/// One completed promotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PromotionRecord {
    pub id: i64,
    pub updated_at: DateTime<Utc>,
    /// Acting admin
    pub email: String,
    /// Name of the uploaded file that was promoted
    pub filename: Option<String>,
    pub row_count: i64,
}

pub(crate) const CREATE_META_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS meta (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        updated_at TIMESTAMP NOT NULL,
        email TEXT NOT NULL,
        filename TEXT,
        row_count INTEGER NOT NULL
    )
"#;

/// Append an audit entry
pub async fn record_promotion(
    conn: &mut SqliteConnection,
    email: &str,
    filename: Option<&str>,
    row_count: i64,
) -> Result<PromotionRecord> {
    let updated_at = Utc::now();
    let id = sqlx::query(
        "INSERT INTO meta (updated_at, email, filename, row_count) VALUES (?, ?, ?, ?)",
    )
    .bind(updated_at)
    .bind(email)
    .bind(filename)
    .bind(row_count)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(PromotionRecord {
        id,
        updated_at,
        email: email.to_string(),
        filename: filename.map(str::to_string),
        row_count,
    })
}

/// Most recent promotion, if any
pub async fn latest_promotion(pool: &SqlitePool) -> Result<Option<PromotionRecord>> {
    let record = sqlx::query_as::<_, PromotionRecord>(
        "SELECT id, updated_at, email, filename, row_count FROM meta ORDER BY id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(record)
}
