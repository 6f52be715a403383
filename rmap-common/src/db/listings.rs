//! Listing row persistence
//!
//! Records travel as canonical JSON maps. Each column is bound and read
//! according to its declared `FieldType`; set-valued fields are stored as
//! JSON array text.

use crate::db::table_schemas::{listing_column_list, ListingTable};
use crate::listing::Listing;
use crate::schema::{FieldSpec, FieldType, LISTING_FIELDS};
use crate::Result;
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind one record value as its column's storage type
///
/// Values that cannot be represented in the column (possible for rows
/// staged under relaxed validation) are stored as NULL.
fn bind_field<'q>(query: SqliteQuery<'q>, field: &FieldSpec, value: Option<&Value>) -> SqliteQuery<'q> {
    let value = value.filter(|v| !v.is_null());
    match field.field_type {
        FieldType::String => query.bind(value.and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })),
        FieldType::Integer => query.bind(value.and_then(|v| {
            v.as_i64().or_else(|| {
                v.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        })),
        FieldType::Number => query.bind(value.and_then(Value::as_f64)),
        FieldType::Boolean => query.bind(value.and_then(Value::as_bool).map(i64::from)),
        FieldType::Array => query.bind(
            value
                .filter(|v| v.is_array())
                .map(|v| v.to_string()),
        ),
    }
}

fn read_field(row: &SqliteRow, field: &FieldSpec) -> Result<Option<Value>> {
    let value = match field.field_type {
        FieldType::String => row
            .try_get::<Option<String>, _>(field.name)?
            .map(Value::String),
        FieldType::Integer => row
            .try_get::<Option<i64>, _>(field.name)?
            .map(Value::from),
        FieldType::Number => row
            .try_get::<Option<f64>, _>(field.name)?
            .map(Value::from),
        FieldType::Boolean => row
            .try_get::<Option<i64>, _>(field.name)?
            .map(|n| Value::Bool(n != 0)),
        FieldType::Array => match row.try_get::<Option<String>, _>(field.name)? {
            Some(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(items) => Some(Value::from(items)),
                Err(e) => {
                    warn!("Ignoring malformed {} value: {}", field.name, e);
                    None
                }
            },
            None => None,
        },
    };
    Ok(value)
}

fn row_to_record(row: &SqliteRow) -> Result<Map<String, Value>> {
    let mut record = Map::new();
    for field in LISTING_FIELDS {
        if let Some(value) = read_field(row, field)? {
            record.insert(field.name.to_string(), value);
        }
    }
    Ok(record)
}

/// Insert one record into a listing table
pub async fn insert_record(
    conn: &mut SqliteConnection,
    table_name: &str,
    record: &Map<String, Value>,
) -> Result<()> {
    let placeholders = vec!["?"; LISTING_FIELDS.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table_name,
        listing_column_list(),
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for field in LISTING_FIELDS {
        query = bind_field(query, field, record.get(field.name));
    }
    query.execute(&mut *conn).await?;
    Ok(())
}

/// Replace every column of an existing row; returns false if no row matched
pub async fn update_record(
    conn: &mut SqliteConnection,
    table_name: &str,
    guid: i64,
    record: &Map<String, Value>,
) -> Result<bool> {
    let assignments = LISTING_FIELDS
        .iter()
        .map(|f| format!("{} = ?", f.name))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {} WHERE guid = ?", table_name, assignments);

    let mut query = sqlx::query(&sql);
    for field in LISTING_FIELDS {
        query = bind_field(query, field, record.get(field.name));
    }
    let result = query.bind(guid).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

/// All rows of a table as canonical records, ordered by guid
pub async fn fetch_records(pool: &SqlitePool, table: ListingTable) -> Result<Vec<Map<String, Value>>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY rowid",
        listing_column_list(),
        table.name()
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(row_to_record).collect()
}

/// All rows of a table as listings, ordered by guid
pub async fn fetch_listings(pool: &SqlitePool, table: ListingTable) -> Result<Vec<Listing>> {
    let records = fetch_records(pool, table).await?;
    debug!("Loaded {} rows from {}", records.len(), table.name());
    records.into_iter().map(Listing::from_record).collect()
}

pub async fn fetch_listing(pool: &SqlitePool, table: ListingTable, guid: i64) -> Result<Option<Listing>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE guid = ?",
        listing_column_list(),
        table.name()
    );
    let row = sqlx::query(&sql).bind(guid).fetch_optional(pool).await?;
    match row {
        Some(row) => Ok(Some(Listing::from_record(row_to_record(&row)?)?)),
        None => Ok(None),
    }
}

pub async fn delete_listing(pool: &SqlitePool, table: ListingTable, guid: i64) -> Result<bool> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE guid = ?", table.name()))
        .bind(guid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_listings(pool: &SqlitePool, table: ListingTable) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.name()))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Staged rows with an address but no coordinates
pub async fn fetch_unmapped(pool: &SqlitePool, table: ListingTable) -> Result<Vec<(i64, String)>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(&format!(
        "SELECT guid, full_address FROM {} \
         WHERE full_address IS NOT NULL AND (latitude IS NULL OR longitude IS NULL) \
         ORDER BY rowid",
        table.name()
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn set_coordinates(
    pool: &SqlitePool,
    table: ListingTable,
    guid: i64,
    latitude: f64,
    longitude: f64,
) -> Result<()> {
    sqlx::query(&format!(
        "UPDATE {} SET latitude = ?, longitude = ? WHERE guid = ?",
        table.name()
    ))
    .bind(latitude)
    .bind(longitude)
    .bind(guid)
    .execute(pool)
    .await?;
    Ok(())
}

/// Copy every row of `from` into `to` (same column layout)
pub async fn copy_rows(conn: &mut SqliteConnection, from: &str, to: &str) -> Result<u64> {
    let columns = listing_column_list();
    let result = sqlx::query(&format!(
        "INSERT INTO {} ({}) SELECT {} FROM {} ORDER BY rowid",
        to, columns, columns, from
    ))
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
