//! Listing table definitions
//!
//! The production, staging and backup tables share one column layout, built
//! from `schema::LISTING_FIELDS`. Existing tables are brought up to date by
//! adding any columns they lack (`sync_listing_table`).

use crate::schema::{FieldSpec, LISTING_FIELDS};
use crate::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    fn from_field(field: &FieldSpec) -> Self {
        let column = Self::new(field.name, field.field_type.sql_type());
        let column = if field.name == "guid" {
            column.primary_key()
        } else {
            column
        };
        if field.not_null() {
            column.not_null()
        } else {
            column
        }
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// The three tables holding full listing rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingTable {
    /// Served by the public API
    Production,
    /// Dropped and recreated on every upload attempt
    Staging,
    /// Single-generation snapshot taken before each promotion
    Backup,
}

impl ListingTable {
    pub fn name(self) -> &'static str {
        match self {
            ListingTable::Production => "listings",
            ListingTable::Staging => "preview_listings",
            ListingTable::Backup => "listing_backup",
        }
    }
}

/// Expected listing columns, in declaration order
pub fn listing_columns() -> Vec<ColumnDefinition> {
    LISTING_FIELDS.iter().map(ColumnDefinition::from_field).collect()
}

/// Comma-separated column list for SELECT/INSERT
pub fn listing_column_list() -> String {
    LISTING_FIELDS
        .iter()
        .map(|f| f.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE` statement for a listing table with an arbitrary name
pub fn create_listing_table_sql(table_name: &str, if_not_exists: bool) -> String {
    let columns = listing_columns()
        .iter()
        .map(ColumnDefinition::to_sql)
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!(
        "CREATE TABLE {}{} (\n    {}\n)",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        table_name,
        columns
    )
}

/// Drop and recreate an empty listing table
pub async fn recreate_listing_table(conn: &mut SqliteConnection, table_name: &str) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table_name))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&create_listing_table_sql(table_name, false))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Add listing columns missing from an existing table
///
/// Only missing columns are fixed; type or constraint drift is logged and
/// left for a manual migration.
pub async fn sync_listing_table(pool: &SqlitePool, table: ListingTable) -> Result<()> {
    let table_name = table.name();
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table_name))
        .fetch_all(pool)
        .await?;
    let actual: Vec<(String, String)> = rows
        .iter()
        .map(|row| (row.get::<String, _>("name"), row.get::<String, _>("type")))
        .collect();

    if actual.is_empty() {
        warn!("Schema sync: table '{}' does not exist", table_name);
        return Ok(());
    }

    let mut added = 0;
    for expected in listing_columns() {
        match actual.iter().find(|(name, _)| *name == expected.name) {
            Some((_, actual_type)) if !actual_type.eq_ignore_ascii_case(&expected.sql_type) => {
                warn!(
                    "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                    table_name, expected.name, expected.sql_type, actual_type
                );
            }
            Some(_) => {}
            None => {
                // ALTER TABLE cannot add NOT NULL without a default
                let sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    table_name, expected.name, expected.sql_type
                );
                sqlx::query(&sql).execute(pool).await?;
                info!("Added column {}.{} ({})", table_name, expected.name, expected.sql_type);
                added += 1;
            }
        }
    }

    if added == 0 {
        info!("Schema up to date for '{}'", table_name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sql_marks_identity_columns() {
        let sql = create_listing_table_sql("listings", true);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS listings"));
        assert!(sql.contains("guid INTEGER PRIMARY KEY NOT NULL"));
        assert!(sql.contains("full_name TEXT NOT NULL"));
        assert!(sql.contains("description TEXT,"));
        assert!(sql.contains("keywords TEXT"));
        assert!(sql.contains("latitude REAL"));
    }

    #[test]
    fn test_column_list_matches_fields() {
        let list = listing_column_list();
        assert!(list.starts_with("guid, full_name, parent_organization"));
        assert_eq!(list.split(", ").count(), LISTING_FIELDS.len());
    }
}
