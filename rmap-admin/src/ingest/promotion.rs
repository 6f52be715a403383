//! Promotion of staged listings to production
//!
//! Four steps, each in its own transaction, run strictly in order:
//! 1. snapshot production into `listing_backup`
//! 2. replace production with the staged rows (build `listings_next`, then
//!    drop and rename)
//! 3. rebuild the geocode cache
//! 4. append the audit entry
//!
//! A failed step stops the sequence. Completed steps are not rolled back;
//! the error reports which steps had already committed. Once production
//! has been replaced a retry resumes at the failed step, so the backup
//! taken in step 1 is never overwritten with the promoted rows.

use rmap_common::db::{
    copy_rows, rebuild_geocode_cache, record_promotion, recreate_listing_table, ListingTable,
    PromotionRecord,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

use crate::PipelineLock;

const NEXT_TABLE: &str = "listings_next";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStep {
    BackupSnapshot,
    ReplaceProduction,
    RebuildGeocodeCache,
    RecordMetadata,
}

impl fmt::Display for PromotionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromotionStep::BackupSnapshot => "backup snapshot",
            PromotionStep::ReplaceProduction => "production replace",
            PromotionStep::RebuildGeocodeCache => "geocode cache rebuild",
            PromotionStep::RecordMetadata => "metadata record",
        };
        f.write_str(name)
    }
}

/// Steps committed so far and the row counts they produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromotionProgress {
    pub completed: Vec<PromotionStep>,
    pub backup_rows: u64,
    pub production_rows: u64,
    pub cached_rows: u64,
}

impl PromotionProgress {
    pub fn is_done(&self, step: PromotionStep) -> bool {
        self.completed.contains(&step)
    }

    /// Production already holds the staged data
    pub fn production_replaced(&self) -> bool {
        self.is_done(PromotionStep::ReplaceProduction)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PromotionReport {
    #[serde(flatten)]
    pub progress: PromotionProgress,
    /// Steps 1 and 2 were skipped because an earlier attempt committed them
    pub resumed: bool,
    pub record: PromotionRecord,
}

#[derive(Debug, Error)]
#[error("promotion failed during {step}: {source}")]
pub struct PromotionError {
    pub step: PromotionStep,
    /// State committed before the failure
    pub progress: PromotionProgress,
    #[source]
    pub source: rmap_common::Error,
}

impl PromotionError {
    fn at(step: PromotionStep, progress: &PromotionProgress, source: rmap_common::Error) -> Self {
        Self {
            step,
            progress: progress.clone(),
            source,
        }
    }

    pub fn production_replaced(&self) -> bool {
        self.progress.production_replaced()
    }

    /// Operator-facing account of the resulting state
    pub fn summary(&self) -> String {
        if self.production_replaced() {
            format!(
                "Production listings were replaced with the staged data, but the {} failed. \
                 The geocode cache or update log may be stale; the previous listings remain in listing_backup. \
                 Trying again resumes at the failed step and leaves listing_backup untouched.",
                self.step
            )
        } else if self.progress.is_done(PromotionStep::BackupSnapshot) {
            format!(
                "Production listings were not changed; the {} failed after the backup was taken.",
                self.step
            )
        } else {
            format!("Production listings were not changed; the {} failed.", self.step)
        }
    }
}

#[derive(Clone)]
pub struct PromotionPipeline {
    pool: SqlitePool,
    lock: PipelineLock,
}

impl PromotionPipeline {
    pub fn new(pool: SqlitePool, lock: PipelineLock) -> Self {
        Self { pool, lock }
    }

    /// Run the promotion, or finish one that failed after step 2
    ///
    /// `resume` is the progress reported by a previous failed attempt. It
    /// is honoured only once production was replaced; earlier failures
    /// left production untouched and start over from step 1.
    pub async fn promote(
        &self,
        email: &str,
        filename: Option<&str>,
        resume: Option<PromotionProgress>,
    ) -> Result<PromotionReport, PromotionError> {
        let _guard = self.lock.lock().await;

        let mut progress = match resume {
            Some(progress) if progress.production_replaced() => {
                info!(completed = ?progress.completed, "Resuming promotion; production already replaced");
                progress
            }
            _ => PromotionProgress::default(),
        };
        let resumed = progress.production_replaced();

        if !progress.is_done(PromotionStep::BackupSnapshot) {
            let rows = self
                .snapshot_backup()
                .await
                .map_err(|e| self.fail(PromotionStep::BackupSnapshot, &progress, e))?;
            progress.backup_rows = rows;
            progress.completed.push(PromotionStep::BackupSnapshot);
            info!(rows, "Promotion 1/4: production snapshot saved");
        }

        if !progress.is_done(PromotionStep::ReplaceProduction) {
            let rows = self
                .replace_production()
                .await
                .map_err(|e| self.fail(PromotionStep::ReplaceProduction, &progress, e))?;
            progress.production_rows = rows;
            progress.completed.push(PromotionStep::ReplaceProduction);
            info!(rows, "Promotion 2/4: production replaced");
        }

        if !progress.is_done(PromotionStep::RebuildGeocodeCache) {
            let rows = self
                .rebuild_cache()
                .await
                .map_err(|e| self.fail(PromotionStep::RebuildGeocodeCache, &progress, e))?;
            progress.cached_rows = rows;
            progress.completed.push(PromotionStep::RebuildGeocodeCache);
            info!(rows, "Promotion 3/4: geocode cache rebuilt");
        }

        let record = self
            .record(email, filename, progress.production_rows as i64)
            .await
            .map_err(|e| self.fail(PromotionStep::RecordMetadata, &progress, e))?;
        progress.completed.push(PromotionStep::RecordMetadata);
        info!(email = %email, "Promotion 4/4: update recorded");

        Ok(PromotionReport {
            progress,
            resumed,
            record,
        })
    }

    fn fail(
        &self,
        step: PromotionStep,
        progress: &PromotionProgress,
        source: rmap_common::Error,
    ) -> PromotionError {
        let err = PromotionError::at(step, progress, source);
        error!(step = %step, completed = ?progress.completed, "Promotion failed: {}", err.source);
        err
    }

    async fn snapshot_backup(&self) -> rmap_common::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let backup = ListingTable::Backup.name();
        recreate_listing_table(&mut tx, backup).await?;
        let rows = copy_rows(&mut tx, ListingTable::Production.name(), backup).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn replace_production(&self) -> rmap_common::Result<u64> {
        let production = ListingTable::Production.name();
        let mut tx = self.pool.begin().await?;
        recreate_listing_table(&mut tx, NEXT_TABLE).await?;
        let rows = copy_rows(&mut tx, ListingTable::Staging.name(), NEXT_TABLE).await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", production))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", NEXT_TABLE, production))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn rebuild_cache(&self) -> rmap_common::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let rows = rebuild_geocode_cache(&mut tx).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn record(
        &self,
        email: &str,
        filename: Option<&str>,
        row_count: i64,
    ) -> rmap_common::Result<PromotionRecord> {
        let mut conn = self.pool.acquire().await?;
        record_promotion(&mut conn, email, filename, row_count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_at(step: PromotionStep, completed: &[PromotionStep]) -> PromotionError {
        let progress = PromotionProgress {
            completed: completed.to_vec(),
            ..Default::default()
        };
        PromotionError::at(step, &progress, rmap_common::Error::Config("boom".into()))
    }

    #[test]
    fn test_summary_reflects_committed_steps() {
        let early = failed_at(PromotionStep::BackupSnapshot, &[]);
        assert!(!early.production_replaced());
        assert!(early.summary().starts_with("Production listings were not changed"));

        let late = failed_at(
            PromotionStep::RebuildGeocodeCache,
            &[PromotionStep::BackupSnapshot, PromotionStep::ReplaceProduction],
        );
        assert!(late.production_replaced());
        assert!(late.summary().contains("listing_backup untouched"));
    }

    #[test]
    fn test_step_names_serialize_snake_case() {
        let value = serde_json::to_value(PromotionStep::RebuildGeocodeCache).unwrap();
        assert_eq!(value, "rebuild_geocode_cache");
    }
}
