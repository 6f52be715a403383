//! Staging pipeline
//!
//! Drives one upload attempt through `Idle → Parsing → Validating →
//! Persisting → Staged`, recording each transition on the upload session.
//! The staging table is a single process-wide slot: a later upload from any
//! session replaces it.

use rmap_common::config::TomlConfig;
use rmap_common::db::{insert_record, load_geocode_cache, recreate_listing_table, ListingTable};
use rmap_common::geo::RegionDecision;
use rmap_common::schema::{ListingSchema, ValidationMode};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::geocode_merge::merge_cached_coordinates;
use super::parser::parse_upload;
use super::region::apply_region_filter;
use super::transform::RowTransformer;
use super::validate::{validate_batch, Violation};
use super::IngestError;
use crate::models::{StagingState, UploadSession};
use crate::PipelineLock;

/// File part of an upload request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// Outcome of a successful staging attempt
#[derive(Debug, Clone, Serialize)]
pub struct StagingReport {
    pub mode: ValidationMode,
    pub attempt: u32,
    pub parsed_rows: usize,
    pub staged_rows: usize,
    /// Rows whose coordinates fell outside the region box
    pub dropped_outside_region: Vec<Option<i64>>,
    pub merged_from_cache: usize,
    /// Staged rows without usable coordinates
    pub unmapped_rows: usize,
    /// Ignored coordinate violations
    pub coordinate_warnings: Vec<Violation>,
}

#[derive(Debug, Default)]
struct PersistSummary {
    staged: usize,
    dropped: Vec<Option<i64>>,
    merged: usize,
    unmapped: usize,
}

#[derive(Clone)]
pub struct StagingPipeline {
    pool: SqlitePool,
    config: Arc<TomlConfig>,
    lock: PipelineLock,
}

impl StagingPipeline {
    pub fn new(pool: SqlitePool, config: Arc<TomlConfig>, lock: PipelineLock) -> Self {
        Self { pool, config, lock }
    }

    /// Run one upload attempt
    ///
    /// Without a new file the rows retained from the previous upload are
    /// re-used. Relaxed validation is honoured only when the session had
    /// already failed more than once before this attempt.
    pub async fn run(
        &self,
        session: &mut UploadSession,
        upload: Option<UploadedFile>,
        relaxed_requested: bool,
    ) -> Result<StagingReport, IngestError> {
        let relaxed_available = session.begin_attempt();
        let mode = match (relaxed_requested, relaxed_available) {
            (true, true) => ValidationMode::Relaxed,
            (true, false) => {
                warn!(
                    session_id = %session.session_id,
                    attempt = session.attempts,
                    "Relaxed validation requested before it was offered; using strict"
                );
                ValidationMode::Strict
            }
            (false, _) => ValidationMode::Strict,
        };
        info!(
            session_id = %session.session_id,
            attempt = session.attempts,
            mode = ?mode,
            "Upload attempt started"
        );

        // Parsing
        session.transition_to(StagingState::Parsing);
        let rows = match upload {
            Some(file) => match parse_upload(&file.bytes) {
                Ok(rows) => {
                    session.filename = file.filename;
                    session.retained_rows = Some(rows.clone());
                    rows
                }
                Err(e) => {
                    warn!(session_id = %session.session_id, "Upload unreadable: {}", e);
                    session.retained_rows = None;
                    session.transition_to(StagingState::ParseFailed);
                    return Err(e);
                }
            },
            None => match session.retained_rows.clone() {
                Some(rows) => {
                    debug!(rows = rows.len(), "Re-using rows from previous upload");
                    rows
                }
                None => {
                    session.transition_to(StagingState::ParseFailed);
                    return Err(IngestError::Parse("no file was uploaded".to_string()));
                }
            },
        };

        let transformer = RowTransformer::new(&self.config.gazetteer, &self.config.cost_vocabulary);
        let records: Vec<Map<String, Value>> = rows.iter().map(|row| transformer.transform(row)).collect();

        // Validating
        session.transition_to(StagingState::Validating);
        let outcome = validate_batch(&records, &ListingSchema::for_mode(mode));
        if !outcome.is_success() {
            info!(
                session_id = %session.session_id,
                errors = outcome.errors.len(),
                "Upload failed validation"
            );
            session.transition_to(StagingState::ValidationFailed);
            return Err(IngestError::Validation(outcome.errors));
        }
        if !outcome.coordinate_warnings.is_empty() {
            info!(
                warnings = outcome.coordinate_warnings.len(),
                "Ignoring coordinate violations; rows will be re-geocoded"
            );
        }

        // Persisting
        session.transition_to(StagingState::Persisting);
        let parsed_rows = records.len();
        let summary = match self.persist(records).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(session_id = %session.session_id, "Staging failed: {}", e);
                session.transition_to(StagingState::PersistFailed);
                return Err(e);
            }
        };

        session.transition_to(StagingState::Staged);
        info!(
            session_id = %session.session_id,
            staged = summary.staged,
            dropped = summary.dropped.len(),
            merged = summary.merged,
            "Upload staged"
        );

        Ok(StagingReport {
            mode,
            attempt: session.attempts,
            parsed_rows,
            staged_rows: summary.staged,
            dropped_outside_region: summary.dropped,
            merged_from_cache: summary.merged,
            unmapped_rows: summary.unmapped,
            coordinate_warnings: outcome.coordinate_warnings,
        })
    }

    /// Write the batch under the pipeline lock and the per-batch timeout
    ///
    /// Time spent waiting for the lock counts toward the timeout.
    async fn persist(&self, records: Vec<Map<String, Value>>) -> Result<PersistSummary, IngestError> {
        let timeout = self.config.staging_timeout();
        let work = async {
            let _guard = self.lock.lock().await;
            self.write_staging(records).await
        };
        match tokio::time::timeout(timeout, work).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(IngestError::Timeout(timeout)),
        }
    }

    async fn write_staging(&self, records: Vec<Map<String, Value>>) -> rmap_common::Result<PersistSummary> {
        let cache = load_geocode_cache(&self.pool).await?;
        let table = ListingTable::Staging.name();
        let mut summary = PersistSummary::default();

        let mut tx = self.pool.begin().await?;
        recreate_listing_table(&mut tx, table).await?;

        // Sequential on purpose: one row at a time
        for mut record in records {
            if merge_cached_coordinates(&mut record, &cache) {
                summary.merged += 1;
            }

            match apply_region_filter(&mut record, &self.config.region, &self.config.gazetteer) {
                RegionDecision::Outside => {
                    let guid = record.get("guid").and_then(Value::as_i64);
                    debug!(guid = ?guid, "Dropping row outside region");
                    summary.dropped.push(guid);
                    continue;
                }
                RegionDecision::Unmapped => summary.unmapped += 1,
                RegionDecision::Inside => {}
            }

            insert_record(&mut tx, table, &record).await?;
            summary.staged += 1;
        }

        tx.commit().await?;
        Ok(summary)
    }
}
